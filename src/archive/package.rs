//! 阅读顺序解析
//!
//! 从包元数据（`.opf`）的 manifest 和 spine 得到内容文档的阅读顺序。
//! 元数据缺失、无法解析或者解析结果为空时，退回归档自身枚举顺序中的全部内容文档。

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};

use percent_encoding::percent_decode_str;
use url::Url;

use super::{is_markup_member, ArchiveReader};
use crate::parsers::html::{decode_document, find_nodes, get_node_attr, xhtml_to_dom};
use crate::translation::config::constants;

const PACKAGE_BASE_URL: &str = "http://package.invalid/";

/// 解析后的包元数据
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    /// 元数据成员在归档中的路径
    pub path: String,
    /// id → 相对路径
    pub manifest: HashMap<String, String>,
    /// 按作者定义顺序排列的 idref
    pub spine: Vec<String>,
}

impl PackageDocument {
    pub fn parse(path: &str, data: &[u8]) -> Self {
        let dom = xhtml_to_dom(&decode_document(data));

        let mut manifest = HashMap::new();
        for item in find_nodes(&dom.document, vec!["manifest", "item"]) {
            if let (Some(id), Some(href)) = (get_node_attr(&item, "id"), get_node_attr(&item, "href")) {
                manifest.insert(id, href);
            }
        }

        let spine = find_nodes(&dom.document, vec!["spine", "itemref"])
            .iter()
            .filter_map(|itemref| get_node_attr(itemref, "idref"))
            .collect();

        Self {
            path: path.to_string(),
            manifest,
            spine,
        }
    }

    /// 按 spine 顺序解析出的归档路径，未知 id 被忽略，结果去重
    pub fn reading_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.spine
            .iter()
            .filter_map(|idref| self.manifest.get(idref))
            .filter_map(|href| resolve_href(&self.path, href))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }
}

/// 相对于元数据所在目录解析 href，得到归档内的成员名
///
/// 指向包外（带协议或主机）的引用返回 `None`。
pub fn resolve_href(package_path: &str, href: &str) -> Option<String> {
    let root = Url::parse(PACKAGE_BASE_URL).ok()?;
    let base = root.join(package_path).ok()?;
    let target = base.join(href).ok()?;

    if target.scheme() != root.scheme() || target.host_str() != root.host_str() {
        return None;
    }

    let path = percent_decode_str(target.path()).decode_utf8_lossy();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// 查找包元数据成员
pub fn find_package_member(names: &[String]) -> Option<&String> {
    names
        .iter()
        .find(|name| name.to_lowercase().ends_with(constants::PACKAGE_SUFFIX))
}

/// 解析归档的阅读顺序
///
/// 结果只包含归档中确实存在的内容文档，且不重复。
pub fn resolve_reading_order<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> Vec<String> {
    let Some(package_path) = find_package_member(reader.member_names()).cloned() else {
        tracing::debug!("未找到包元数据，按归档顺序处理内容文档");
        return reader.markup_members();
    };

    let member = match reader.read_member(&package_path) {
        Ok(member) => member,
        Err(e) => {
            tracing::warn!("读取包元数据 {} 失败，按归档顺序处理: {}", package_path, e);
            return reader.markup_members();
        }
    };

    let order: Vec<String> = PackageDocument::parse(&package_path, &member.data)
        .reading_order()
        .into_iter()
        .filter(|name| is_markup_member(name) && reader.contains(name))
        .collect();

    if order.is_empty() {
        tracing::debug!("包元数据 {} 没有可用的 spine，按归档顺序处理", package_path);
        return reader.markup_members();
    }

    tracing::debug!("阅读顺序包含 {} 个文档", order.len());
    order
}
