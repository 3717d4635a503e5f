use encoding_rs::WINDOWS_1252;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use xml5ever::driver::{parse_document as parse_xml_document, XmlParseOpts};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// 文档所使用的标记语法
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkupFlavor {
    /// 按 HTML5 规则解析和序列化
    Html,
    /// 按 XML 规则解析和序列化（EPUB 中的 XHTML 内容文档）
    Xhtml,
}

impl MarkupFlavor {
    /// 根据成员名和内容判断语法
    ///
    /// `.xhtml` 扩展名、以 XML 声明开头，或者根元素声明了 XHTML 命名空间的文档按 XML 处理。
    /// EPUB 中常见以 `.html` 命名但实际是 XHTML 的内容文档。
    pub fn detect(member_name: &str, text: &str) -> Self {
        let lowercased = member_name.to_lowercase();
        if lowercased.ends_with(".xhtml")
            || text.trim_start().starts_with("<?xml")
            || declares_xhtml_namespace(text)
        {
            MarkupFlavor::Xhtml
        } else {
            MarkupFlavor::Html
        }
    }
}

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// 根 `html` 开始标签上是否带有 XHTML 命名空间
fn declares_xhtml_namespace(text: &str) -> bool {
    let lowercased = text.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(offset) = lowercased[search_from..].find("<html") {
        let start = search_from + offset;
        let after_name = start + "<html".len();
        match lowercased[after_name..].chars().next() {
            Some(c) if c.is_ascii_whitespace() => {
                let tag_end = lowercased[after_name..]
                    .find('>')
                    .map_or(lowercased.len(), |end| after_name + end);
                return lowercased[after_name..tag_end].contains(XHTML_NAMESPACE);
            }
            Some('>') | Some('/') => return false,
            _ => search_from = after_name,
        }
    }

    false
}

/// 解码文档字节
///
/// 优先按 UTF-8 解码；失败时按 windows-1252 单字节编码解码，该编码对任意字节都不会失败。
pub fn decode_document(data: &[u8]) -> String {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(data);
            text.into_owned()
        }
    };

    match text.strip_prefix(BYTE_ORDER_MARK) {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// 将 HTML 文本转换为 DOM
pub fn html_to_dom(text: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(text)
}

/// 将 XHTML/XML 文本转换为 DOM
pub fn xhtml_to_dom(text: &str) -> RcDom {
    parse_xml_document(RcDom::default(), XmlParseOpts::default()).one(text)
}

/// 按指定语法解析
pub fn markup_to_dom(text: &str, flavor: MarkupFlavor) -> RcDom {
    match flavor {
        MarkupFlavor::Html => html_to_dom(text),
        MarkupFlavor::Xhtml => xhtml_to_dom(text),
    }
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some(&node_name) = node_names.first() else {
        return found_nodes;
    };

    if node_names.len() == 1 {
        if get_node_name(node) == Some(node_name) {
            found_nodes.push(node.clone());
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if get_node_name(node) == Some(node_name) {
        let mut new_node_names = node_names;
        new_node_names.remove(0);
        found_nodes.append(&mut find_nodes(node, new_node_names));
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称（不含命名空间前缀）
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 检查元素的 class 属性是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|class| class == class_name))
        .unwrap_or(false)
}

/// 检查节点的后代中是否有满足条件的元素（不含节点自身）
pub fn has_descendant<F>(node: &Handle, predicate: &F) -> bool
where
    F: Fn(&Handle) -> bool,
{
    node.children.borrow().iter().any(|child| {
        (matches!(child.data, NodeData::Element { .. }) && predicate(child))
            || has_descendant(child, predicate)
    })
}

/// 提取节点下的全部文本，跳过带有 `skip_class` 的元素
pub fn text_content(node: &Handle, skip_class: Option<&str>) -> String {
    let mut text = String::new();
    collect_text(node, skip_class, &mut text);
    text
}

fn collect_text(node: &Handle, skip_class: Option<&str>, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } => {
            if skip_class.is_some_and(|class| has_class(node, class)) {
                return;
            }
            for child in node.children.borrow().iter() {
                collect_text(child, skip_class, out);
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, skip_class, out);
            }
        }
        _ => {}
    }
}
