//! 文本收集器模块
//!
//! 解析单个内容文档，按文档顺序选出可翻译的块级元素。选择规则依次为：
//!
//! 1. 位于超链接内部的元素跳过
//! 2. 自身带有译文标记类，或者已经包含译文标记的元素跳过，保证重复运行不会二次翻译
//! 3. 内部还嵌套了可翻译元素的外层元素跳过，只翻译最内层
//! 4. 文本不满足 [`TextFilter`] 的元素跳过
//!
//! 返回的 [`TranslatableUnit`] 直接持有 DOM 节点句柄，句柄只在所属文档的任务内使用。

use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::filters::{is_primary_tag, TextFilter};
use crate::parsers::html::{
    decode_document, get_node_name, has_class, has_descendant, markup_to_dom, serialize_document,
    text_content, MarkupFlavor,
};
use crate::translation::config::constants;
use crate::translation::error::TranslationResult;

/// 解析后的内容文档
pub struct DocumentTree {
    pub dom: RcDom,
    pub flavor: MarkupFlavor,
}

impl DocumentTree {
    /// 解码并解析文档字节，语法由成员名和内容决定
    pub fn parse(member_name: &str, data: &[u8]) -> Self {
        let text = decode_document(data);
        let flavor = MarkupFlavor::detect(member_name, &text);
        Self {
            dom: markup_to_dom(&text, flavor),
            flavor,
        }
    }

    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    /// 按解析时的语法重新序列化
    pub fn serialize(&self) -> TranslationResult<Vec<u8>> {
        serialize_document(&self.dom, self.flavor)
    }
}

/// 翻译单元状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Pending,
    Translated,
    /// 测试模式额度用尽或者运行被取消
    Skipped,
    Failed(String),
}

/// 一个待翻译的块级元素
#[derive(Debug, Clone)]
pub struct TranslatableUnit {
    /// DOM节点引用
    pub node: Handle,
    /// 去掉首尾空白后的原文
    pub text: String,
    pub status: UnitStatus,
}

impl TranslatableUnit {
    pub fn new(node: Handle, text: String) -> Self {
        Self {
            node,
            text,
            status: UnitStatus::Pending,
        }
    }

    /// 获取文本字符数
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// 元素被排除的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    InsideLink,
    AlreadyTranslated,
    NestedPrimary,
    Text,
}

/// 收集统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub candidates: usize,
    pub selected: usize,
    pub skipped_inside_link: usize,
    pub skipped_translated: usize,
    pub skipped_nested: usize,
    pub skipped_text: usize,
}

impl CollectionStats {
    fn record(&mut self, exclusion: Exclusion) {
        match exclusion {
            Exclusion::InsideLink => self.skipped_inside_link += 1,
            Exclusion::AlreadyTranslated => self.skipped_translated += 1,
            Exclusion::NestedPrimary => self.skipped_nested += 1,
            Exclusion::Text => self.skipped_text += 1,
        }
    }
}

/// 文本收集器
pub struct TextCollector {
    filter: TextFilter,
    stats: CollectionStats,
}

impl Default for TextCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCollector {
    pub fn new() -> Self {
        Self::with_filter(TextFilter::new())
    }

    pub fn with_filter(filter: TextFilter) -> Self {
        Self {
            filter,
            stats: CollectionStats::default(),
        }
    }

    /// 收集文档中的全部翻译单元，按文档顺序返回
    pub fn collect_translatable_units(&mut self, root: &Handle) -> Vec<TranslatableUnit> {
        let mut units = Vec::new();
        self.collect_recursive(root, false, &mut units);
        units
    }

    fn collect_recursive(
        &mut self,
        node: &Handle,
        inside_link: bool,
        units: &mut Vec<TranslatableUnit>,
    ) {
        let mut inside_link = inside_link;

        if let NodeData::Element { .. } = node.data {
            let tag = get_node_name(node).unwrap_or_default();

            if is_primary_tag(tag) {
                self.stats.candidates += 1;
                match self.evaluate(node, inside_link) {
                    Ok(text) => {
                        self.stats.selected += 1;
                        units.push(TranslatableUnit::new(node.clone(), text));
                    }
                    Err(exclusion) => self.stats.record(exclusion),
                }
            }

            if tag.eq_ignore_ascii_case(constants::LINK_TAG) {
                inside_link = true;
            }
        }

        for child in node.children.borrow().iter() {
            self.collect_recursive(child, inside_link, units);
        }
    }

    fn evaluate(&self, node: &Handle, inside_link: bool) -> Result<String, Exclusion> {
        if inside_link {
            return Err(Exclusion::InsideLink);
        }

        if has_class(node, constants::MARKER_CLASS)
            || has_descendant(node, &|child: &Handle| {
                has_class(child, constants::MARKER_CLASS)
            })
        {
            return Err(Exclusion::AlreadyTranslated);
        }

        if has_descendant(node, &|child: &Handle| {
            get_node_name(child).is_some_and(is_primary_tag)
        }) {
            return Err(Exclusion::NestedPrimary);
        }

        let text = text_content(node, Some(constants::MARKER_CLASS));
        if !self.filter.should_translate(&text) {
            return Err(Exclusion::Text);
        }

        Ok(text.trim().to_string())
    }

    pub fn get_stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CollectionStats::default();
    }
}

/// 便利函数：使用默认过滤器收集翻译单元
pub fn select_units(root: &Handle) -> Vec<TranslatableUnit> {
    TextCollector::new().collect_translatable_units(root)
}
