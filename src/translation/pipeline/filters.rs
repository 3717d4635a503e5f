//! 文本过滤器模块
//!
//! 判断一个候选元素的文本是否值得翻译，以及元素标签是否在可翻译列表内

use crate::translation::config::constants;

/// 文本过滤器
#[derive(Debug, Clone)]
pub struct TextFilter {
    /// 去掉首尾空白后必须超过的字符数
    min_length: usize,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFilter {
    /// 创建新的文本过滤器
    pub fn new() -> Self {
        Self {
            min_length: constants::MIN_TEXT_LENGTH,
        }
    }

    /// 使用自定义的最小长度
    pub fn with_min_length(min_length: usize) -> Self {
        Self { min_length }
    }

    /// 判断文本是否需要翻译
    pub fn should_translate(&self, text: &str) -> bool {
        let trimmed = text.trim();

        // 基础长度检查（按字符计）
        if trimmed.chars().count() <= self.min_length {
            return false;
        }

        // 检查是否包含字母字符
        if !trimmed.chars().any(char::is_alphabetic) {
            return false;
        }

        !self.is_pure_numeric(trimmed)
    }

    /// 检查是否为纯数字
    fn is_pure_numeric(&self, text: &str) -> bool {
        text.chars().all(char::is_numeric)
    }

    /// 批量过滤文本
    pub fn filter_texts(&self, texts: Vec<String>) -> Vec<String> {
        texts
            .into_iter()
            .filter(|text| self.should_translate(text))
            .collect()
    }
}

/// 标签是否属于可翻译的块级元素
pub fn is_primary_tag(tag: &str) -> bool {
    constants::PRIMARY_TAGS
        .iter()
        .any(|primary| primary.eq_ignore_ascii_case(tag))
}

/// 便利函数：判断文本是否需要翻译
pub fn should_translate(text: &str) -> bool {
    TextFilter::new().should_translate(text)
}
