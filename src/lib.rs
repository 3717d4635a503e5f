//! # EPUB Translator Library
//!
//! 将 EPUB 电子书中的正文翻译为目标语言，并以双语形式写回新的归档文件。
//! 译文以带标记类的 `<span>` 追加在每个原始段落、标题和列表项之下。
//!
//! ## 模块组织
//!
//! - `archive` - ZIP 容器读写与阅读顺序解析
//! - `core` - 运行配置、输入准备和一次完整运行的入口
//! - `env` - 类型安全的环境变量访问
//! - `parsers` - HTML/XHTML 解析、DOM 操作与序列化
//! - `translation` - 翻译后端、文本选择、文档修改和调度

pub mod archive;
pub mod core;
pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use self::core::*;
pub use parsers::*;
