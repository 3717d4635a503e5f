//! # 解析器模块
//!
//! EPUB 内容文档（HTML 与 XHTML）以及包元数据（OPF，XML）的解析与序列化。
//! 两种语法共用 `markup5ever_rcdom` 的树结构，因此选择、修改和序列化的代码只写一遍。

pub mod html;

// Re-export commonly used items for convenience
pub use html::{decode_document, markup_to_dom, serialize_document, MarkupFlavor};
