//! HTML/XHTML 解析和处理模块
//!
//! - `dom`: 解码、解析和基础DOM操作
//! - `serializer`: 按原始语法序列化文档

pub mod dom;
pub mod serializer;

pub use dom::{
    decode_document, find_nodes, get_node_attr, get_node_name, has_class, has_descendant,
    html_to_dom, markup_to_dom, text_content, xhtml_to_dom, MarkupFlavor,
};
pub use serializer::serialize_document;
