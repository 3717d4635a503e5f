//! 文档修改
//!
//! 在原始元素末尾追加 `<br>` 和一个带标记类、固定样式的 `<span>`，译文放在 `<span>` 里。
//! 新元素沿用父元素的命名空间，HTML 与 XHTML 文档都能按原语法写回。

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{create_element, NodeOrText, TreeSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::translation::config::constants;

/// 将译文注入到元素中，节点不是元素时返回 `false`
pub fn inject_translation(dom: &RcDom, node: &Handle, translated: &str) -> bool {
    let namespace = match &node.data {
        NodeData::Element { name, .. } => name.ns.clone(),
        _ => return false,
    };

    let line_break = create_element(
        dom,
        QualName::new(None, namespace.clone(), LocalName::from("br")),
        vec![],
    );

    let marker = create_element(
        dom,
        QualName::new(None, namespace, LocalName::from("span")),
        vec![
            Attribute {
                name: QualName::new(None, ns!(), LocalName::from("class")),
                value: StrTendril::from(constants::MARKER_CLASS),
            },
            Attribute {
                name: QualName::new(None, ns!(), LocalName::from("style")),
                value: StrTendril::from(constants::MARKER_STYLE),
            },
        ],
    );
    dom.append(&marker, NodeOrText::AppendText(StrTendril::from(translated)));

    dom.append(node, NodeOrText::AppendNode(line_break));
    dom.append(node, NodeOrText::AppendNode(marker));
    true
}
