use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::QualName;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use super::dom::MarkupFlavor;
use crate::translation::error::{TranslationError, TranslationResult};

/// 序列化文档
///
/// 按解析时的语法写回 UTF-8 字节：HTML 文档按 HTML5 规则输出，XHTML 文档逐节点写回 XML，
/// 元素和属性保留原有的命名空间前缀，空元素写成自闭合形式。
pub fn serialize_document(dom: &RcDom, flavor: MarkupFlavor) -> TranslationResult<Vec<u8>> {
    match flavor {
        MarkupFlavor::Html => {
            let mut buf: Vec<u8> = Vec::new();
            let serializable: SerializableHandle = dom.document.clone().into();
            serialize(&mut buf, &serializable, SerializeOpts::default()).map_err(|e| {
                TranslationError::SerializationError(format!(
                    "Unable to serialize DOM into buffer: {e}"
                ))
            })?;
            Ok(buf)
        }
        MarkupFlavor::Xhtml => {
            let mut out = String::new();
            write_xml_node(&dom.document, None, &mut out);
            Ok(out.into_bytes())
        }
    }
}

fn write_xml_node(node: &Handle, parent_ns: Option<&str>, out: &mut String) {
    match &node.data {
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                write_xml_node(child, parent_ns, out);
            }
        }
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() {
                out.push_str(&format!(" PUBLIC \"{}\"", public_id));
                if !system_id.is_empty() {
                    out.push_str(&format!(" \"{}\"", system_id));
                }
            } else if !system_id.is_empty() {
                out.push_str(&format!(" SYSTEM \"{}\"", system_id));
            }
            out.push('>');
            out.push('\n');
        }
        NodeData::ProcessingInstruction { target, contents } => {
            out.push_str("<?");
            out.push_str(target);
            if !contents.is_empty() {
                out.push(' ');
                out.push_str(contents.trim());
            }
            out.push_str("?>");
            if &**target == "xml" {
                out.push('\n');
            }
        }
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::Text { contents } => escape_text(&contents.borrow(), out),
        NodeData::Element { name, attrs, .. } => {
            let element_ns: &str = &name.ns;
            out.push('<');
            push_qual_name(name, out);

            let attrs = attrs.borrow();
            let declares_default_ns = attrs
                .iter()
                .any(|attr| attr.name.prefix.is_none() && &*attr.name.local == "xmlns");
            if name.prefix.is_none()
                && !element_ns.is_empty()
                && parent_ns != Some(element_ns)
                && !declares_default_ns
            {
                out.push_str(" xmlns=\"");
                escape_attr(element_ns, out);
                out.push('"');
            }

            for attr in attrs.iter() {
                out.push(' ');
                push_qual_name(&attr.name, out);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }

            let children = node.children.borrow();
            if children.is_empty() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for child in children.iter() {
                write_xml_node(child, Some(element_ns), out);
            }
            out.push_str("</");
            push_qual_name(name, out);
            out.push('>');
        }
    }
}

fn push_qual_name(name: &QualName, out: &mut String) {
    if let Some(prefix) = &name.prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(&name.local);
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{html_to_dom, xhtml_to_dom};

    #[test]
    fn test_html_round_trip_keeps_text() {
        let dom = html_to_dom("<!DOCTYPE html><html><head></head><body><p>Hello</p></body></html>");
        let out = String::from_utf8(serialize_document(&dom, MarkupFlavor::Html).unwrap()).unwrap();
        assert!(out.contains("<p>Hello</p>"));
        assert!(out.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_xhtml_round_trip_stays_xml() {
        let dom = xhtml_to_dom(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><p>Hello &amp; bye</p><br/></body></html>",
        );
        let out =
            String::from_utf8(serialize_document(&dom, MarkupFlavor::Xhtml).unwrap()).unwrap();
        assert!(out.contains("<p>Hello &amp; bye</p>"));
        assert!(out.contains("<br/>"));
        assert_eq!(out.matches("xmlns=\"http://www.w3.org/1999/xhtml\"").count(), 1);
    }

    #[test]
    fn test_xhtml_attribute_values_are_escaped() {
        let dom = xhtml_to_dom("<html><body><p title=\"a &quot;b&quot; &lt;c\">x</p></body></html>");
        let out =
            String::from_utf8(serialize_document(&dom, MarkupFlavor::Xhtml).unwrap()).unwrap();
        assert!(out.contains("title=\"a &quot;b&quot; &lt;c\""));
    }
}
