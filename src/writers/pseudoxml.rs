//! Pseudo-XML: start tags with their attributes, one node per line, children
//! indented by four spaces and no end tags.

use crate::nodes::{AttrValue, Document, Kind, NodeData, NodeId, Visitor, Walk};
use crate::parser::directives::py_repr;
use crate::utils::unescape;

const INDENT: &str = "    ";

/// `<tag attr="value" ...>` with attributes in lexical order.
pub(crate) fn starttag(doc: &Document, node: NodeId) -> String {
    let Some(kind) = doc.kind(node) else {
        return String::new();
    };
    let mut tag = format!("<{}", kind.tag());
    if let Some(attrs) = doc.attrs(node) {
        for (name, value) in attrs.iter() {
            tag.push_str(&format!(" {name}=\"{value}\""));
        }
    }
    tag.push('>');
    tag
}

fn detail_repr(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(text) => py_repr(text),
        AttrValue::Int(n) => n.to_string(),
        AttrValue::List(items) => format!(
            "[{}]",
            items.iter().map(|s| py_repr(s)).collect::<Vec<_>>().join(", ")
        ),
    }
}

struct PseudoXml {
    out: String,
    level: usize,
}

impl PseudoXml {
    fn line(&mut self, text: &str) {
        for _ in 0..self.level {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn pending_internals(&mut self, doc: &Document, node: NodeId) {
        let Some(pending) = doc.pending_details.get(&node) else {
            return;
        };
        let mut internals = vec![
            ".. internal attributes:".to_string(),
            format!("     .transform: {}", pending.transform.name()),
            "     .details:".to_string(),
        ];
        for (key, value) in pending.details.iter() {
            internals.push(format!("       {key}: {}", detail_repr(value)));
        }
        for line in internals {
            self.line(&format!("    {line}"));
        }
    }
}

impl Visitor for PseudoXml {
    fn visit(&mut self, doc: &Document, node: NodeId) -> Walk {
        match &doc.node(node).data {
            NodeData::Text(text) => {
                for line in unescape(text).lines() {
                    self.line(line);
                }
                Walk::SkipChildren
            }
            NodeData::Element(_) => {
                let tag = starttag(doc, node);
                self.line(&tag);
                self.level += 1;
                Walk::Continue
            }
        }
    }

    fn depart(&mut self, doc: &Document, node: NodeId) {
        if doc.is_text(node) {
            return;
        }
        self.level -= 1;
        if doc.is(node, Kind::Pending) {
            self.pending_internals(doc, node);
        }
    }
}

/// Pseudo-XML of the subtree at `node`.
pub fn pformat(doc: &Document, node: NodeId) -> String {
    let mut writer = PseudoXml {
        out: String::new(),
        level: 0,
    };
    doc.walk(node, &mut writer);
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use similar_asserts::assert_eq;

    #[test]
    fn nested_elements_and_text() {
        let mut doc = Document::new(Settings::default());
        let para = doc.new_text_element(Kind::Paragraph, "", "one\ntwo");
        let em = doc.new_text_element(Kind::Emphasis, "", "it");
        doc.append(para, em);
        doc.append(doc.root(), para);
        doc.push_attr(para, "classes", "a b");
        let expected = "<document source=\"<string>\">\n    <paragraph classes=\"a\\ b\">\n        one\n        two\n        <emphasis>\n            it\n";
        assert_eq!(pformat(&doc, doc.root()), expected);
    }

    #[test]
    fn fixed_text_keeps_blank_lines() {
        let mut doc = Document::new(Settings::default());
        let block = doc.new_text_element(Kind::LiteralBlock, "", "a\n\nb");
        assert_eq!(
            pformat(&doc, block),
            "<literal_block xml:space=\"preserve\">\n    a\n    \n    b\n"
        );
    }
}
