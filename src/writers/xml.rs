//! Docutils generic XML.
//!
//! Elements are written as start and end tags (empty ones self-closed) with
//! attributes in lexical order. With `newlines`/`indents` set, each tag gets
//! its own line and nesting is indented, except inside text elements where
//! whitespace is content.

use quick_xml::escape::{escape, partial_escape};

use crate::nodes::{Document, NodeData, NodeId, Visitor, Walk};
use crate::utils::unescape;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
pub const DOCTYPE: &str = "<!DOCTYPE document PUBLIC \
    \"+//IDN docutils.sourceforge.net//DTD Docutils Generic//EN//XML\" \
    \"http://docutils.sourceforge.net/docs/ref/docutils.dtd\">";

/// Attribute values are written with runs of whitespace collapsed.
fn attribute_value(raw: &str) -> String {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    escape(normalized.as_str()).into_owned()
}

struct XmlWriter {
    out: String,
    newline: &'static str,
    indent: &'static str,
    level: usize,
    /// Depth of open text elements.
    in_simple: usize,
}

impl XmlWriter {
    fn start_line(&mut self) {
        if self.in_simple == 0 {
            for _ in 0..self.level {
                self.out.push_str(self.indent);
            }
        }
    }

    fn end_line(&mut self) {
        if self.in_simple == 0 {
            self.out.push_str(self.newline);
        }
    }
}

impl Visitor for XmlWriter {
    fn visit(&mut self, doc: &Document, node: NodeId) -> Walk {
        let element = match &doc.node(node).data {
            NodeData::Text(text) => {
                self.out.push_str(&partial_escape(unescape(text).as_str()));
                return Walk::SkipChildren;
            }
            NodeData::Element(element) => element,
        };
        self.start_line();
        self.out.push('<');
        self.out.push_str(element.kind.tag());
        for (name, value) in element.attributes.iter() {
            self.out.push_str(&format!(
                " {name}=\"{}\"",
                attribute_value(&value.to_string())
            ));
        }
        if element.children.is_empty() {
            self.out.push_str("/>");
            self.end_line();
            return Walk::SkipChildren;
        }
        self.out.push('>');
        self.level += 1;
        if element.kind.is_text_element() {
            self.in_simple += 1;
        }
        self.end_line();
        Walk::Continue
    }

    fn depart(&mut self, doc: &Document, node: NodeId) {
        let NodeData::Element(element) = &doc.node(node).data else {
            return;
        };
        if element.children.is_empty() {
            return;
        }
        self.level -= 1;
        self.start_line();
        self.out.push_str("</");
        self.out.push_str(element.kind.tag());
        self.out.push('>');
        if element.kind.is_text_element() {
            self.in_simple -= 1;
        }
        self.end_line();
    }
}

/// The document as XML, honouring the `newlines`, `indents`,
/// `xml_declaration` and `doctype_declaration` settings.
pub fn to_xml(doc: &Document) -> String {
    let settings = &doc.settings;
    let newline = if settings.newlines || settings.indents {
        "\n"
    } else {
        ""
    };
    let mut writer = XmlWriter {
        out: String::new(),
        newline,
        indent: if settings.indents { "    " } else { "" },
        level: 0,
        in_simple: 0,
    };
    if settings.xml_declaration {
        writer.out.push_str(XML_DECLARATION);
        writer.out.push('\n');
    }
    if settings.doctype_declaration {
        writer.out.push_str(DOCTYPE);
        writer.out.push('\n');
    }
    writer.out.push_str(&format!(
        "<!-- Generated by restruct {} -->\n",
        env!("CARGO_PKG_VERSION")
    ));
    doc.walk(doc.root(), &mut writer);
    if !writer.out.ends_with('\n') {
        writer.out.push('\n');
    }
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::nodes::Kind;

    fn sample(settings: Settings) -> Document {
        let mut doc = Document::new(settings);
        let para = doc.new_text_element(Kind::Paragraph, "", "a < b & c");
        let em = doc.new_text_element(Kind::Emphasis, "", "x");
        doc.append(para, em);
        doc.append(doc.root(), para);
        let target = doc.new_element(Kind::Target);
        doc.set_attr(target, "refuri", "http://example.org/?a=1&b=2");
        doc.append(doc.root(), target);
        doc
    }

    #[test]
    fn compact_output() {
        let settings = Settings::builder()
            .xml_declaration(false)
            .doctype_declaration(false)
            .newlines(false)
            .indents(false)
            .build();
        let xml = to_xml(&sample(settings));
        let body = xml.lines().nth(1).unwrap();
        assert_eq!(
            body,
            "<document source=\"&lt;string&gt;\"><paragraph>a &lt; b &amp; c<emphasis>x</emphasis>\
             </paragraph><target refuri=\"http://example.org/?a=1&amp;b=2\"/></document>"
        );
    }

    #[test]
    fn indented_output_keeps_text_elements_on_one_line() {
        let settings = Settings::builder()
            .xml_declaration(true)
            .doctype_declaration(false)
            .newlines(true)
            .indents(true)
            .build();
        let xml = to_xml(&sample(settings));
        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], XML_DECLARATION);
        assert!(lines[1].starts_with("<!-- Generated by restruct"));
        assert_eq!(lines[2], "<document source=\"&lt;string&gt;\">");
        assert_eq!(
            lines[3],
            "    <paragraph>a &lt; b &amp; c<emphasis>x</emphasis></paragraph>"
        );
        assert_eq!(lines[4], "    <target refuri=\"http://example.org/?a=1&amp;b=2\"/>");
        assert_eq!(lines[5], "</document>");
    }
}
