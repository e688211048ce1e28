//! Load a tree written by [`crate::writers::xml`].
//!
//! Whitespace-only text outside text elements is formatting and is
//! dropped; everything else becomes nodes and attributes again.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::nodes::{AttrValue, Document, Kind, NodeId};

fn element_kind(start: &BytesStart<'_>) -> Result<Kind> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    Kind::from_tag(&name).ok_or_else(|| Error::malformed(format!("unknown element <{name}>")))
}

fn copy_attributes(doc: &mut Document, node: NodeId, start: &BytesStart<'_>) -> Result<()> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        doc.set_attr(node, &key, AttrValue::parse_for(&key, &value));
    }
    Ok(())
}

/// Parse `xml` into a new document carrying `settings`.
pub fn from_xml(xml: &str, settings: Settings) -> Result<Document> {
    let mut doc = Document::new(settings);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    // Open elements; empty until <document> is seen.
    let mut stack: Vec<NodeId> = Vec::new();
    let mut seen_root = false;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let kind = element_kind(&start)?;
                let node = open(&mut doc, &stack, kind, &mut seen_root)?;
                copy_attributes(&mut doc, node, &start)?;
                stack.push(node);
            }
            Event::Empty(start) => {
                let kind = element_kind(&start)?;
                let node = open(&mut doc, &stack, kind, &mut seen_root)?;
                copy_attributes(&mut doc, node, &start)?;
            }
            Event::End(end) => {
                let Some(node) = stack.pop() else {
                    return Err(Error::malformed(format!(
                        "unexpected </{}>",
                        String::from_utf8_lossy(end.name().as_ref())
                    )));
                };
                log::trace!("Closed {:?}", doc.kind(node));
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                append_text(&mut doc, &stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut doc, &stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(Error::malformed("unclosed elements at end of input"));
    }
    if !seen_root {
        return Err(Error::malformed("no <document> element"));
    }
    Ok(doc)
}

/// The node for a new start tag: the existing root for `<document>`,
/// otherwise a fresh element appended to the innermost open one.
fn open(
    doc: &mut Document,
    stack: &[NodeId],
    kind: Kind,
    seen_root: &mut bool,
) -> Result<NodeId> {
    match stack.last() {
        None if kind == Kind::Document && !*seen_root => {
            *seen_root = true;
            Ok(doc.root())
        }
        None => Err(Error::malformed(format!(
            "expected <document> at top level, found <{}>",
            kind.tag()
        ))),
        Some(&parent) => {
            let node = doc.new_element(kind);
            doc.append(parent, node);
            Ok(node)
        }
    }
}

fn append_text(doc: &mut Document, stack: &[NodeId], text: &str) -> Result<()> {
    let Some(&parent) = stack.last() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(Error::malformed("text outside <document>"));
    };
    let in_text_element = doc.kind(parent).is_some_and(Kind::is_text_element);
    if !in_text_element && text.trim().is_empty() {
        return Ok(());
    }
    // Adjacent text events belong to one text node.
    if let Some(&last) = doc.children(parent).last()
        && let Some(previous) = doc.text_value(last)
    {
        let joined = format!("{previous}{text}");
        let node = doc.new_text(joined);
        doc.replace_with(last, vec![node]);
        return Ok(());
    }
    let node = doc.new_text(text);
    doc.append(parent, node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::pseudoxml::pformat;
    use crate::writers::xml::to_xml;

    #[test]
    fn reads_indented_output() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                   <!-- Generated -->\n\
                   <document source=\"x.rst\">\n\
                   \x20   <section ids=\"a-title\" names=\"a\\ title\">\n\
                   \x20       <title>A <emphasis>title</emphasis></title>\n\
                   \x20       <literal_block xml:space=\"preserve\">  code &amp; more</literal_block>\n\
                   \x20   </section>\n\
                   </document>\n";
        let doc = from_xml(xml, Settings::default()).unwrap();
        let section = doc.children(doc.root())[0];
        assert_eq!(doc.list(section, "names"), ["a title"]);
        assert_eq!(doc.children(section).len(), 2);
        let literal = doc.children(section)[1];
        assert_eq!(doc.astext(literal), "  code & more");
        assert_eq!(doc.get_str(doc.root(), "source"), Some("x.rst"));
    }

    #[test]
    fn round_trips_through_writer() {
        let xml = "<document source=\"s\"><paragraph classes=\"x\">one <strong>two</strong></paragraph>\
                   <target refuri=\"http://e\" ids=\"t\" names=\"t\"/></document>";
        let doc = from_xml(xml, Settings::default()).unwrap();
        let again = from_xml(&to_xml(&doc), Settings::default()).unwrap();
        assert_eq!(pformat(&doc, doc.root()), pformat(&again, again.root()));
    }

    #[test]
    fn rejects_unknown_elements() {
        let err = from_xml("<document><blink/></document>", Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
