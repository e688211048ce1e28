use crate::config::Settings;
use crate::nodes::{Document, Kind, NodeId};
use crate::writers::pseudoxml::pformat;

/// No diagnostic stream, and severe messages do not halt.
pub fn quiet() -> Settings {
    Settings::builder().warning_stream("-").halt_level(5).build()
}

pub fn parse_doc(input: &str) -> Document {
    crate::parser::parse(input, &quiet()).unwrap()
}

pub fn child_kinds(doc: &Document, node: NodeId) -> Vec<Kind> {
    doc.children(node).iter().filter_map(|&c| doc.kind(c)).collect()
}

pub fn assert_block_kinds(input: &str, expected: &[Kind]) {
    let doc = parse_doc(input);
    let actual = child_kinds(&doc, doc.root());
    assert_eq!(
        actual, expected,
        "Block kinds did not match for input:\n{}",
        input
    );
}

/// First element of `kind` in document order.
pub fn find_first(doc: &Document, kind: Kind) -> NodeId {
    doc.find_all(doc.root(), kind)
        .first()
        .copied()
        .unwrap_or_else(|| panic!("no {kind:?} in document"))
}

/// Compare the pseudo-XML of the parsed document; `body` is everything
/// below the `document` line.
pub fn assert_pformat(input: &str, body: &str) {
    let doc = parse_doc(input);
    let expected = format!("<document source=\"<string>\">\n{body}");
    similar_asserts::assert_eq!(pformat(&doc, doc.root()), expected);
}

/// Message texts of every system message, in document order.
pub fn messages(doc: &Document) -> Vec<String> {
    doc.system_messages()
        .into_iter()
        .filter_map(|m| doc.children(m).first().map(|&p| doc.astext(p)))
        .collect()
}
