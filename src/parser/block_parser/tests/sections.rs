use crate::config::Settings;
use crate::nodes::Kind;
use crate::parser::block_parser::tests::helpers::{
    assert_block_kinds, assert_pformat, child_kinds, find_first, messages, parse_doc,
};

#[test]
fn underlined_title() {
    assert_pformat(
        "Title\n=====\n\nBody.\n",
        "    <section ids=\"title\" names=\"title\">
        <title>
            Title
        <paragraph>
            Body.
",
    );
}

#[test]
fn overlined_title() {
    let doc = parse_doc("=======\n Title\n=======\n\nBody.\n");
    let section = find_first(&doc, Kind::Section);
    assert_eq!(child_kinds(&doc, section), [Kind::Title, Kind::Paragraph]);
    assert_eq!(doc.astext(find_first(&doc, Kind::Title)), "Title");
}

#[test]
fn nested_sections() {
    let doc = parse_doc("One\n===\n\nTwo\n---\n\nText.\n\nThree\n=====\n");
    assert_eq!(child_kinds(&doc, doc.root()), [Kind::Section, Kind::Section]);
    let first = doc.children(doc.root())[0];
    assert_eq!(child_kinds(&doc, first), [Kind::Title, Kind::Section]);
    let inner = doc.children(first)[1];
    assert_eq!(doc.list(inner, "names"), ["two"]);
}

#[test]
fn short_underline_warns() {
    let doc = parse_doc("Title text\n=====\n");
    assert_eq!(messages(&doc), ["Title underline too short."]);
    let section = find_first(&doc, Kind::Section);
    assert_eq!(child_kinds(&doc, section), [Kind::Title, Kind::SystemMessage]);
}

#[test]
fn very_short_underline_is_text() {
    assert_block_kinds("Long title\n==\n", &[Kind::SystemMessage, Kind::Paragraph]);
}

#[test]
fn title_inside_block_quote_is_unexpected() {
    let doc = parse_doc("Para.\n\n    Title\n    =====\n");
    assert_eq!(messages(&doc), ["Unexpected section title."]);
    let msg = find_first(&doc, Kind::SystemMessage);
    assert_eq!(doc.get_int(msg, "level"), Some(4));
    assert_eq!(doc.get_str(msg, "type"), Some("SEVERE"));
}

#[test]
fn severe_message_halts_with_default_settings() {
    let settings = Settings::builder().warning_stream("-").build();
    let result = crate::parser::parse("Para.\n\n    Title\n    =====\n", &settings);
    assert!(result.is_err_and(|e| e.is_halt()));
}

#[test]
fn inconsistent_title_levels() {
    let doc = parse_doc("A\n=\n\nB\n-\n\nC\n=\n\nD\n~\n");
    assert!(messages(&doc).iter().any(|m| m == "Title level inconsistent:"));
}

#[test]
fn duplicate_implicit_names() {
    let doc = parse_doc("Same\n====\n\nSame\n====\n");
    let sections = doc.find_all(doc.root(), Kind::Section);
    assert_eq!(sections.len(), 2);
    assert_eq!(doc.list(sections[0], "ids"), ["same"]);
    assert_eq!(doc.list(sections[0], "dupnames"), ["same"]);
    assert_eq!(doc.list(sections[1], "ids"), ["id1"]);
    assert_eq!(doc.list(sections[1], "dupnames"), ["same"]);
    assert!(doc.list(sections[1], "names").is_empty());
    assert_eq!(messages(&doc), ["Duplicate implicit target name: \"same\"."]);
}
