use crate::nodes::Kind;
use crate::parser::block_parser::tests::helpers::{
    assert_block_kinds, assert_pformat, child_kinds, find_first, messages, parse_doc,
};

#[test]
fn comment() {
    assert_pformat(
        ".. A comment\n   over two lines.\n",
        "    <comment xml:space=\"preserve\">
        A comment
        over two lines.
",
    );
}

#[test]
fn empty_comment() {
    let doc = parse_doc("..\n\nPara.\n");
    assert_eq!(child_kinds(&doc, doc.root()), [Kind::Comment, Kind::Paragraph]);
    let comment = find_first(&doc, Kind::Comment);
    assert!(doc.children(comment).is_empty());
}

#[test]
fn external_target() {
    assert_pformat(
        ".. _Example: https://example.org/\n",
        "    <target ids=\"example\" names=\"example\" refuri=\"https://example.org/\">\n",
    );
}

#[test]
fn indirect_target() {
    let doc = parse_doc(".. _one: two_\n");
    let target = find_first(&doc, Kind::Target);
    assert_eq!(doc.get_str(target, "refname"), Some("two"));
    assert!(!doc.has_attr(target, "refuri"));
}

#[test]
fn anonymous_target() {
    let doc = parse_doc("__ https://example.org/\n");
    let target = find_first(&doc, Kind::Target);
    assert_eq!(doc.get_int(target, "anonymous"), Some(1));
    assert_eq!(doc.get_str(target, "refuri"), Some("https://example.org/"));
    assert_eq!(doc.anonymous_targets, [target]);
}

#[test]
fn manual_footnote() {
    assert_pformat(
        ".. [1] Note text.\n",
        "    <footnote ids=\"id1\" names=\"1\">
        <label>
            1
        <paragraph>
            Note text.
",
    );
}

#[test]
fn auto_numbered_footnote_waits_for_its_label() {
    let doc = parse_doc(".. [#] Auto.\n");
    let footnote = find_first(&doc, Kind::Footnote);
    assert_eq!(doc.get_int(footnote, "auto"), Some(1));
    assert_eq!(child_kinds(&doc, footnote), [Kind::Paragraph]);
    assert_eq!(doc.autofootnotes, [footnote]);
}

#[test]
fn citation() {
    let doc = parse_doc(".. [CIT2002] A citation.\n");
    let citation = find_first(&doc, Kind::Citation);
    assert_eq!(doc.list(citation, "ids"), ["cit2002"]);
    assert_eq!(doc.list(citation, "names"), ["cit2002"]);
    assert_eq!(doc.astext(find_first(&doc, Kind::Label)), "CIT2002");
}

#[test]
fn substitution_definition() {
    let doc = parse_doc(".. |x| replace:: text\n");
    let definition = find_first(&doc, Kind::SubstitutionDefinition);
    assert_eq!(doc.list(definition, "names"), ["x"]);
    assert_eq!(doc.astext(definition), "text");
    assert!(doc.substitution_defs.contains_key("x"));
}

#[test]
fn empty_substitution_definition() {
    let doc = parse_doc(".. |x|\n");
    assert_eq!(messages(&doc), ["Substitution definition \"x\" missing contents."]);
}

#[test]
fn unknown_directive() {
    let doc = parse_doc(".. nonesuch:: arg\n");
    assert!(
        messages(&doc)
            .iter()
            .any(|m| m == "Unknown directive type \"nonesuch\".")
    );
    let error = *doc.system_messages().last().unwrap();
    assert_eq!(doc.get_int(error, "level"), Some(3));
    assert_eq!(
        doc.astext(find_first(&doc, Kind::LiteralBlock)),
        ".. nonesuch:: arg"
    );
}

#[test]
fn duplicate_explicit_targets() {
    let doc = parse_doc(".. _a: https://one.example/\n.. _a: https://two.example/\n");
    let targets = doc.find_all(doc.root(), Kind::Target);
    assert_eq!(doc.list(targets[0], "ids"), ["a"]);
    assert_eq!(doc.list(targets[0], "dupnames"), ["a"]);
    assert_eq!(doc.list(targets[1], "ids"), ["id1"]);
    assert_eq!(doc.list(targets[1], "dupnames"), ["a"]);
    assert_eq!(messages(&doc), ["Duplicate explicit target name: \"a\"."]);
    let msg = find_first(&doc, Kind::SystemMessage);
    assert_eq!(doc.get_int(msg, "level"), Some(2));
}

#[test]
fn explicit_markup_without_blank_line() {
    assert_block_kinds(
        ".. comment\nPara.\n",
        &[Kind::Comment, Kind::SystemMessage, Kind::Paragraph],
    );
}
