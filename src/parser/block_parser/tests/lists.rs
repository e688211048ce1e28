use crate::nodes::Kind;
use crate::parser::block_parser::tests::helpers::{
    assert_block_kinds, assert_pformat, child_kinds, find_first, messages, parse_doc,
};

#[test]
fn bullet_list() {
    assert_pformat(
        "- a\n- b\n",
        "    <bullet_list bullet=\"-\">
        <list_item>
            <paragraph>
                a
        <list_item>
            <paragraph>
                b
",
    );
}

#[test]
fn different_bullets_start_new_lists() {
    assert_block_kinds("- a\n\n* b\n", &[Kind::BulletList, Kind::BulletList]);
}

#[test]
fn nested_bullet_list() {
    let doc = parse_doc("- a\n\n  - b\n  - c\n\n- d\n");
    let outer = find_first(&doc, Kind::BulletList);
    assert_eq!(doc.children(outer).len(), 2);
    let first_item = doc.children(outer)[0];
    assert_eq!(child_kinds(&doc, first_item), [Kind::Paragraph, Kind::BulletList]);
}

#[test]
fn list_item_ends_without_blank_line_warns() {
    let doc = parse_doc("- a\nText.\n");
    assert_eq!(messages(&doc), ["Bullet list ends without a blank line; unexpected unindent."]);
}

#[test]
fn arabic_enumerated_list() {
    assert_pformat(
        "1. one\n2. two\n",
        "    <enumerated_list enumtype=\"arabic\" prefix=\"\" suffix=\".\">
        <list_item>
            <paragraph>
                one
        <list_item>
            <paragraph>
                two
",
    );
}

#[test]
fn alpha_enumerators_with_parentheses() {
    let doc = parse_doc("(a) one\n(b) two\n");
    let list = find_first(&doc, Kind::EnumeratedList);
    assert_eq!(doc.get_str(list, "enumtype"), Some("loweralpha"));
    assert_eq!(doc.get_str(list, "prefix"), Some("("));
    assert_eq!(doc.get_str(list, "suffix"), Some(")"));
}

#[test]
fn start_value_other_than_one() {
    let doc = parse_doc("3. three\n4. four\n");
    let list = find_first(&doc, Kind::EnumeratedList);
    assert_eq!(doc.get_int(list, "start"), Some(3));
    assert_eq!(
        messages(&doc),
        ["Enumerated list start value not ordinal-1: \"3\" (ordinal 3)"]
    );
}

#[test]
fn auto_enumerator() {
    let doc = parse_doc("#. one\n#. two\n");
    let list = find_first(&doc, Kind::EnumeratedList);
    assert_eq!(doc.get_str(list, "enumtype"), Some("arabic"));
    assert_eq!(doc.children(list).len(), 2);
}

#[test]
fn roman_numerals() {
    let doc = parse_doc("i. one\nii. two\n");
    let list = find_first(&doc, Kind::EnumeratedList);
    assert_eq!(doc.get_str(list, "enumtype"), Some("lowerroman"));
}

#[test]
fn single_letter_sentence_is_a_paragraph() {
    assert_block_kinds("A. Einstein was\na genius.\n", &[Kind::Paragraph]);
}

#[test]
fn field_list() {
    let doc = parse_doc(":Name: value\n:Other: more\n");
    let list = find_first(&doc, Kind::FieldList);
    assert_eq!(doc.children(list).len(), 2);
    let field = doc.children(list)[0];
    assert_eq!(child_kinds(&doc, field), [Kind::FieldName, Kind::FieldBody]);
    assert_eq!(doc.astext(find_first(&doc, Kind::FieldName)), "Name");
    assert_eq!(doc.astext(find_first(&doc, Kind::FieldBody)), "value");
}

#[test]
fn option_list() {
    let doc = parse_doc("-a         all\n--file=FILE  read FILE\n");
    let list = find_first(&doc, Kind::OptionList);
    assert_eq!(doc.children(list).len(), 2);
    let argument = find_first(&doc, Kind::OptionArgument);
    assert_eq!(doc.astext(argument), "FILE");
    assert_eq!(doc.get_str(argument, "delimiter"), Some("="));
    let strings: Vec<String> = doc
        .find_all(doc.root(), Kind::OptionString)
        .into_iter()
        .map(|s| doc.astext(s))
        .collect();
    assert_eq!(strings, ["-a", "--file"]);
}

#[test]
fn option_group_with_synonyms() {
    let doc = parse_doc("-f, --force  do it\n");
    let group = find_first(&doc, Kind::OptionGroup);
    assert_eq!(doc.children(group).len(), 2);
    assert_eq!(doc.astext(find_first(&doc, Kind::Description)), "do it");
}
