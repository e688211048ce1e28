use crate::nodes::Kind;
use crate::parser::block_parser::tests::helpers::{
    assert_block_kinds, assert_pformat, child_kinds, find_first, messages, parse_doc,
};

const GRID: &str = "\
+-----+-----+
| a   | b   |
+-----+-----+
";

#[test]
fn grid_table_structure() {
    let doc = parse_doc(GRID);
    assert_eq!(child_kinds(&doc, doc.root()), [Kind::Table]);
    let tgroup = find_first(&doc, Kind::Tgroup);
    assert_eq!(doc.get_int(tgroup, "cols"), Some(2));
    assert_eq!(
        child_kinds(&doc, tgroup),
        [Kind::Colspec, Kind::Colspec, Kind::Tbody]
    );
    let row = find_first(&doc, Kind::Row);
    assert_eq!(child_kinds(&doc, row), [Kind::Entry, Kind::Entry]);
    let entries = doc.find_all(row, Kind::Entry);
    assert_eq!(doc.astext(entries[0]), "a");
    assert_eq!(doc.astext(entries[1]), "b");
    let colspec = find_first(&doc, Kind::Colspec);
    assert_eq!(doc.get_int(colspec, "colwidth"), Some(5));
}

#[test]
fn grid_table_header() {
    let doc = parse_doc(
        "+-----+-----+\n| h1  | h2  |\n+=====+=====+\n| a   | b   |\n+-----+-----+\n",
    );
    let tgroup = find_first(&doc, Kind::Tgroup);
    assert_eq!(
        child_kinds(&doc, tgroup),
        [Kind::Colspec, Kind::Colspec, Kind::Thead, Kind::Tbody]
    );
    assert_eq!(doc.astext(find_first(&doc, Kind::Thead)), "h1\n\nh2");
}

#[test]
fn grid_table_spanning_cell() {
    let doc = parse_doc(
        "+-----+-----+\n| wide      |\n+-----+-----+\n| a   | b   |\n+-----+-----+\n",
    );
    let entry = find_first(&doc, Kind::Entry);
    assert_eq!(doc.get_int(entry, "morecols"), Some(1));
}

#[test]
fn simple_table() {
    let doc = parse_doc("=====  =====\nA      B\n=====  =====\n1      2\n3      4\n=====  =====\n");
    let tgroup = find_first(&doc, Kind::Tgroup);
    assert_eq!(doc.get_int(tgroup, "cols"), Some(2));
    let tbody = find_first(&doc, Kind::Tbody);
    assert_eq!(doc.children(tbody).len(), 2);
    assert_eq!(doc.astext(find_first(&doc, Kind::Thead)), "A\n\nB");
}

#[test]
fn unterminated_grid_table_is_malformed() {
    assert_pformat(
        "+---+---+\n| a | b |\n",
        "    <system_message level=\"3\" line=\"1\" source=\"<string>\" type=\"ERROR\">
        <paragraph>
            Malformed table.
        <literal_block xml:space=\"preserve\">
            +---+---+
            | a | b |
",
    );
}

#[test]
fn malformed_table_leaves_no_table() {
    let doc = parse_doc("+---+---+\n| a | b |\n");
    assert!(doc.find_all(doc.root(), Kind::Table).is_empty());
    assert_eq!(messages(&doc).len(), 1);
    assert!(messages(&doc)[0].starts_with("Malformed table."));
}

#[test]
fn table_followed_by_paragraph() {
    assert_block_kinds(
        &format!("{GRID}\nAfter.\n"),
        &[Kind::Table, Kind::Paragraph],
    );
}
