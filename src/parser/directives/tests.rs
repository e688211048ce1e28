use crate::config::{Settings, SettingsBuilder};
use crate::nodes::{Document, Kind, NodeId};
use crate::writers::pseudoxml::pformat;

fn quiet() -> SettingsBuilder {
    Settings::builder().warning_stream("-").halt_level(5)
}

fn parse_with(input: &str, settings: Settings) -> Document {
    crate::parser::parse(input, &settings).unwrap()
}

fn parse_doc(input: &str) -> Document {
    parse_with(input, quiet().build())
}

fn first(doc: &Document, kind: Kind) -> NodeId {
    doc.find_all(doc.root(), kind)
        .first()
        .copied()
        .unwrap_or_else(|| panic!("no {kind:?} in document"))
}

fn kinds(doc: &Document, node: NodeId) -> Vec<Kind> {
    doc.children(node).iter().filter_map(|&c| doc.kind(c)).collect()
}

fn messages(doc: &Document) -> Vec<String> {
    doc.system_messages()
        .into_iter()
        .filter_map(|m| doc.children(m).first().map(|&p| doc.astext(p)))
        .collect()
}

#[test]
fn note_admonition() {
    let doc = parse_doc(".. note:: Be careful.\n");
    similar_asserts::assert_eq!(
        pformat(&doc, doc.root()),
        "<document source=\"<string>\">
    <note>
        <paragraph>
            Be careful.
"
    );
}

#[test]
fn admonition_without_content() {
    let doc = parse_doc(".. note::\n");
    assert_eq!(
        messages(&doc),
        ["Content block expected for the \"note\" directive; none found."]
    );
    let msg = first(&doc, Kind::SystemMessage);
    assert_eq!(doc.get_int(msg, "level"), Some(3));
    assert_eq!(doc.astext(first(&doc, Kind::LiteralBlock)), ".. note::");
}

#[test]
fn generic_admonition_gets_title_class() {
    let doc = parse_doc(".. admonition:: Read This\n\n   Body.\n");
    let node = first(&doc, Kind::Admonition);
    assert_eq!(doc.list(node, "classes"), ["admonition-read-this"]);
    assert_eq!(kinds(&doc, node), [Kind::Title, Kind::Paragraph]);
}

#[test]
fn topic_with_title() {
    let doc = parse_doc(".. topic:: Topic Title\n\n   Content.\n");
    let topic = first(&doc, Kind::Topic);
    assert_eq!(kinds(&doc, topic), [Kind::Title, Kind::Paragraph]);
}

#[test]
fn topic_not_allowed_in_body_elements() {
    let doc = parse_doc(".. note::\n\n   .. topic:: Inner\n\n      Text.\n");
    assert_eq!(
        messages(&doc),
        ["The \"topic\" directive may not be used within topics or body elements."]
    );
}

#[test]
fn image_options() {
    let doc = parse_doc(".. image:: picture.png\n   :alt: A picture\n   :width: 200px\n");
    let image = first(&doc, Kind::Image);
    assert_eq!(doc.get_str(image, "uri"), Some("picture.png"));
    assert_eq!(doc.get_str(image, "alt"), Some("A picture"));
    assert_eq!(doc.get_str(image, "width"), Some("200px"));
}

#[test]
fn image_target_wraps_in_reference() {
    let doc = parse_doc(".. image:: picture.png\n   :target: https://example.org/\n");
    let reference = first(&doc, Kind::Reference);
    assert_eq!(doc.get_str(reference, "refuri"), Some("https://example.org/"));
    assert_eq!(kinds(&doc, reference), [Kind::Image]);
}

#[test]
fn invalid_option_value() {
    let doc = parse_doc(".. image:: picture.png\n   :align: sideways\n");
    assert!(doc.find_all(doc.root(), Kind::Image).is_empty());
    let texts = messages(&doc);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Error in \"image\" directive"));
}

#[test]
fn unknown_option() {
    let doc = parse_doc(".. image:: picture.png\n   :bogus: yes\n");
    assert!(messages(&doc)[0].contains("unknown option: \"bogus\""));
}

#[test]
fn figure_with_caption_and_legend() {
    let doc = parse_doc(".. figure:: picture.png\n\n   The caption.\n\n   The legend.\n");
    let figure = first(&doc, Kind::Figure);
    assert_eq!(kinds(&doc, figure), [Kind::Image, Kind::Caption, Kind::Legend]);
    assert_eq!(doc.astext(first(&doc, Kind::Caption)), "The caption.");
}

#[test]
fn code_block_classes() {
    let doc = parse_doc(".. code:: rust\n\n   fn main() {}\n");
    let block = first(&doc, Kind::LiteralBlock);
    assert_eq!(doc.list(block, "classes"), ["code", "rust"]);
    assert_eq!(doc.astext(block), "fn main() {}");
}

#[test]
fn csv_table() {
    let doc = parse_doc(
        ".. csv-table:: Numbers\n   :header: \"A\", \"B\"\n\n   1, 2\n   3, 4\n",
    );
    let table = first(&doc, Kind::Table);
    assert_eq!(doc.astext(doc.children(table)[0]), "Numbers");
    let tgroup = first(&doc, Kind::Tgroup);
    assert_eq!(doc.get_int(tgroup, "cols"), Some(2));
    assert_eq!(doc.astext(first(&doc, Kind::Thead)), "A\n\nB");
    assert_eq!(doc.children(first(&doc, Kind::Tbody)).len(), 2);
    let colspecs = doc.find_all(tgroup, Kind::Colspec);
    assert_eq!(doc.get_int(colspecs[0], "colwidth"), Some(50));
}

#[test]
fn csv_table_without_content() {
    let doc = parse_doc(".. csv-table::\n");
    assert_eq!(
        messages(&doc),
        ["The \"csv-table\" directive requires content; none supplied."]
    );
}

#[test]
fn list_table() {
    let doc = parse_doc(
        ".. list-table::\n   :header-rows: 1\n\n   * - H1\n     - H2\n   * - a\n     - b\n",
    );
    assert!(messages(&doc).is_empty());
    let tgroup = first(&doc, Kind::Tgroup);
    assert_eq!(doc.get_int(tgroup, "cols"), Some(2));
    assert_eq!(doc.astext(first(&doc, Kind::Thead)), "H1\n\nH2");
    assert_eq!(doc.astext(first(&doc, Kind::Tbody)), "a\n\nb");
}

#[test]
fn replace_substitution() {
    let doc = parse_doc(".. |name| replace:: *emphatic* text\n");
    let definition = first(&doc, Kind::SubstitutionDefinition);
    assert_eq!(kinds(&doc, definition), [Kind::Emphasis]);
    assert_eq!(doc.astext(definition), "emphatic text");
}

#[test]
fn replace_outside_substitution() {
    let doc = parse_doc(".. replace:: text\n");
    assert_eq!(
        messages(&doc),
        ["Invalid context: the \"replace\" directive can only be used within a \
          substitution definition."]
    );
}

#[test]
fn unicode_substitution() {
    let doc = parse_doc(".. |copy| unicode:: 0xA9 .. copyright sign\n");
    let definition = first(&doc, Kind::SubstitutionDefinition);
    assert_eq!(doc.astext(definition), "\u{a9}");
}

#[test]
fn raw_directive() {
    let doc = parse_doc(".. raw:: html\n\n   <b>bold</b>\n");
    let raw = first(&doc, Kind::Raw);
    assert_eq!(doc.get_str(raw, "format"), Some("html"));
    assert_eq!(doc.astext(raw), "<b>bold</b>");
}

#[test]
fn raw_directive_disabled() {
    let doc = parse_with(
        ".. raw:: html\n\n   <b>bold</b>\n",
        quiet().raw_enabled(false).build(),
    );
    assert!(doc.find_all(doc.root(), Kind::Raw).is_empty());
    assert_eq!(messages(&doc), ["\"raw\" directive disabled."]);
}

#[test]
fn class_directive_with_content() {
    let doc = parse_doc(".. class:: special\n\n   Para.\n");
    let paragraph = first(&doc, Kind::Paragraph);
    assert_eq!(doc.list(paragraph, "classes"), ["special"]);
    assert_eq!(doc.parent(paragraph), Some(doc.root()));
}

#[test]
fn class_directive_leaves_pending() {
    let doc = parse_doc(".. class:: special\n\nPara.\n");
    assert_eq!(kinds(&doc, doc.root()), [Kind::Pending, Kind::Paragraph]);
    assert_eq!(doc.pending.len(), 1);
}

#[test]
fn custom_role() {
    let doc = parse_doc(".. role:: custom\n\n:custom:`text`\n");
    let inline = first(&doc, Kind::Inline);
    assert_eq!(doc.list(inline, "classes"), ["custom"]);
    assert_eq!(doc.astext(inline), "text");
}

#[test]
fn default_role_unknown() {
    let doc = parse_doc(".. default-role:: nonesuch\n");
    assert!(
        messages(&doc)
            .iter()
            .any(|m| m == "Unknown interpreted text role \"nonesuch\".")
    );
}

#[test]
fn title_directive_sets_document_title() {
    let doc = parse_doc(".. title:: Window Title\n");
    assert_eq!(doc.get_str(doc.root(), "title"), Some("Window Title"));
}

#[test]
fn too_many_arguments() {
    let doc = parse_doc(".. code:: rust extra\n\n   x\n");
    assert!(messages(&doc)[0].contains("maximum 1 argument(s) allowed, 2 supplied"));
}
