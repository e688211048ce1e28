//! XML snapshots of small documents after the standard transforms.

use restruct::{Format, Settings, publish};

/// The XML body, without the generator comment that carries the version.
fn xml(text: &str) -> String {
    let settings = Settings::builder()
        .warning_stream("-")
        .xml_declaration(false)
        .doctype_declaration(false)
        .build();
    publish(text, &settings, Format::Xml)
        .unwrap()
        .lines()
        .filter(|line| !line.starts_with("<!-- Generated by"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn inline_markup() {
    insta::assert_snapshot!(xml("Some *emphasis*, **strong** and ``code``.\n"), @r#"
    <document source="&lt;string&gt;">
        <paragraph>Some <emphasis>emphasis</emphasis>, <strong>strong</strong> and <literal>code</literal>.</paragraph>
    </document>
    "#);
}

#[test]
fn literal_block() {
    insta::assert_snapshot!(xml("Example::\n\n    code\n"), @r#"
    <document source="&lt;string&gt;">
        <paragraph>Example:</paragraph>
        <literal_block xml:space="preserve">code</literal_block>
    </document>
    "#);
}

#[test]
fn bibliographic_fields() {
    let text = "Title\n=====\n\n:Author: Me\n:Version: 1.0\n:Custom: value\n\nBody.\n";
    insta::assert_snapshot!(xml(text), @r#"
    <document ids="title" names="title" source="&lt;string&gt;" title="Title">
        <title>Title</title>
        <docinfo>
            <author>Me</author>
            <version>1.0</version>
            <field classes="custom">
                <field_name>Custom</field_name>
                <field_body>
                    <paragraph>value</paragraph>
                </field_body>
            </field>
        </docinfo>
        <paragraph>Body.</paragraph>
    </document>
    "#);
}
