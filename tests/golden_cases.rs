//! Golden test cases for restruct.
//!
//! Each test case is a directory under `tests/cases/` containing:
//! - `input.rst` - Source document
//! - `expected.pseudoxml` - Expected pseudo-XML after the standard transforms
//! - `restruct.toml` - (Optional) Settings for the case
//!
//! Run with `UPDATE_EXPECTED=1 cargo test` to regenerate expected outputs.

use restruct::{Format, Settings, from_xml, publish, publish_doctree};
use std::{fs, path::Path};

/// Load settings from the test case directory if present; diagnostics are
/// never written to stderr.
fn load_test_settings(dir: &Path) -> Settings {
    let config_path = dir.join("restruct.toml");
    let mut settings = if config_path.exists() {
        let content = fs::read_to_string(&config_path).unwrap();
        toml::from_str(&content).unwrap()
    } else {
        Settings::default()
    };
    settings.warning_stream = Some("-".to_string());
    settings
}

fn run_golden_case(case_name: &str) {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
        .join(case_name);
    let update_expected = std::env::var_os("UPDATE_EXPECTED").is_some();

    let settings = load_test_settings(&dir);
    let input = fs::read_to_string(dir.join("input.rst"))
        .unwrap_or_else(|_| panic!("No input.rst in {case_name}"));

    let output = publish(&input, &settings, Format::PseudoXml).unwrap();

    // The XML writer and loader must agree on every node and attribute.
    let xml = publish(&input, &settings, Format::Xml).unwrap();
    let reloaded = from_xml(&xml, settings.clone()).unwrap();
    similar_asserts::assert_eq!(
        output,
        restruct::writers::write(&reloaded, Format::PseudoXml),
        "XML round trip: {}",
        case_name
    );

    // Serializing twice gives the same text.
    let doc = publish_doctree(&input, &settings).unwrap();
    similar_asserts::assert_eq!(
        output,
        restruct::writers::write(&doc, Format::PseudoXml),
        "stable output: {}",
        case_name
    );

    let expected_path = dir.join("expected.pseudoxml");
    if update_expected {
        fs::write(&expected_path, &output).unwrap();
        return;
    }
    let expected = fs::read_to_string(&expected_path)
        .unwrap_or_else(|_| panic!("No expected.pseudoxml in {case_name}"));
    similar_asserts::assert_eq!(expected, output, "case: {}", case_name);
}

/// Generate one test function per case directory.
macro_rules! golden_test_cases {
    ($($case:ident),+ $(,)?) => {
        $(
            #[test]
            fn $case() {
                run_golden_case(stringify!($case));
            }
        )+
    };
}

golden_test_cases!(
    anonymous_link,
    auto_footnote,
    bullet_list,
    directives,
    doctitle,
    doctitle_disabled,
    grid_table,
    hello,
    inline_markup,
    malformed_grid_table,
    nested_sections,
    simple_table,
);
