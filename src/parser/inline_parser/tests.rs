use super::*;
use crate::config::Settings;

fn doc_with(settings: Settings) -> Document {
    Document::new(settings)
}

fn quiet() -> Settings {
    Settings::builder().warning_stream("-").build()
}

/// Parse `text` into a fresh paragraph; returns the document, the
/// paragraph and the messages.
fn parse_with(settings: Settings, text: &str) -> (Document, NodeId, Vec<NodeId>) {
    let mut doc = doc_with(settings);
    let para = doc.new_element(Kind::Paragraph);
    let root = doc.root();
    doc.append(root, para);
    let mut inliner = Inliner::new(&doc.settings.clone());
    let (nodes, messages) = inliner.parse(&mut doc, text, 1, root).unwrap();
    doc.extend(para, nodes);
    (doc, para, messages)
}

fn parse(text: &str) -> (Document, NodeId, Vec<NodeId>) {
    parse_with(quiet(), text)
}

/// Kinds of the paragraph's children; text nodes as `#text`.
fn shape(doc: &Document, para: NodeId) -> Vec<&'static str> {
    doc.children(para)
        .iter()
        .map(|&c| doc.kind(c).map_or("#text", |k| k.tag()))
        .collect()
}

fn child(doc: &Document, para: NodeId, i: usize) -> NodeId {
    doc.children(para)[i]
}

mod emphasis_tests {
    use super::*;

    #[test]
    fn strong_and_emphasis() {
        let (doc, para, messages) = parse("This is **bold** and *it*.");
        assert!(messages.is_empty());
        assert_eq!(shape(&doc, para), ["#text", "strong", "#text", "emphasis", "#text"]);
        assert_eq!(doc.astext(child(&doc, para, 1)), "bold");
        assert_eq!(doc.rawsource(child(&doc, para, 1)), "**bold**");
        assert_eq!(doc.astext(child(&doc, para, 3)), "it");
    }

    #[test]
    fn intraword_asterisks_are_text() {
        let (doc, para, _) = parse("2*x*y and a*b");
        assert_eq!(shape(&doc, para), ["#text"]);
    }

    #[test]
    fn quoted_start_string_is_text() {
        let (doc, para, messages) = parse("a \"*\" and (*) here");
        assert!(messages.is_empty());
        assert_eq!(shape(&doc, para), ["#text"]);
        assert_eq!(doc.astext(para), "a \"*\" and (*) here");
    }

    #[test]
    fn unmatched_start_string_is_problematic() {
        let (doc, para, messages) = parse("an *unclosed start");
        assert_eq!(shape(&doc, para), ["#text", "problematic", "#text"]);
        assert_eq!(messages.len(), 1);
        let msg = messages[0];
        assert_eq!(
            doc.astext(msg),
            "Inline emphasis start-string without end-string."
        );
        let prb = child(&doc, para, 1);
        let msgid = doc.list(msg, "ids")[0].clone();
        assert_eq!(doc.get_str(prb, "refid"), Some(msgid.as_str()));
        assert_eq!(doc.list(msg, "backrefs"), doc.list(prb, "ids"));
    }

    #[test]
    fn many_unmatched_start_strings() {
        let text = "*a ".repeat(2000);
        let (doc, para, messages) = parse(text.trim_end());
        assert_eq!(messages.len(), 2000);
        assert_eq!(doc.find_all(para, Kind::Problematic).len(), 2000);
        assert_eq!(doc.astext(para), text.trim_end());
    }

    #[test]
    fn failed_strong_search_leaves_emphasis_alone() {
        let (doc, para, messages) = parse("**a and *b* then *c*");
        assert_eq!(messages.len(), 1);
        let emphasis = doc.find_all(para, Kind::Emphasis);
        assert_eq!(emphasis.len(), 2);
        assert_eq!(doc.astext(emphasis[1]), "c");
    }

    #[test]
    fn escaped_delimiters_stay_text() {
        let (doc, para, messages) = parse(r"\*not emphasis\* and \`not literal\`");
        assert!(messages.is_empty());
        assert_eq!(shape(&doc, para), ["#text"]);
        assert_eq!(doc.astext(para), "*not emphasis* and `not literal`");
    }

    #[test]
    fn escaped_space_joins_markup_to_word() {
        let (doc, para, _) = parse(r"Python\ *ic*");
        assert_eq!(shape(&doc, para), ["#text", "emphasis"]);
        assert_eq!(doc.astext(child(&doc, para, 0)), "Python");
    }

    #[test]
    fn character_level_markup() {
        let settings = Settings {
            character_level_inline_markup: true,
            ..quiet()
        };
        let (doc, para, _) = parse_with(settings, "un*frigging*believable");
        assert_eq!(shape(&doc, para), ["#text", "emphasis", "#text"]);
    }
}

mod literal_tests {
    use super::*;

    #[test]
    fn literal_keeps_backslashes() {
        let (doc, para, _) = parse(r"use ``C:\path`` here");
        assert_eq!(shape(&doc, para), ["#text", "literal", "#text"]);
        assert_eq!(doc.astext(child(&doc, para, 1)), r"C:\path");
    }

    #[test]
    fn literal_may_contain_asterisks() {
        let (doc, para, _) = parse("``*args``");
        assert_eq!(shape(&doc, para), ["literal"]);
        assert_eq!(doc.astext(child(&doc, para, 0)), "*args");
    }
}

mod interpreted_tests {
    use super::*;

    #[test]
    fn default_role_is_title_reference() {
        let (doc, para, _) = parse("read `The Book` now");
        assert_eq!(shape(&doc, para), ["#text", "title_reference", "#text"]);
    }

    #[test]
    fn prefix_and_suffix_roles() {
        let (doc, para, messages) = parse("H\\ :sub:`2`\\ O and 2\\ `10`:sup:");
        assert!(messages.is_empty());
        assert_eq!(
            shape(&doc, para),
            ["#text", "subscript", "#text", "superscript"]
        );
        assert_eq!(doc.astext(para), "H2O and 210");
    }

    #[test]
    fn unknown_role_is_an_error() {
        let (doc, para, messages) = parse(":bogus:`x`");
        assert_eq!(shape(&doc, para), ["problematic"]);
        let types: Vec<_> = messages
            .iter()
            .map(|&m| doc.get_str(m, "type").unwrap_or_default().to_string())
            .collect();
        assert_eq!(types, ["INFO", "ERROR"]);
        assert_eq!(doc.astext(messages[1]), "Unknown interpreted text role \"bogus\".");
    }

    #[test]
    fn both_roles_is_a_warning() {
        let (doc, para, messages) = parse(":sub:`x`:sup:");
        assert_eq!(shape(&doc, para), ["problematic"]);
        assert!(doc.astext(messages[0]).starts_with("Multiple roles in interpreted text"));
    }

    #[test]
    fn role_with_reference_suffix_is_a_warning() {
        let (doc, _, messages) = parse(":sub:`x`_");
        assert_eq!(
            doc.astext(messages[0]),
            "Mismatch: both interpreted text role prefix and reference suffix."
        );
    }

    #[test]
    fn code_and_math_roles() {
        let (doc, para, _) = parse(r":code:`a < b` and :math:`\alpha`");
        let code = child(&doc, para, 0);
        assert!(doc.is(code, Kind::Literal));
        assert_eq!(doc.list(code, "classes"), ["code"]);
        let math = child(&doc, para, 2);
        assert!(doc.is(math, Kind::Math));
        assert_eq!(doc.astext(math), r"\alpha");
    }

    #[test]
    fn pep_role_validates_number() {
        let (doc, para, messages) = parse(":PEP:`8` and :PEP:`x`");
        let pep = child(&doc, para, 0);
        assert_eq!(doc.astext(pep), "PEP 8");
        assert_eq!(doc.get_str(pep, "refuri"), Some("https://peps.python.org/pep-0008"));
        assert_eq!(messages.len(), 1);
        assert!(doc.astext(messages[0]).starts_with("PEP number must be"));
    }

    #[test]
    fn rfc_role_with_section() {
        let (doc, para, _) = parse(":RFC:`2822#section-3`");
        let rfc = child(&doc, para, 0);
        assert_eq!(doc.astext(rfc), "RFC 2822");
        assert_eq!(
            doc.get_str(rfc, "refuri"),
            Some("https://tools.ietf.org/html/rfc2822.html#section-3")
        );
    }

    #[test]
    fn bare_raw_role_needs_format() {
        let (doc, para, messages) = parse(":raw:`<b>`");
        assert_eq!(shape(&doc, para), ["problematic"]);
        assert!(doc.astext(messages[0]).starts_with("No format (Writer name)"));
    }
}

mod reference_tests {
    use super::*;

    #[test]
    fn named_reference() {
        let (doc, para, _) = parse("see Python_ now");
        let reference = child(&doc, para, 1);
        assert!(doc.is(reference, Kind::Reference));
        assert_eq!(doc.get_str(reference, "refname"), Some("python"));
        assert_eq!(doc.get_str(reference, "name"), Some("Python"));
        assert_eq!(doc.refnames.get("python").map(Vec::len), Some(1));
    }

    #[test]
    fn anonymous_phrase_reference() {
        let (doc, para, _) = parse("`X`__");
        let reference = child(&doc, para, 0);
        assert_eq!(doc.get_int(reference, "anonymous"), Some(1));
        assert!(!doc.has_attr(reference, "refname"));
    }

    #[test]
    fn embedded_uri_creates_target() {
        let (doc, para, _) = parse("`Python <http://www.python.org/>`_");
        assert_eq!(shape(&doc, para), ["reference", "target"]);
        let reference = child(&doc, para, 0);
        let target = child(&doc, para, 1);
        assert_eq!(doc.astext(reference), "Python");
        assert_eq!(doc.get_str(reference, "refuri"), Some("http://www.python.org/"));
        assert_eq!(doc.list(target, "names"), ["python"]);
        assert_eq!(doc.list(target, "ids"), ["python"]);
    }

    #[test]
    fn embedded_alias_is_indirect() {
        let (doc, para, _) = parse("`the docs <Docs Page_>`_");
        let reference = child(&doc, para, 0);
        let target = child(&doc, para, 1);
        assert_eq!(doc.get_str(reference, "refname"), Some("docs page"));
        assert_eq!(doc.get_str(target, "refname"), Some("docs page"));
        assert_eq!(doc.indirect_targets, vec![target]);
    }

    #[test]
    fn anonymous_embedded_uri_has_no_target() {
        let (doc, para, _) = parse("`<a@example.org>`__");
        assert_eq!(shape(&doc, para), ["reference"]);
        let reference = child(&doc, para, 0);
        assert_eq!(doc.astext(reference), "mailto:a@example.org");
        assert_eq!(doc.get_str(reference, "refuri"), Some("mailto:a@example.org"));
    }

    #[test]
    fn inline_internal_target() {
        let (doc, para, _) = parse("a _`Target Phrase` here");
        let target = child(&doc, para, 1);
        assert!(doc.is(target, Kind::Target));
        assert_eq!(doc.list(target, "names"), ["target phrase"]);
        assert_eq!(doc.nameids.get("target phrase"), Some(&Some("target-phrase".to_string())));
    }

    #[test]
    fn footnote_references() {
        let (doc, para, _) = parse("[1]_ [#]_ [#note]_ [*]_ [CIT2002]_");
        let kinds = shape(&doc, para);
        assert_eq!(kinds.iter().filter(|k| **k == "footnote_reference").count(), 4);
        assert_eq!(kinds.last(), Some(&"citation_reference"));
        let manual = child(&doc, para, 0);
        assert_eq!(doc.get_str(manual, "refname"), Some("1"));
        let auto = child(&doc, para, 2);
        assert_eq!(doc.get_int(auto, "auto"), Some(1));
        assert!(!doc.has_attr(auto, "refname"));
        let labelled = child(&doc, para, 4);
        assert_eq!(doc.get_str(labelled, "refname"), Some("note"));
        let symbol = child(&doc, para, 6);
        assert_eq!(doc.get_str(symbol, "auto"), Some("*"));
        assert_eq!(doc.autofootnote_refs.len(), 2);
    }

    #[test]
    fn trim_footnote_reference_space() {
        let settings = Settings {
            trim_footnote_reference_space: true,
            ..quiet()
        };
        let (doc, para, _) = parse_with(settings, "word [1]_");
        assert_eq!(doc.astext(child(&doc, para, 0)), "word");
    }

    #[test]
    fn substitution_references() {
        let (doc, para, _) = parse("|name| and |link|_");
        let subref = child(&doc, para, 0);
        assert!(doc.is(subref, Kind::SubstitutionReference));
        assert_eq!(doc.get_str(subref, "refname"), Some("name"));
        let reference = child(&doc, para, 2);
        assert!(doc.is(reference, Kind::Reference));
        assert_eq!(doc.get_str(reference, "refname"), Some("link"));
        assert!(doc.is(doc.children(reference)[0], Kind::SubstitutionReference));
    }
}

mod implicit_tests {
    use super::*;

    #[test]
    fn standalone_uri() {
        let (doc, para, _) = parse("Go to http://example.org/path.");
        assert_eq!(shape(&doc, para), ["#text", "reference", "#text"]);
        let reference = child(&doc, para, 1);
        assert_eq!(doc.get_str(reference, "refuri"), Some("http://example.org/path"));
        assert_eq!(doc.astext(child(&doc, para, 2)), ".");
    }

    #[test]
    fn email_gets_mailto() {
        let (doc, para, _) = parse("Write to someone@example.com today");
        let reference = child(&doc, para, 1);
        assert_eq!(doc.get_str(reference, "refuri"), Some("mailto:someone@example.com"));
    }

    #[test]
    fn unknown_scheme_is_text() {
        let (doc, para, _) = parse("note:this is plain, but https://x.org is not");
        assert_eq!(shape(&doc, para), ["#text", "reference", "#text"]);
    }

    #[test]
    fn pep_and_rfc_when_enabled() {
        let settings = Settings {
            pep_references: true,
            rfc_references: true,
            ..quiet()
        };
        let (doc, para, _) = parse_with(settings, "See PEP 287 and RFC 2822.");
        assert_eq!(
            shape(&doc, para),
            ["#text", "reference", "#text", "reference", "#text"]
        );
        assert_eq!(
            doc.get_str(child(&doc, para, 1), "refuri"),
            Some("https://peps.python.org/pep-0287")
        );
        assert_eq!(
            doc.get_str(child(&doc, para, 3), "refuri"),
            Some("https://tools.ietf.org/html/rfc2822.html")
        );
    }

    #[test]
    fn pep_is_text_by_default() {
        let (doc, para, _) = parse("See PEP 287.");
        assert_eq!(shape(&doc, para), ["#text"]);
    }

    #[test]
    fn adjust_uri_only_touches_addresses() {
        assert_eq!(adjust_uri("a@b.org"), "mailto:a@b.org");
        assert_eq!(adjust_uri("http://b.org"), "http://b.org");
    }
}
