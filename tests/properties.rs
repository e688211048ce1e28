//! Invariants that hold for every generated document.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use restruct::writers::pseudoxml::pformat;
use restruct::{Document, Format, Kind, Pipeline, Settings, from_xml, parse, transform};

fn quiet() -> Settings {
    Settings::builder().warning_stream("-").halt_level(5).build()
}

fn transformed(text: &str) -> Document {
    let mut doc = parse(text, &quiet()).unwrap();
    transform(&mut doc, &Pipeline::standard()).unwrap();
    doc
}

fn elements(doc: &Document) -> Vec<restruct::NodeId> {
    doc.traverse(doc.root())
        .into_iter()
        .filter(|&n| !doc.is_text(n))
        .collect()
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alpha", "beta", "gamma", "delta"]).prop_map(String::from)
}

/// One top-level construct, rendered as source text without the trailing
/// blank line.
fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(word(), 1..6).prop_map(|w| w.join(" ")),
        (name(), word()).prop_map(|(n, w)| format!("See {n}_ and {w}.")),
        name().prop_map(|n| format!(".. _{n}: https://example.org/{n}")),
        name().prop_map(|n| format!(".. _{n}:")),
        (name(), word()).prop_map(|(n, w)| format!("{n}\n{}\n\n{w}", "=".repeat(n.len()))),
        word().prop_map(|w| format!("Note [#]_ about {w}.")),
        word().prop_map(|w| format!(".. [#] {w}")),
        name().prop_map(|n| format!("Some |{n}| here.")),
        (name(), word()).prop_map(|(n, w)| format!(".. |{n}| replace:: {w}")),
        prop::collection::vec(word(), 1..4)
            .prop_map(|items| items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")),
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(block(), 1..10).prop_map(|blocks| blocks.join("\n\n") + "\n")
}

/// Blocks that mean the same inside a block quote.
fn body_block() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(word(), 1..6).prop_map(|w| w.join(" ")),
        prop::collection::vec(word(), 1..4)
            .prop_map(|items| items.iter().map(|i| format!("* {i}")).collect::<Vec<_>>().join("\n")),
        (word(), word()).prop_map(|(t, d)| format!("{t}\n  {d}")),
        (word(), word()).prop_map(|(p, c)| format!("{p}::\n\n  {c}")),
        prop::collection::vec(word(), 1..3)
            .prop_map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, w)| format!("{}. {w}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
    ]
}

proptest! {
    #[test]
    fn ids_are_unique(text in document()) {
        let doc = parse(&text, &quiet()).unwrap();
        let mut seen = HashSet::new();
        for node in elements(&doc) {
            for id in doc.list(node, "ids") {
                prop_assert!(seen.insert(id.clone()), "duplicate id {id} in {text:?}");
            }
        }
    }

    #[test]
    fn names_have_one_owner(text in document()) {
        let doc = parse(&text, &quiet()).unwrap();
        let mut owners: HashMap<String, usize> = HashMap::new();
        for node in elements(&doc) {
            if doc.is(node, Kind::SubstitutionDefinition) {
                continue;
            }
            for name in doc.list(node, "names") {
                *owners.entry(name.clone()).or_default() += 1;
            }
        }
        for (name, count) in owners {
            prop_assert_eq!(count, 1, "name {} owned {} times", name, count);
        }
    }

    #[test]
    fn no_refname_to_external_target(text in document()) {
        let doc = transformed(&text);
        let external: HashSet<String> = doc
            .find_all(doc.root(), Kind::Target)
            .into_iter()
            .filter(|&t| doc.has_attr(t, "refuri"))
            .flat_map(|t| doc.list(t, "names").to_vec())
            .collect();
        for reference in doc.find_all(doc.root(), Kind::Reference) {
            if let Some(refname) = doc.get_str(reference, "refname") {
                prop_assert!(!external.contains(refname), "unresolved {refname}");
            }
        }
    }

    #[test]
    fn auto_footnote_references_resolve(text in document()) {
        let doc = transformed(&text);
        for reference in doc.find_all(doc.root(), Kind::FootnoteReference) {
            if doc.get_int(reference, "auto") != Some(1) {
                continue;
            }
            let refid = doc.get_str(reference, "refid");
            prop_assert!(refid.is_some(), "unlinked auto footnote reference");
            let target = refid.and_then(|id| doc.ids.get(id).copied());
            prop_assert!(target.is_some_and(|t| doc.is(t, Kind::Footnote)));
        }
    }

    #[test]
    fn defined_substitutions_are_replaced(text in document()) {
        let doc = transformed(&text);
        for subref in doc.find_all(doc.root(), Kind::SubstitutionReference) {
            let refname = doc.get_str(subref, "refname").unwrap_or_default();
            prop_assert!(
                !doc.substitution_defs.contains_key(refname),
                "|{refname}| left in place"
            );
        }
    }

    #[test]
    fn xml_round_trip(text in document()) {
        let doc = transformed(&text);
        let xml = restruct::writers::write(&doc, Format::Xml);
        let reloaded = from_xml(&xml, quiet()).unwrap();
        prop_assert_eq!(pformat(&doc, doc.root()), pformat(&reloaded, reloaded.root()));
    }

    #[test]
    fn escaped_delimiters_are_plain_text(body in "[a-z *`_|\\[\\]<>]{0,30}") {
        let text = format!("a{body}z");
        let escaped: String = text
            .chars()
            .flat_map(|c| {
                if "*`_|[]<>".contains(c) {
                    vec!['\\', c]
                } else {
                    vec![c]
                }
            })
            .collect();
        let doc = parse(&format!("{escaped}\n"), &quiet()).unwrap();
        let paragraph = doc.children(doc.root())[0];
        prop_assert!(doc.is(paragraph, Kind::Paragraph));
        let children = doc.children(paragraph);
        prop_assert_eq!(children.len(), 1);
        prop_assert!(doc.is_text(children[0]));
        prop_assert_eq!(doc.astext(paragraph), text.trim_end());
    }

    #[test]
    fn indenting_wraps_in_block_quote(blocks in prop::collection::vec(body_block(), 1..5)) {
        let text = blocks.join("\n\n") + "\n";
        let indented: String = text
            .lines()
            .map(|l| if l.trim().is_empty() { String::new() } else { format!("    {l}") })
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        let plain = parse(&text, &quiet()).unwrap();
        let quoted = parse(&indented, &quiet()).unwrap();
        let top = quoted.children(quoted.root());
        prop_assert_eq!(top.len(), 1);
        prop_assert!(quoted.is(top[0], Kind::BlockQuote));
        let inner: Vec<String> = quoted.children(top[0]).iter().map(|&c| pformat(&quoted, c)).collect();
        let outer: Vec<String> = plain.children(plain.root()).iter().map(|&c| pformat(&plain, c)).collect();
        prop_assert_eq!(inner, outer);
    }
}
