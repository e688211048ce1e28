//! Replace `|name|` references with copies of their definitions.

use std::collections::{HashMap, HashSet};

use super::{Transform, replace_with_problematic};
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId};

pub struct Substitutions;

impl Transform for Substitutions {
    fn name(&self) -> &'static str {
        "Substitutions"
    }

    fn priority(&self) -> u16 {
        220
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let mut refs = doc.find_all(doc.root(), Kind::SubstitutionReference);
        // Definition name → definitions it was reached from.
        let mut nested: HashMap<String, HashSet<String>> = HashMap::new();
        // Reference copied out of a definition → the reference that pulled it in.
        let mut origin: HashMap<NodeId, NodeId> = HashMap::new();

        let mut index = 0;
        while index < refs.len() {
            let subref = refs[index];
            index += 1;
            if !doc.is_attached(subref) {
                continue;
            }
            let refname = doc.get_str(subref, "refname").unwrap_or_default().to_string();
            let Some(key) = definition_key(doc, &refname) else {
                let msg = doc
                    .error(format!("Undefined substitution referenced: \"{refname}\"."))
                    .base_node(subref)
                    .category("reference")
                    .emit()?;
                replace_with_problematic(doc, subref, msg)?;
                continue;
            };
            let Some(&subdef) = doc.substitution_defs.get(&key) else {
                continue;
            };

            trim_neighbours(doc, subref, subdef);
            let copy = doc.deep_copy(subdef);
            let mut circular = false;
            let mut found = Vec::new();
            for nested_ref in doc.find_all(copy, Kind::SubstitutionReference) {
                let nested_name = doc
                    .get_str(nested_ref, "refname")
                    .and_then(|name| definition_key(doc, name));
                let Some(nested_name) = nested_name else {
                    found.push(nested_ref);
                    continue;
                };
                let seen = nested.entry(nested_name.clone()).or_default();
                if seen.contains(&nested_name) {
                    circular = true;
                    break;
                }
                seen.insert(key.clone());
                origin.insert(nested_ref, subref);
                found.push(nested_ref);
            }

            if circular {
                report_circular(doc, subref, &refname, &origin)?;
                continue;
            }
            refs.extend(found);
            let children = doc.take_children(copy);
            for &child in &children {
                if doc.kind(child).is_some_and(Kind::is_resolvable) {
                    doc.note_refname(child);
                }
            }
            let parent = doc.parent(subref);
            doc.replace_with(subref, children);
            if let Some(parent) = parent {
                doc.normalize_text(parent);
            }
        }
        Ok(())
    }
}

/// The definition name `refname` resolves to: exact, else case-insensitive.
fn definition_key(doc: &Document, refname: &str) -> Option<String> {
    if doc.substitution_defs.contains_key(refname) {
        return Some(refname.to_string());
    }
    doc.substitution_names.get(&refname.to_lowercase()).cloned()
}

/// Apply the `ltrim`/`rtrim`/`trim` options of `subdef` to the text around
/// `subref`.
fn trim_neighbours(doc: &mut Document, subref: NodeId, subdef: NodeId) {
    let trim = doc.has_attr(subdef, "trim");
    if (trim || doc.has_attr(subdef, "ltrim"))
        && let Some(before) = doc.previous_sibling(subref)
        && let Some(text) = doc.text_value(before)
    {
        let text = text.trim_end().to_string();
        let trimmed = doc.new_text(&text);
        doc.replace_with(before, vec![trimmed]);
    }
    if (trim || doc.has_attr(subdef, "rtrim"))
        && let Some(after) = doc.next_sibling(subref)
        && let Some(text) = doc.text_value(after)
    {
        let text = text.trim_start().to_string();
        let trimmed = doc.new_text(&text);
        doc.replace_with(after, vec![trimmed]);
    }
}

fn report_circular(
    doc: &mut Document,
    subref: NodeId,
    refname: &str,
    origin: &HashMap<NodeId, NodeId>,
) -> Result<()> {
    let parent = doc.parent(subref);
    if let Some(definition) = parent.filter(|&p| doc.is(p, Kind::SubstitutionDefinition)) {
        let raw = doc.rawsource(definition).to_string();
        let literal = doc.new_text_element(Kind::LiteralBlock, &raw, &raw);
        let msg = doc
            .error("Circular substitution definition detected:")
            .child(literal)
            .base_node(definition)
            .category("reference")
            .emit()?;
        doc.replace_with(definition, vec![msg]);
        return Ok(());
    }
    let mut first = subref;
    while let Some(&earlier) = origin.get(&first) {
        first = earlier;
    }
    let msg = doc
        .error(format!("Circular substitution definition referenced: \"{refname}\"."))
        .base_node(first)
        .category("reference")
        .emit()?;
    replace_with_problematic(doc, subref, msg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transforms::{Pipeline, transform};
    use crate::writers::pseudoxml::pformat;
    use similar_asserts::assert_eq;

    fn substituted(text: &str) -> Document {
        let settings = Settings::builder().warning_stream("-").build();
        let mut doc = crate::parser::parse(text, &settings).unwrap();
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Substitutions));
        transform(&mut doc, &pipeline).unwrap();
        doc
    }

    #[test]
    fn replaces_reference_with_definition_children() {
        let doc = substituted("Use |name| here.\n\n.. |name| replace:: *the* thing\n");
        let para = doc.children(doc.root())[0];
        assert_eq!(
            pformat(&doc, para),
            "<paragraph>\n    Use \n    <emphasis>\n        the\n     thing here.\n"
        );
        assert!(doc.find_all(doc.root(), Kind::SubstitutionReference).is_empty());
    }

    #[test]
    fn expansion_merges_surrounding_text() {
        let doc = substituted("Some |beta| here.\n\n.. |beta| replace:: a\n");
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.children(para).len(), 1);
        assert_eq!(doc.text_value(doc.children(para)[0]), Some("Some a here."));
    }

    #[test]
    fn case_insensitive_fallback() {
        let doc = substituted("|NAME|\n\n.. |name| replace:: x\n");
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.astext(para), "x");
    }

    #[test]
    fn undefined_reference_becomes_problematic() {
        let doc = substituted("A |missing| ref.\n");
        let problematic = doc.find_all(doc.root(), Kind::Problematic);
        assert_eq!(problematic.len(), 1);
        assert_eq!(doc.astext(problematic[0]), "|missing|");
        let msg = doc.transform_messages[0];
        assert!(doc.astext(msg).contains("Undefined substitution referenced: \"missing\"."));
        let msgid = &doc.list(msg, "ids")[0];
        assert_eq!(doc.get_str(problematic[0], "refid"), Some(msgid.as_str()));
    }

    #[test]
    fn undefined_reference_message_has_paragraph_line() {
        let doc = substituted("Para one.\n\nPara two.\n\nUse |undef| too.\n\nEnd.\n");
        let msg = doc.transform_messages[0];
        assert_eq!(doc.get_int(msg, "line"), Some(5));
    }

    #[test]
    fn nested_definitions_expand() {
        let doc = substituted("|a|\n\n.. |a| replace:: A |b|\n.. |b| replace:: B\n");
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.astext(para), "A B");
    }

    #[test]
    fn circular_definitions_are_reported() {
        let doc = substituted("|a|\n\n.. |a| replace:: x |b|\n.. |b| replace:: y |a|\n");
        assert!(
            doc.transform_messages
                .iter()
                .any(|&m| doc.astext(m).contains("Circular substitution definition"))
        );
    }

    #[test]
    fn trim_options_strip_whitespace() {
        let doc = substituted("a |x| b\n\n.. |x| unicode:: U+2014\n   :trim:\n");
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.astext(para), "a\u{2014}b");
        assert_eq!(doc.children(para).len(), 1);
    }
}
