//! Hyperlink resolution.
//!
//! References start out carrying a `refname`. These transforms rewrite it
//! to a `refuri` (external targets) or a `refid` (internal targets), and
//! turn whatever cannot be resolved into `problematic` nodes.

use std::collections::{BTreeMap, HashSet};

use super::{Transform, replace_with_problematic};
use crate::error::Result;
use crate::nodes::{Attributes, Document, Kind, NodeId};

fn targets(doc: &Document) -> Vec<NodeId> {
    doc.find_all(doc.root(), Kind::Target)
}

/// Empty targets directly before a target with a link take over its link.
pub struct ChainedTargets;

impl Transform for ChainedTargets {
    fn name(&self) -> &'static str {
        "ChainedTargets"
    }

    fn priority(&self) -> u16 {
        420
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for target in targets(doc) {
            let Some(attname) = ["refuri", "refname", "refid"]
                .into_iter()
                .find(|a| doc.has_attr(target, a))
            else {
                continue;
            };
            let Some(value) = doc.get_attr(target, attname).cloned() else {
                continue;
            };
            let (Some(parent), Some(index)) = (doc.parent(target), doc.index_in_parent(target))
            else {
                continue;
            };
            for i in (0..index).rev() {
                let sibling = doc.children(parent)[i];
                if !doc.is(sibling, Kind::Target)
                    || ["refuri", "refname", "refid"].iter().any(|a| doc.has_attr(sibling, a))
                {
                    break;
                }
                doc.set_attr(sibling, attname, value.clone());
                match attname {
                    "refuri" => doc.note_external_target(sibling),
                    "refname" => doc.note_indirect_target(sibling),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Pair anonymous references with anonymous targets in document order.
pub struct AnonymousHyperlinks;

impl Transform for AnonymousHyperlinks {
    fn name(&self) -> &'static str {
        "AnonymousHyperlinks"
    }

    fn priority(&self) -> u16 {
        440
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let root = doc.root();
        let refs: Vec<NodeId> = doc
            .find_all(root, Kind::Reference)
            .into_iter()
            .filter(|&r| doc.has_attr(r, "anonymous"))
            .collect();
        let anonymous_targets: Vec<NodeId> = targets(doc)
            .into_iter()
            .filter(|&t| doc.has_attr(t, "anonymous"))
            .collect();

        if refs.len() != anonymous_targets.len() {
            let msg = doc
                .error(format!(
                    "Anonymous hyperlink mismatch: {} references but {} targets.\n\
                     See \"backrefs\" attribute for IDs.",
                    refs.len(),
                    anonymous_targets.len()
                ))
                .category("reference")
                .emit()?;
            for reference in refs {
                replace_with_problematic(doc, reference, msg)?;
            }
            return Ok(());
        }

        for (reference, target) in refs.into_iter().zip(anonymous_targets) {
            let name = format!("_:{}:_", doc.anonymous_start);
            doc.anonymous_start += 1;
            doc.push_attr(target, "names", name);
            doc.referenced.insert(target);

            let mut current = target;
            let mut seen = HashSet::new();
            while seen.insert(current) {
                if let Some(refuri) = doc.get_str(current, "refuri").map(str::to_string) {
                    doc.set_attr(reference, "refuri", refuri);
                    doc.resolved.insert(reference);
                    break;
                }
                match doc.list(current, "ids").first().cloned() {
                    Some(id) => {
                        doc.set_attr(reference, "refid", id);
                        doc.note_refid(reference);
                        break;
                    }
                    // A target whose ids were handed on: follow its refid.
                    None => {
                        let next = doc
                            .get_str(current, "refid")
                            .and_then(|id| doc.ids.get(id))
                            .copied();
                        match next {
                            Some(next) => current = next,
                            None => break,
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Resolve targets that point at other targets by name, then pass the
/// final link on to everything referring to them.
pub struct IndirectHyperlinks;

impl Transform for IndirectHyperlinks {
    fn name(&self) -> &'static str {
        "IndirectHyperlinks"
    }

    fn priority(&self) -> u16 {
        460
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for target in doc.indirect_targets.clone() {
            if !doc.resolved.contains(&target) {
                let mut in_progress = HashSet::new();
                resolve_indirect_target(doc, target, &mut in_progress)?;
            }
            resolve_indirect_references(doc, target, &mut HashSet::new());
        }
        Ok(())
    }
}

fn resolve_indirect_target(
    doc: &mut Document,
    target: NodeId,
    in_progress: &mut HashSet<NodeId>,
) -> Result<()> {
    let refname = doc.get_str(target, "refname").map(str::to_string);
    let reftarget_id = match &refname {
        None => doc.get_str(target, "refid").map(str::to_string),
        Some(name) => doc.nameids.get(name).cloned().flatten(),
    };
    let Some(reftarget_id) = reftarget_id else {
        return nonexistent_indirect_target(doc, target);
    };
    let Some(&reftarget) = doc.ids.get(&reftarget_id) else {
        return nonexistent_indirect_target(doc, target);
    };
    doc.referenced.insert(reftarget);

    if doc.is(reftarget, Kind::Target)
        && !doc.resolved.contains(&reftarget)
        && doc.has_attr(reftarget, "refname")
    {
        if !in_progress.insert(target) {
            return indirect_target_error(doc, target, "forming a circular reference");
        }
        resolve_indirect_target(doc, reftarget, in_progress)?;
        in_progress.remove(&target);
    }

    if let Some(refuri) = doc.get_str(reftarget, "refuri").map(str::to_string) {
        doc.set_attr(target, "refuri", refuri);
        doc.remove_attr(target, "refid");
    } else if let Some(refid) = doc.get_str(reftarget, "refid").map(str::to_string) {
        doc.set_attr(target, "refid", refid);
        doc.note_refid(target);
    } else if !doc.list(reftarget, "ids").is_empty() {
        doc.set_attr(target, "refid", reftarget_id);
        doc.note_refid(target);
    } else {
        return nonexistent_indirect_target(doc, target);
    }
    if refname.is_some() {
        doc.remove_attr(target, "refname");
    }
    doc.resolved.insert(target);
    Ok(())
}

fn nonexistent_indirect_target(doc: &mut Document, target: NodeId) -> Result<()> {
    let refname = doc.get_str(target, "refname").unwrap_or_default();
    let explanation = if doc.nameids.contains_key(refname) {
        "which is a duplicate, and cannot be used as a unique reference"
    } else {
        "which does not exist"
    };
    indirect_target_error(doc, target, explanation)
}

fn indirect_target_error(doc: &mut Document, target: NodeId, explanation: &str) -> Result<()> {
    let names = doc.list(target, "names").to_vec();
    let ids = doc.list(target, "ids").to_vec();
    let mut naming = names
        .first()
        .map(|n| format!("\"{n}\" "))
        .unwrap_or_default();
    if let Some(id) = ids.first() {
        naming.push_str(&format!("(id=\"{id}\")"));
    }
    let mut reflist: Vec<NodeId> = Vec::new();
    for name in &names {
        reflist.extend(doc.refnames.get(name).into_iter().flatten());
    }
    for id in &ids {
        reflist.extend(doc.refids.get(id).into_iter().flatten());
    }
    let refname = doc.get_str(target, "refname").unwrap_or_default().to_string();
    let msg = doc
        .error(format!(
            "Indirect hyperlink target {naming} refers to target \"{refname}\", {explanation}."
        ))
        .base_node(target)
        .category("reference")
        .emit()?;
    let mut seen = HashSet::new();
    for reference in reflist {
        if seen.insert(reference) {
            replace_with_problematic(doc, reference, msg)?;
        }
    }
    doc.resolved.insert(target);
    Ok(())
}

fn resolve_indirect_references(doc: &mut Document, target: NodeId, visited: &mut HashSet<NodeId>) {
    if !visited.insert(target) {
        return;
    }
    let (attname, value) = if let Some(refid) = doc.get_str(target, "refid") {
        ("refid", refid.to_string())
    } else if let Some(refuri) = doc.get_str(target, "refuri") {
        ("refuri", refuri.to_string())
    } else {
        return;
    };

    let mut refs = Vec::new();
    for name in doc.list(target, "names").to_vec() {
        let reflist = doc.refnames.get(&name).cloned().unwrap_or_default();
        if !reflist.is_empty() {
            doc.referenced.insert(target);
        }
        refs.extend(reflist.into_iter().map(|r| (r, true)));
    }
    for id in doc.list(target, "ids").to_vec() {
        let reflist = doc.refids.get(&id).cloned().unwrap_or_default();
        if !reflist.is_empty() {
            doc.referenced.insert(target);
        }
        refs.extend(reflist.into_iter().map(|r| (r, false)));
    }

    for (reference, by_name) in refs {
        if doc.resolved.contains(&reference) {
            continue;
        }
        if by_name {
            doc.remove_attr(reference, "refname");
        }
        doc.set_attr(reference, attname, value.as_str());
        if attname == "refid" {
            doc.note_refid(reference);
        }
        doc.resolved.insert(reference);
        if doc.is(reference, Kind::Target) {
            resolve_indirect_references(doc, reference, visited);
        }
    }
}

/// An empty block-level target hands its ids and names to the element
/// that follows it and keeps a `refid` pointing there.
pub struct PropagateTargets;

impl Transform for PropagateTargets {
    fn name(&self) -> &'static str {
        "PropagateTargets"
    }

    fn priority(&self) -> u16 {
        470
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for target in targets(doc) {
            let inline = doc
                .parent(target)
                .and_then(|p| doc.kind(p))
                .is_some_and(Kind::is_text_element);
            if inline
                || ["refid", "refuri", "refname"].iter().any(|a| doc.has_attr(target, a))
            {
                continue;
            }
            let mut next = doc.next_node_ascending(target);
            while let Some(node) = next
                && doc.is(node, Kind::SystemMessage)
            {
                next = doc.next_node_ascending(node);
            }
            let Some(next) = next else {
                continue;
            };
            let Some(kind) = doc.kind(next) else {
                continue;
            };
            if (kind.is_invisible() || kind.is_targetable()) && kind != Kind::Target {
                continue;
            }
            let ids = doc.list(target, "ids").to_vec();
            let names = doc.list(target, "names").to_vec();
            let Some(first) = ids.first().cloned() else {
                continue;
            };
            for id in &ids {
                doc.push_attr(next, "ids", id.as_str());
                doc.ids.insert(id.clone(), next);
            }
            for name in &names {
                doc.push_attr(next, "names", name.as_str());
            }
            if let Some(attrs) = doc.attrs_mut(target) {
                attrs.remove("ids");
                attrs.remove("names");
            }
            doc.set_attr(target, "refid", first);
            doc.note_refid(target);
        }
        Ok(())
    }
}

/// Footnotes listing the URLs of external targets, with a footnote
/// reference after every reference to them.
pub(crate) fn target_notes(doc: &mut Document, pending: NodeId, details: &Attributes) -> Result<()> {
    let classes = details.list("class").to_vec();
    let mut notes: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut footnotes = Vec::new();

    for target in targets(doc) {
        let Some(refuri) = doc.get_str(target, "refuri").map(str::to_string) else {
            continue;
        };
        let mut refs = Vec::new();
        for name in doc.list(target, "names") {
            refs.extend(doc.refnames.get(name).into_iter().flatten().copied());
        }
        if refs.is_empty() {
            continue;
        }
        let footnote = target_footnote(doc, &refuri, &refs, &mut notes, &classes)?;
        if let Some(footnote) = footnote {
            footnotes.push(footnote);
        }
    }
    for reference in doc.find_all(doc.root(), Kind::Reference) {
        if !doc.has_attr(reference, "anonymous") {
            continue;
        }
        let Some(refuri) = doc.get_str(reference, "refuri").map(str::to_string) else {
            continue;
        };
        let footnote = target_footnote(doc, &refuri, &[reference], &mut notes, &classes)?;
        if let Some(footnote) = footnote {
            footnotes.push(footnote);
        }
    }
    doc.replace_with(pending, footnotes);
    Ok(())
}

/// Add footnote references after `refs`, creating the footnote for
/// `refuri` on first use. Returns the footnote when it is new.
fn target_footnote(
    doc: &mut Document,
    refuri: &str,
    refs: &[NodeId],
    notes: &mut BTreeMap<String, NodeId>,
    classes: &[String],
) -> Result<Option<NodeId>> {
    let (footnote, name, created) = match notes.get(refuri) {
        Some(&footnote) => {
            let name = doc.list(footnote, "names").first().cloned().unwrap_or_default();
            (footnote, name, false)
        }
        None => {
            let footnote = doc.new_element(Kind::Footnote);
            let id = doc.set_id(footnote, None)?;
            // Upper case and a colon never come out of the parser's names.
            let name = format!("TARGET_NOTE: {id}");
            doc.set_attr(footnote, "auto", 1_i64);
            doc.push_attr(footnote, "names", name.as_str());
            let reference = doc.new_text_element(Kind::Reference, "", refuri);
            doc.set_attr(reference, "refuri", refuri);
            let paragraph = doc.new_element_with(Kind::Paragraph, vec![reference]);
            doc.append(footnote, paragraph);
            doc.note_autofootnote(footnote)?;
            doc.note_explicit_target(footnote, Some(footnote))?;
            notes.insert(refuri.to_string(), footnote);
            (footnote, name, true)
        }
    };

    for &reference in refs {
        if doc.is(reference, Kind::Target) {
            continue;
        }
        let (Some(parent), Some(index)) = (doc.parent(reference), doc.index_in_parent(reference))
        else {
            continue;
        };
        let refnode = doc.new_element(Kind::FootnoteReference);
        doc.set_attr(refnode, "auto", 1_i64);
        doc.set_attr(refnode, "refname", name.as_str());
        for class in classes {
            doc.push_attr(refnode, "classes", class.as_str());
        }
        doc.note_autofootnote_ref(refnode)?;
        doc.note_footnote_ref(refnode)?;
        let mut inserted = vec![refnode];
        if !doc.settings.trim_footnote_reference_space {
            let space = if classes.is_empty() {
                doc.new_text(" ")
            } else {
                let inline = doc.new_text_element(Kind::Inline, "", " ");
                for class in classes {
                    doc.push_attr(inline, "classes", class.as_str());
                }
                inline
            };
            inserted.insert(0, space);
        }
        for (offset, node) in inserted.into_iter().enumerate() {
            doc.insert(parent, index + 1 + offset, node);
        }
    }
    Ok(created.then_some(footnote))
}

/// References to targets with a URI get that URI.
pub struct ExternalTargets;

impl Transform for ExternalTargets {
    fn name(&self) -> &'static str {
        "ExternalTargets"
    }

    fn priority(&self) -> u16 {
        640
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for target in targets(doc) {
            let Some(refuri) = doc.get_str(target, "refuri").map(str::to_string) else {
                continue;
            };
            for name in doc.list(target, "names").to_vec() {
                let reflist = doc.refnames.get(&name).cloned().unwrap_or_default();
                if !reflist.is_empty() {
                    doc.referenced.insert(target);
                }
                for reference in reflist {
                    if doc.resolved.insert(reference) {
                        doc.remove_attr(reference, "refname");
                        doc.set_attr(reference, "refuri", refuri.as_str());
                    }
                }
            }
        }
        Ok(())
    }
}

/// References to plain internal targets get the target's id.
pub struct InternalTargets;

impl Transform for InternalTargets {
    fn name(&self) -> &'static str {
        "InternalTargets"
    }

    fn priority(&self) -> u16 {
        660
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for target in targets(doc) {
            if doc.has_attr(target, "refuri") || doc.has_attr(target, "refid") {
                continue;
            }
            for name in doc.list(target, "names").to_vec() {
                let refid = doc.nameids.get(&name).cloned().flatten();
                let reflist = doc.refnames.get(&name).cloned().unwrap_or_default();
                if !reflist.is_empty() {
                    doc.referenced.insert(target);
                }
                for reference in reflist {
                    if !doc.resolved.insert(reference) {
                        continue;
                    }
                    if let Some(refid) = &refid {
                        doc.remove_attr(reference, "refname");
                        doc.set_attr(reference, "refid", refid.as_str());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Resolve what is left by name, and report references to unknown or
/// duplicate names.
pub struct DanglingReferences;

impl Transform for DanglingReferences {
    fn name(&self) -> &'static str {
        "DanglingReferences"
    }

    fn priority(&self) -> u16 {
        850
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let root = doc.root();
        let references: Vec<NodeId> = doc
            .traverse(root)
            .into_iter()
            .filter(|&n| {
                matches!(
                    doc.kind(n),
                    Some(Kind::Reference | Kind::FootnoteReference | Kind::CitationReference)
                )
            })
            .collect();
        for reference in references {
            if doc.resolved.contains(&reference) {
                continue;
            }
            let Some(refname) = doc.get_str(reference, "refname").map(str::to_string) else {
                continue;
            };
            match doc.nameids.get(&refname).cloned() {
                Some(Some(id)) => {
                    doc.remove_attr(reference, "refname");
                    doc.set_attr(reference, "refid", id.as_str());
                    if let Some(&target) = doc.ids.get(&id) {
                        doc.referenced.insert(target);
                    }
                    doc.resolved.insert(reference);
                }
                known => {
                    let message = if known.is_some() {
                        format!(
                            "Duplicate target name, cannot be used as a unique reference: \"{refname}\"."
                        )
                    } else {
                        format!("Unknown target name: \"{refname}\".")
                    };
                    let msg = doc
                        .error(message)
                        .base_node(reference)
                        .category("reference")
                        .emit()?;
                    replace_with_problematic(doc, reference, msg)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transforms::footnotes::Footnotes;
    use crate::transforms::{Pipeline, transform};
    use crate::writers::pseudoxml::pformat;
    use similar_asserts::assert_eq;

    fn linked(text: &str) -> Document {
        let settings = Settings::builder().warning_stream("-").build();
        let mut doc = crate::parser::parse(text, &settings).unwrap();
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(ChainedTargets));
        pipeline.register(Box::new(AnonymousHyperlinks));
        pipeline.register(Box::new(IndirectHyperlinks));
        pipeline.register(Box::new(PropagateTargets));
        pipeline.register(Box::new(Footnotes));
        pipeline.register(Box::new(ExternalTargets));
        pipeline.register(Box::new(InternalTargets));
        pipeline.register(Box::new(DanglingReferences));
        transform(&mut doc, &pipeline).unwrap();
        doc
    }

    fn references(doc: &Document) -> Vec<NodeId> {
        doc.find_all(doc.root(), Kind::Reference)
    }

    #[test]
    fn anonymous_pairs_get_names() {
        let doc = linked("`X`__\n\n__ http://e\n");
        assert_eq!(
            pformat(&doc, doc.root()),
            "<document source=\"<string>\">
    <paragraph>
        <reference anonymous=\"1\" name=\"X\" refuri=\"http://e\">
            X
    <target anonymous=\"1\" ids=\"id1\" names=\"_:1:_\" refuri=\"http://e\">
"
        );
    }

    #[test]
    fn anonymous_mismatch_makes_problematic() {
        let doc = linked("`a`__ and `b`__\n\n__ http://one\n");
        let problematic = doc.find_all(doc.root(), Kind::Problematic);
        assert_eq!(problematic.len(), 2);
        let msg = doc.transform_messages[0];
        assert!(doc.astext(msg).starts_with("Anonymous hyperlink mismatch: 2 references but 1 targets."));
        assert_eq!(doc.list(msg, "backrefs").len(), 2);
    }

    #[test]
    fn chained_targets_share_uri() {
        let doc = linked("a_ b_\n\n.. _a:\n.. _b: http://x\n");
        for reference in references(&doc) {
            assert_eq!(doc.get_str(reference, "refuri"), Some("http://x"));
            assert!(!doc.has_attr(reference, "refname"));
        }
    }

    #[test]
    fn indirect_chain_resolves_to_uri() {
        let doc = linked("one_\n\n.. _one: two_\n.. _two: three_\n.. _three: http://end\n");
        let reference = references(&doc)[0];
        assert_eq!(doc.get_str(reference, "refuri"), Some("http://end"));
        assert!(!doc.has_attr(reference, "refname"));
    }

    #[test]
    fn circular_indirect_targets_are_reported() {
        let doc = linked("a_\n\n.. _a: b_\n.. _b: a_\n");
        assert!(
            doc.transform_messages
                .iter()
                .any(|&m| doc.astext(m).contains("forming a circular reference"))
        );
        assert!(!doc.find_all(doc.root(), Kind::Problematic).is_empty());
        assert!(references(&doc).is_empty());
    }

    #[test]
    fn internal_target_propagates_to_next_element() {
        let doc = linked("see target_\n\n.. _target:\n\nParagraph.\n");
        let children = doc.children(doc.root()).to_vec();
        let target = children[1];
        let paragraph = children[2];
        assert_eq!(doc.list(paragraph, "ids"), ["target"]);
        assert_eq!(doc.list(paragraph, "names"), ["target"]);
        assert_eq!(doc.get_str(target, "refid"), Some("target"));
        let reference = references(&doc)[0];
        assert_eq!(doc.get_str(reference, "refid"), Some("target"));
    }

    #[test]
    fn section_references_resolve_by_name() {
        let doc = linked("Intro\n=====\n\nSee `Intro`_.\n");
        let reference = references(&doc)[0];
        assert_eq!(doc.get_str(reference, "refid"), Some("intro"));
    }

    #[test]
    fn unknown_names_become_problematic() {
        let doc = linked("missing_\n");
        let problematic = doc.find_all(doc.root(), Kind::Problematic);
        assert_eq!(problematic.len(), 1);
        assert_eq!(doc.astext(problematic[0]), "missing_");
        assert!(doc.astext(doc.transform_messages[0]).contains("Unknown target name: \"missing\"."));
    }

    #[test]
    fn unknown_name_message_has_paragraph_line() {
        let doc = linked("Intro.\n\nSee missing_ here.\n\nPara three.\n\nEnd.\n");
        let msg = doc.transform_messages[0];
        assert!(doc.astext(msg).contains("Unknown target name: \"missing\"."));
        assert_eq!(doc.get_int(msg, "line"), Some(3));
    }

    #[test]
    fn target_notes_add_footnotes() {
        let doc = linked("site_\n\n.. _site: http://example.org\n\n.. target-notes::\n");
        let footnotes = doc.find_all(doc.root(), Kind::Footnote);
        assert_eq!(footnotes.len(), 1);
        assert_eq!(doc.list(footnotes[0], "names"), ["TARGET_NOTE: id1"]);
        let refs = doc.find_all(doc.root(), Kind::FootnoteReference);
        assert_eq!(refs.len(), 1);
        assert_eq!(doc.astext(refs[0]), "1");
        let paragraph = doc.children(doc.root())[0];
        assert_eq!(doc.astext(paragraph), "site 1");
    }
}
