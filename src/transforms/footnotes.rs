//! Footnote numbering and footnote/citation reference resolution.

use super::Transform;
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId};

/// Labels for `[*]` footnotes, cycled and then doubled, tripled, ...
const SYMBOLS: [&str; 10] = [
    "*", "\u{2020}", "\u{2021}", "\u{a7}", "\u{b6}", "#", "\u{2660}", "\u{2665}", "\u{2666}",
    "\u{2663}",
];

/// Number `[#]` footnotes, give `[*]` footnotes symbols, and link every
/// footnote and citation reference to its note.
pub struct Footnotes;

impl Transform for Footnotes {
    fn name(&self) -> &'static str {
        "Footnotes"
    }

    fn priority(&self) -> u16 {
        620
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let startnum = doc.autofootnote_start;
        let mut labels = Vec::new();
        doc.autofootnote_start = number_footnotes(doc, startnum, &mut labels)?;
        number_footnote_references(doc, &labels)?;
        symbolize_footnotes(doc)?;
        resolve_footnotes_and_citations(doc);
        Ok(())
    }
}

fn first_id(doc: &Document, node: NodeId) -> Option<String> {
    doc.list(node, "ids").first().cloned()
}

fn insert_label(doc: &mut Document, note: NodeId, text: &str) {
    let label = doc.new_text_element(Kind::Label, "", text);
    doc.insert(note, 0, label);
}

/// Link `reference` to `note`: text, `refid` and a backref on the note.
fn link(doc: &mut Document, reference: NodeId, note: NodeId, text: &str) {
    let text = doc.new_text(text);
    doc.append(reference, text);
    if let Some(id) = first_id(doc, note) {
        doc.set_attr(reference, "refid", id);
        doc.note_refid(reference);
    }
    if let Some(refid) = first_id(doc, reference) {
        doc.push_attr(note, "backrefs", refid);
    }
    doc.resolved.insert(reference);
}

/// Label every auto-numbered footnote with the next number not already
/// taken as a name. Returns the next free number.
fn number_footnotes(doc: &mut Document, mut startnum: usize, labels: &mut Vec<String>) -> Result<usize> {
    for footnote in doc.autofootnotes.clone() {
        let label = loop {
            let label = startnum.to_string();
            startnum += 1;
            if !doc.nameids.contains_key(&label) {
                break label;
            }
        };
        insert_label(doc, footnote, &label);
        for name in doc.list(footnote, "names").to_vec() {
            for reference in doc.footnote_refs.get(&name).cloned().unwrap_or_default() {
                doc.remove_attr(reference, "refname");
                link(doc, reference, footnote, &label);
            }
        }
        if doc.list(footnote, "names").is_empty() && doc.list(footnote, "dupnames").is_empty() {
            doc.push_attr(footnote, "names", label.as_str());
            doc.note_explicit_target(footnote, Some(footnote))?;
            labels.push(label);
        }
    }
    Ok(startnum)
}

/// Pair the anonymous `[#]_` references with the unnamed auto-numbered
/// footnotes, in order.
fn number_footnote_references(doc: &mut Document, labels: &[String]) -> Result<()> {
    let refs = doc.autofootnote_refs.clone();
    let mut next = 0;
    for (position, &reference) in refs.iter().enumerate() {
        if doc.resolved.contains(&reference) || doc.has_attr(reference, "refid") {
            continue;
        }
        let Some(label) = labels.get(next) else {
            let msg = doc
                .error(format!(
                    "Too many autonumbered footnote references: only {} \
                     corresponding footnotes available.",
                    labels.len()
                ))
                .base_node(reference)
                .emit()?;
            for &extra in &refs[position..] {
                if doc.resolved.contains(&extra) || doc.has_attr(extra, "refname") {
                    continue;
                }
                super::replace_with_problematic(doc, extra, msg)?;
            }
            break;
        };
        let footnote = doc
            .nameids
            .get(label)
            .cloned()
            .flatten()
            .and_then(|id| doc.ids.get(&id).copied());
        if let Some(footnote) = footnote {
            if !doc.has_attr(reference, "refname") {
                doc.set_attr(reference, "refname", label.as_str());
            }
            link(doc, reference, footnote, label);
        }
        next += 1;
    }
    Ok(())
}

fn symbolize_footnotes(doc: &mut Document) -> Result<()> {
    let mut labels = Vec::new();
    for footnote in doc.symbol_footnotes.clone() {
        let reps = doc.symbol_footnote_start / SYMBOLS.len();
        let index = doc.symbol_footnote_start % SYMBOLS.len();
        let label = SYMBOLS[index].repeat(reps + 1);
        insert_label(doc, footnote, &label);
        labels.push(label);
        doc.symbol_footnote_start += 1;
        doc.set_id(footnote, None)?;
    }

    let refs = doc.symbol_footnote_refs.clone();
    let notes = doc.symbol_footnotes.clone();
    for (position, &reference) in refs.iter().enumerate() {
        let (Some(label), Some(&footnote)) = (labels.get(position), notes.get(position)) else {
            let msg = doc
                .error(format!(
                    "Too many symbol footnote references: only {} \
                     corresponding footnotes available.",
                    labels.len()
                ))
                .base_node(reference)
                .emit()?;
            for &extra in &refs[position..] {
                if doc.resolved.contains(&extra) || doc.has_attr(extra, "refid") {
                    continue;
                }
                super::replace_with_problematic(doc, extra, msg)?;
            }
            break;
        };
        link(doc, reference, footnote, label);
    }
    Ok(())
}

fn resolve_footnotes_and_citations(doc: &mut Document) {
    let notes: Vec<(NodeId, bool)> = doc
        .footnotes
        .iter()
        .map(|&n| (n, true))
        .chain(doc.citations.iter().map(|&n| (n, false)))
        .collect();
    for (note, is_footnote) in notes {
        let Some(id) = first_id(doc, note) else {
            continue;
        };
        for name in doc.list(note, "names").to_vec() {
            let refs = if is_footnote {
                doc.footnote_refs.get(&name)
            } else {
                doc.citation_refs.get(&name)
            };
            for reference in refs.cloned().unwrap_or_default() {
                if !doc.resolved.insert(reference) {
                    continue;
                }
                doc.remove_attr(reference, "refname");
                doc.set_attr(reference, "refid", id.as_str());
                if let Some(refid) = first_id(doc, reference) {
                    doc.push_attr(note, "backrefs", refid);
                }
            }
        }
        doc.resolved.insert(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transforms::{Pipeline, transform};
    use crate::writers::pseudoxml::pformat;
    use similar_asserts::assert_eq;

    fn numbered(text: &str) -> Document {
        let settings = Settings::builder().warning_stream("-").build();
        let mut doc = crate::parser::parse(text, &settings).unwrap();
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Footnotes));
        transform(&mut doc, &pipeline).unwrap();
        doc
    }

    #[test]
    fn unmatched_label_keeps_its_refname() {
        let doc = numbered("[#x]_\n\n.. [#] a\n");
        let reference = doc.find_all(doc.root(), Kind::FootnoteReference)[0];
        let footnote = doc.find_all(doc.root(), Kind::Footnote)[0];
        assert_eq!(doc.get_str(reference, "refname"), Some("x"));
        assert_eq!(
            doc.get_str(reference, "refid"),
            doc.list(footnote, "ids").first().map(String::as_str)
        );
        assert_eq!(doc.astext(reference), "1");
    }

    #[test]
    fn surplus_reference_message_has_reference_line() {
        let doc = numbered("[#]_ [#]_\n\n.. [#] a\n");
        let msg = doc
            .transform_messages
            .iter()
            .copied()
            .find(|&m| doc.astext(m).contains("Too many autonumbered footnote references"))
            .unwrap();
        assert_eq!(doc.get_int(msg, "line"), Some(1));
    }

    #[test]
    fn auto_numbered_footnote() {
        let doc = numbered("[#]_\n\n.. [#] foo\n");
        assert_eq!(
            pformat(&doc, doc.root()),
            "<document source=\"<string>\">
    <paragraph>
        <footnote_reference auto=\"1\" ids=\"id1\" refid=\"id2\" refname=\"1\">
            1
    <footnote auto=\"1\" backrefs=\"id1\" ids=\"id2\" names=\"1\">
        <label>
            1
        <paragraph>
            foo
"
        );
    }

    #[test]
    fn numbers_skip_taken_names() {
        let doc = numbered("[1]_ [#]_\n\n.. [1] manual\n.. [#] auto\n");
        let labels: Vec<String> = doc
            .find_all(doc.root(), Kind::Label)
            .into_iter()
            .map(|l| doc.astext(l))
            .collect();
        assert_eq!(labels, ["1", "2"]);
        let refs = doc.find_all(doc.root(), Kind::FootnoteReference);
        assert_eq!(doc.astext(refs[1]), "2");
    }

    #[test]
    fn labeled_auto_footnote_references_by_name() {
        let doc = numbered("[#note]_ and [#note]_\n\n.. [#note] text\n");
        let footnote = doc.find_all(doc.root(), Kind::Footnote)[0];
        let refs = doc.find_all(doc.root(), Kind::FootnoteReference);
        for &reference in &refs {
            assert_eq!(doc.astext(reference), "1");
            assert_eq!(doc.get_str(reference, "refid"), Some("note"));
            assert!(!doc.has_attr(reference, "refname"));
        }
        assert_eq!(doc.list(footnote, "backrefs").len(), 2);
    }

    #[test]
    fn symbols_cycle() {
        let doc = numbered("[*]_ [*]_\n\n.. [*] one\n.. [*] two\n");
        let refs = doc.find_all(doc.root(), Kind::FootnoteReference);
        assert_eq!(doc.astext(refs[0]), "*");
        assert_eq!(doc.astext(refs[1]), "\u{2020}");
    }

    #[test]
    fn too_many_references() {
        let doc = numbered("[#]_ [#]_\n\n.. [#] only\n");
        assert_eq!(doc.find_all(doc.root(), Kind::Problematic).len(), 1);
        assert!(
            doc.astext(doc.transform_messages[0])
                .contains("only 1 corresponding footnotes available")
        );
    }

    #[test]
    fn manual_footnotes_and_citations_resolve() {
        let doc = numbered("[1]_ [CIT]_\n\n.. [1] one\n.. [CIT] cited\n");
        let footnote_ref = doc.find_all(doc.root(), Kind::FootnoteReference)[0];
        let citation_ref = doc.find_all(doc.root(), Kind::CitationReference)[0];
        assert_eq!(doc.get_str(footnote_ref, "refid"), Some("id3"));
        assert_eq!(doc.get_str(citation_ref, "refid"), Some("cit"));
        assert!(!doc.has_attr(citation_ref, "refname"));
    }
}
