//! Section numbering and tables of contents, both scheduled by `pending`
//! nodes.

use crate::error::Result;
use crate::nodes::{Attributes, Document, Kind, NodeData, NodeId};

struct SectionNumbering {
    max_depth: usize,
    start: i64,
    prefix: String,
    suffix: String,
}

impl SectionNumbering {
    fn number(&self, doc: &mut Document, node: NodeId, parents: &[String], depth: usize) {
        let depth = depth + 1;
        let mut sectnum = if parents.is_empty() { self.start } else { 1 };
        for child in doc.children(node).to_vec() {
            if !doc.is(child, Kind::Section) {
                continue;
            }
            let mut numbers = parents.to_vec();
            numbers.push(sectnum.to_string());
            if let Some(&title) = doc.children(child).first() {
                let text = format!(
                    "{}{}{}{}",
                    self.prefix,
                    numbers.join("."),
                    self.suffix,
                    "\u{a0}".repeat(3)
                );
                let generated = doc.new_text_element(Kind::Generated, "", &text);
                doc.push_attr(generated, "classes", "sectnum");
                doc.insert(title, 0, generated);
                doc.set_attr(title, "auto", 1_i64);
            }
            if depth < self.max_depth {
                self.number(doc, child, &numbers, depth);
            }
            sectnum += 1;
        }
    }
}

/// Prefix every section title with its number.
pub(crate) fn sectnum(doc: &mut Document, pending: NodeId, details: &Attributes) -> Result<()> {
    doc.detach(pending);
    if !doc.settings.sectnum_xform {
        return Ok(());
    }
    let numbering = SectionNumbering {
        max_depth: details
            .get_int("depth")
            .and_then(|d| usize::try_from(d).ok())
            .unwrap_or(usize::MAX),
        start: details.get_int("start").unwrap_or(1),
        prefix: details.get_str("prefix").unwrap_or_default().to_string(),
        suffix: details.get_str("suffix").unwrap_or_default().to_string(),
    };
    let root = doc.root();
    numbering.number(doc, root, &[], 0);
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Backlinks {
    Entry,
    Top,
    None,
}

struct TableOfContents<'a> {
    depth: usize,
    backlinks: Backlinks,
    toc_id: &'a str,
}

impl TableOfContents<'_> {
    fn build(&self, doc: &mut Document, node: NodeId, level: usize) -> Result<Option<NodeId>> {
        let level = level + 1;
        let sections: Vec<NodeId> = doc
            .children(node)
            .iter()
            .copied()
            .filter(|&c| doc.is(c, Kind::Section))
            .collect();
        let mut entries = Vec::new();
        let mut auto = false;
        for section in sections {
            let Some(&title) = doc.children(section).first() else {
                continue;
            };
            auto = doc.has_attr(title, "auto");
            let text = filtered_copy(doc, title);
            let reference = doc.new_element(Kind::Reference);
            doc.extend(reference, text);
            if let Some(id) = doc.list(section, "ids").first().cloned() {
                doc.set_attr(reference, "refid", id);
            }
            let ref_id = doc.set_id(reference, None)?;
            let entry = doc.new_element_with(Kind::Paragraph, vec![reference]);
            let item = doc.new_element_with(Kind::ListItem, vec![entry]);

            let title_has_reference = doc
                .traverse(title)
                .into_iter()
                .skip(1)
                .any(|n| doc.is(n, Kind::Reference));
            if !title_has_reference {
                match self.backlinks {
                    Backlinks::Entry => doc.set_attr(title, "refid", ref_id),
                    Backlinks::Top => doc.set_attr(title, "refid", self.toc_id),
                    Backlinks::None => {}
                }
            }
            if level < self.depth
                && let Some(nested) = self.build(doc, section, level)?
            {
                doc.append(item, nested);
            }
            entries.push(item);
        }
        if entries.is_empty() {
            return Ok(None);
        }
        let list = doc.new_element_with(Kind::BulletList, entries);
        if auto {
            doc.push_attr(list, "classes", "auto-toc");
        }
        Ok(Some(list))
    }
}

/// A copy of the inline content of a title without footnote and citation
/// references; references, targets and problematic nodes are unwrapped and
/// images give their alt text.
fn filtered_copy(doc: &mut Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    for child in doc.children(node).to_vec() {
        let kind = match &doc.node(child).data {
            NodeData::Text(text) => {
                let text = text.clone();
                out.push(doc.new_text(text));
                continue;
            }
            NodeData::Element(element) => element.kind,
        };
        match kind {
            Kind::FootnoteReference | Kind::CitationReference => {}
            Kind::Image => {
                if let Some(alt) = doc.get_str(child, "alt").map(str::to_string) {
                    out.push(doc.new_text(alt));
                }
            }
            Kind::Problematic | Kind::Reference | Kind::Target => {
                out.extend(filtered_copy(doc, child));
            }
            _ => {
                let copy = doc.new_element(kind);
                if let Some(attrs) = doc.attrs(child).cloned() {
                    for (key, value) in attrs.iter() {
                        if key != "ids" && key != "names" {
                            doc.set_attr(copy, key, value.clone());
                        }
                    }
                }
                let inner = filtered_copy(doc, child);
                doc.extend(copy, inner);
                out.push(copy);
            }
        }
    }
    out
}

/// Replace the `pending` node inside a `contents` topic with a bullet
/// list of links to the sections, or drop the topic when there are none.
pub(crate) fn contents(doc: &mut Document, pending: NodeId, details: &Attributes) -> Result<()> {
    let Some(topic) = doc.parent(pending) else {
        return Ok(());
    };
    let start = if details.contains("local") {
        let mut node = doc.parent(topic).unwrap_or(doc.root());
        while !matches!(doc.kind(node), Some(Kind::Section | Kind::Document)) {
            match doc.parent(node) {
                Some(parent) => node = parent,
                None => break,
            }
        }
        node
    } else {
        doc.root()
    };
    let toc_id = doc.list(topic, "ids").first().cloned().unwrap_or_default();
    let backlinks = details
        .get_str("backlinks")
        .unwrap_or(doc.settings.toc_backlinks.as_str());
    let backlinks = match backlinks {
        "entry" => Backlinks::Entry,
        "top" => Backlinks::Top,
        _ => Backlinks::None,
    };
    let toc = TableOfContents {
        depth: details
            .get_int("depth")
            .and_then(|d| usize::try_from(d).ok())
            .unwrap_or(usize::MAX),
        backlinks,
        toc_id: &toc_id,
    };
    match toc.build(doc, start, 0)? {
        Some(list) => doc.replace_with(pending, vec![list]),
        None => doc.detach(topic),
    }
    Ok(())
}
