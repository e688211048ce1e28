//! Front matter: document title and subtitle promotion, section subtitles
//! and the bibliographic field list.

use std::sync::LazyLock;

use regex::Regex;

use super::Transform;
use crate::error::Result;
use crate::languages::{self, AUTHOR_SEPARATORS};
use crate::nodes::{AttrValue, Document, Kind, NodeId, fully_normalize_name, make_id};

/// The lone top-level section after any pre-bibliographic elements, with
/// its index.
fn candidate_index(doc: &Document, node: NodeId) -> Option<(NodeId, usize)> {
    let children = doc.children(node);
    let index = children
        .iter()
        .position(|&c| !doc.kind(c).is_some_and(Kind::is_prebibliographic))?;
    if children.len() > index + 1 || !doc.is(children[index], Kind::Section) {
        return None;
    }
    Some((children[index], index))
}

/// Merge the attributes of `from` into `into`. List values are appended
/// without repeats; other values are replaced.
fn merge_attributes(doc: &mut Document, into: NodeId, from: NodeId) {
    let Some(attrs) = doc.attrs(from).cloned() else {
        return;
    };
    for (key, value) in attrs.iter() {
        match value {
            AttrValue::List(items) => {
                for item in items {
                    if !doc.list(into, key).contains(item) {
                        doc.push_attr(into, key, item.as_str());
                    }
                }
            }
            other => doc.set_attr(into, key, other.clone()),
        }
    }
}

/// Ids of `from` now belong to `to`.
fn move_ids(doc: &mut Document, from: NodeId, to: NodeId) {
    for id in doc.list(from, "ids").to_vec() {
        doc.ids.insert(id, to);
    }
}

fn promote_title(doc: &mut Document, node: NodeId) -> bool {
    let Some((section, index)) = candidate_index(doc, node) else {
        return false;
    };
    log::debug!("Promoting section title to document title");
    merge_attributes(doc, node, section);
    move_ids(doc, section, node);
    let mut section_children = doc.take_children(section).into_iter();
    let before: Vec<NodeId> = doc.take_children(node).into_iter().take(index).collect();
    if let Some(title) = section_children.next() {
        doc.append(node, title);
    }
    doc.extend(node, before);
    doc.extend(node, section_children);
    true
}

fn promote_subtitle(doc: &mut Document, node: NodeId) -> bool {
    let Some((subsection, index)) = candidate_index(doc, node) else {
        return false;
    };
    let subtitle = doc.new_element(Kind::Subtitle);
    merge_attributes(doc, subtitle, subsection);
    move_ids(doc, subsection, subtitle);
    let mut section_children = doc.take_children(subsection).into_iter();
    if let Some(title) = section_children.next() {
        let words = doc.take_children(title);
        doc.extend(subtitle, words);
        if let Some(line) = doc.line(title) {
            doc.set_line(subtitle, line);
        }
    }
    let mut children = doc.take_children(node);
    children.truncate(index);
    let rest = children.split_off(children.len().min(1));
    doc.extend(node, children);
    doc.append(node, subtitle);
    doc.extend(node, rest);
    doc.extend(node, section_children);
    true
}

/// Promote a lone top-level section title to the document title and a
/// lone second-level section title to its subtitle.
pub struct DocTitle;

impl Transform for DocTitle {
    fn name(&self) -> &'static str {
        "DocTitle"
    }

    fn priority(&self) -> u16 {
        320
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let root = doc.root();
        if doc.settings.doctitle_xform && promote_title(doc, root) {
            promote_subtitle(doc, root);
        }
        if !doc.has_attr(root, "title")
            && let Some(&first) = doc.children(root).first()
            && doc.is(first, Kind::Title)
        {
            let title = doc.astext(first);
            doc.set_attr(root, "title", title);
        }
        Ok(())
    }
}

/// With `sectsubtitle_xform`, a lone subsection title becomes the subtitle
/// of its section.
pub struct SectionSubTitle;

impl Transform for SectionSubTitle {
    fn name(&self) -> &'static str {
        "SectionSubTitle"
    }

    fn priority(&self) -> u16 {
        350
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        if !doc.settings.sectsubtitle_xform {
            return Ok(());
        }
        for section in doc.find_all(doc.root(), Kind::Section) {
            if doc.is_attached(section) {
                promote_subtitle(doc, section);
            }
        }
        Ok(())
    }
}

static RCS_KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\$Date: (\d\d\d\d)[-/](\d\d)[-/](\d\d)[ T][\d:]+[^$]* \$")
                .expect("valid RCS date regex"),
            "${1}-${2}-${3}",
        ),
        (
            Regex::new(r"(?i)\$RCSfile: (.+),v \$").expect("valid RCS file regex"),
            "${1}",
        ),
        (
            Regex::new(r"\$[a-zA-Z]+: (.+) \$").expect("valid RCS keyword regex"),
            "${1}",
        ),
    ]
});

/// Strip RCS keyword markup (`$Date: ... $`) from a single-text paragraph.
fn clean_rcs_keywords(doc: &mut Document, paragraph: NodeId) {
    let [only] = doc.children(paragraph) else {
        return;
    };
    let only = *only;
    let Some(text) = doc.text_value(only) else {
        return;
    };
    let mut cleaned = text.to_string();
    for (pattern, replacement) in RCS_KEYWORDS.iter() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }
    if cleaned != text {
        let node = doc.new_text(cleaned);
        doc.replace_with(only, vec![node]);
    }
}

fn biblio_kind(canonical: &str) -> Kind {
    match canonical {
        "author" => Kind::Author,
        "authors" => Kind::Authors,
        "organization" => Kind::Organization,
        "address" => Kind::Address,
        "contact" => Kind::Contact,
        "version" => Kind::Version,
        "revision" => Kind::Revision,
        "status" => Kind::Status,
        "date" => Kind::Date,
        "copyright" => Kind::Copyright,
        _ => Kind::Topic,
    }
}

/// Turn a leading field list of bibliographic fields into `docinfo`, plus
/// `dedication` and `abstract` topics.
pub struct DocInfo;

impl Transform for DocInfo {
    fn name(&self) -> &'static str {
        "DocInfo"
    }

    fn priority(&self) -> u16 {
        340
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        if !doc.settings.docinfo_xform {
            return Ok(());
        }
        let root = doc.root();
        let children = doc.children(root).to_vec();
        let Some(&candidate) = children
            .iter()
            .find(|&&c| !doc.kind(c).is_some_and(Kind::is_prebibliographic))
        else {
            return Ok(());
        };
        if !doc.is(candidate, Kind::FieldList) {
            return Ok(());
        }
        let biblioindex = children
            .iter()
            .position(|&c| {
                !matches!(
                    doc.kind(c),
                    Some(Kind::Title | Kind::Subtitle | Kind::Rubric | Kind::Decoration)
                )
            })
            .unwrap_or(children.len());
        let nodes = Bibliography::default().extract(doc, candidate)?;
        doc.detach(candidate);
        for (offset, node) in nodes.into_iter().enumerate() {
            doc.insert(root, biblioindex + offset, node);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Bibliography {
    dedication: Option<NodeId>,
    r#abstract: Option<NodeId>,
}

impl Bibliography {
    fn extract(mut self, doc: &mut Document, field_list: NodeId) -> Result<Vec<NodeId>> {
        let docinfo = doc.new_element(Kind::Docinfo);
        if let Some(line) = doc.line(field_list) {
            doc.set_line(docinfo, line);
        }
        for field in doc.children(field_list).to_vec() {
            if self.extract_field(doc, field, docinfo)? {
                continue;
            }
            let children = doc.children(field).to_vec();
            if let Some(&body) = children.last()
                && let [paragraph] = doc.children(body)
                && doc.is(*paragraph, Kind::Paragraph)
            {
                let paragraph = *paragraph;
                clean_rcs_keywords(doc, paragraph);
            }
            let name = children.first().map(|&n| doc.astext(n)).unwrap_or_default();
            let class = make_id(&fully_normalize_name(&name));
            if !class.is_empty() {
                doc.push_attr(field, "classes", class);
            }
            doc.append(docinfo, field);
        }

        let mut nodes = Vec::new();
        if !doc.children(docinfo).is_empty() {
            nodes.push(docinfo);
        }
        nodes.extend(self.dedication);
        nodes.extend(self.r#abstract);
        Ok(nodes)
    }

    /// Move `field` into `docinfo` (or a topic) as a typed element. False
    /// leaves the field to be kept as is.
    fn extract_field(&mut self, doc: &mut Document, field: NodeId, docinfo: NodeId) -> Result<bool> {
        let children = doc.children(field).to_vec();
        let [field_name, body] = children[..] else {
            return Ok(false);
        };
        let name = doc.astext(field_name);
        let Some(canonical) = languages::bibliographic_field(&fully_normalize_name(&name)) else {
            return Ok(false);
        };
        if doc.children(body).is_empty() {
            let msg = doc
                .warning(format!("Cannot extract empty bibliographic field \"{name}\"."))
                .base_node(field)
                .emit()?;
            doc.append(body, msg);
            return Ok(false);
        }

        match biblio_kind(canonical) {
            Kind::Authors => self.extract_authors(doc, field, body, &name, docinfo),
            Kind::Topic => {
                let slot = if canonical == "dedication" {
                    &mut self.dedication
                } else {
                    &mut self.r#abstract
                };
                if slot.is_some() {
                    let msg = doc
                        .warning(format!("There can only be one \"{name}\" field."))
                        .base_node(field)
                        .emit()?;
                    doc.append(body, msg);
                    return Ok(false);
                }
                let label = languages::label(canonical);
                let title = doc.new_text_element(Kind::Title, &name, label);
                let topic = doc.new_element(Kind::Topic);
                doc.push_attr(topic, "classes", canonical);
                doc.append(topic, title);
                let content = doc.take_children(body);
                doc.extend(topic, content);
                *slot = Some(topic);
                Ok(true)
            }
            kind => {
                if !check_single_paragraph(doc, field, body, &name)? {
                    return Ok(false);
                }
                let paragraph = doc.children(body)[0];
                clean_rcs_keywords(doc, paragraph);
                let node = doc.new_element(kind);
                if let Some(line) = doc.line(field) {
                    doc.set_line(node, line);
                }
                let words = doc.take_children(paragraph);
                doc.extend(node, words);
                doc.append(docinfo, node);
                Ok(true)
            }
        }
    }

    fn extract_authors(
        &mut self,
        doc: &mut Document,
        field: NodeId,
        body: NodeId,
        name: &str,
        docinfo: NodeId,
    ) -> Result<bool> {
        let content = doc.children(body).to_vec();
        let authors = match content[..] {
            [single] if doc.is(single, Kind::Paragraph) => authors_from_one_paragraph(doc, body),
            [single] if doc.is(single, Kind::BulletList) => authors_from_bullet_list(doc, single),
            [_] => None,
            _ => authors_from_paragraphs(doc, body),
        };
        let authors: Vec<Vec<NodeId>> = authors
            .unwrap_or_default()
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            let separators: String = AUTHOR_SEPARATORS.iter().collect();
            let msg = doc
                .warning(format!(
                    "Cannot extract \"{name}\" from bibliographic field:\n\
                     Bibliographic field \"{name}\" must contain either\n \
                     a single paragraph (with author names separated by one of \"{separators}\"),\n \
                     multiple paragraphs (one per author),\n \
                     or a bullet list with one author name per item.\n\
                     Note: Leading initials can cause (mis)recognizing names as enumerated list."
                ))
                .base_node(field)
                .emit()?;
            doc.append(body, msg);
            return Ok(false);
        }
        let group = doc.new_element(Kind::Authors);
        for words in authors {
            let author = doc.new_element(Kind::Author);
            doc.extend(author, words);
            doc.append(group, author);
        }
        doc.append(docinfo, group);
        Ok(true)
    }
}

fn check_single_paragraph(doc: &mut Document, field: NodeId, body: NodeId, name: &str) -> Result<bool> {
    let content = doc.children(body).to_vec();
    if let [single] = content[..]
        && doc.is(single, Kind::Paragraph)
    {
        return Ok(true);
    }
    let tags: Vec<String> = content
        .iter()
        .filter_map(|&c| doc.kind(c))
        .map(|k| format!("<{}>", k.tag()))
        .collect();
    let found = if tags.len() > 1 {
        format!("[{}]", tags.join(", "))
    } else {
        format!("a {}", tags.concat())
    };
    let msg = doc
        .warning(format!(
            "Bibliographic field \"{name}\"\nmust contain a single <paragraph>, not {found}."
        ))
        .base_node(field)
        .emit()?;
    doc.append(body, msg);
    Ok(false)
}

/// Split the text of a paragraph at the first separator that occurs
/// unescaped.
fn authors_from_one_paragraph(doc: &mut Document, body: NodeId) -> Option<Vec<Vec<NodeId>>> {
    let text: String = doc
        .traverse(body)
        .into_iter()
        .filter_map(|n| doc.text_value(n))
        .collect();
    if text.is_empty() {
        return None;
    }
    let mut names = vec![text.clone()];
    for &separator in AUTHOR_SEPARATORS {
        let parts = split_unescaped(&text, separator);
        if parts.len() > 1 {
            names = parts;
            break;
        }
    }
    Some(
        names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| vec![doc.new_text(n)])
            .collect(),
    )
}

fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut previous = None;
    for c in text.chars() {
        if c == separator && previous != Some('\0') {
            parts.push(String::new());
        } else if let Some(last) = parts.last_mut() {
            last.push(c);
        }
        previous = Some(c);
    }
    parts
}

fn authors_from_bullet_list(doc: &mut Document, list: NodeId) -> Option<Vec<Vec<NodeId>>> {
    let mut paragraphs = Vec::new();
    for item in doc.children(list).to_vec() {
        if doc.is(item, Kind::Comment) {
            continue;
        }
        match doc.children(item) {
            [paragraph] if doc.is(*paragraph, Kind::Paragraph) => paragraphs.push(*paragraph),
            _ => return None,
        }
    }
    if paragraphs.is_empty() {
        return None;
    }
    Some(paragraphs.into_iter().map(|p| doc.take_children(p)).collect())
}

fn authors_from_paragraphs(doc: &mut Document, body: NodeId) -> Option<Vec<Vec<NodeId>>> {
    let content = doc.children(body).to_vec();
    if content
        .iter()
        .any(|&c| !matches!(doc.kind(c), Some(Kind::Paragraph | Kind::Comment)))
    {
        return None;
    }
    let paragraphs: Vec<NodeId> = content
        .into_iter()
        .filter(|&c| doc.is(c, Kind::Paragraph))
        .collect();
    Some(paragraphs.into_iter().map(|p| doc.take_children(p)).collect())
}
