//! Document parts: `contents`, `sectnum`, `header`, `footer` and
//! `target-notes`. Most of them only leave a `pending` node for a transform.

use super::options::{Conversion, OptionValue, Options};
use super::{Invocation, OptionSpec, Outcome};
use crate::languages;
use crate::nodes::{
    AttrValue, Attributes, Document, Kind, NodeId, PendingTransform, fully_normalize_name,
};
use crate::parser::block_parser::BlockParser;

pub(super) const CONTENTS_OPTIONS: OptionSpec = &[
    ("depth", Conversion::NonNegativeInt),
    ("local", Conversion::Flag),
    ("backlinks", Conversion::Choice(&["top", "entry", "none"])),
    ("class", Conversion::ClassList),
];

pub(super) const SECTNUM_OPTIONS: OptionSpec = &[
    ("depth", Conversion::Int),
    ("start", Conversion::Int),
    ("prefix", Conversion::Unchanged),
    ("suffix", Conversion::Unchanged),
];

/// Options as `pending` details; flags become empty strings.
pub(crate) fn option_details(options: &Options) -> Attributes {
    let mut details = Attributes::new();
    for (name, value) in options.iter() {
        let value = match value {
            OptionValue::Flag => AttrValue::Str(String::new()),
            OptionValue::Text(text) => AttrValue::Str(text.clone()),
            OptionValue::Int(n) => AttrValue::Int(*n),
            OptionValue::Ints(items) => {
                AttrValue::List(items.iter().map(usize::to_string).collect())
            }
            OptionValue::Classes(items) => AttrValue::List(items.clone()),
        };
        details.set(name, value);
    }
    details
}

/// The document's `header` or `footer`, created on first use inside a
/// `decoration` placed after the leading titles.
pub(crate) fn decoration_part(doc: &mut Document, kind: Kind) -> NodeId {
    let root = doc.root();
    let decoration = match doc
        .children(root)
        .iter()
        .copied()
        .find(|&c| doc.is(c, Kind::Decoration))
    {
        Some(decoration) => decoration,
        None => {
            let index = doc
                .children(root)
                .iter()
                .position(|&c| {
                    !matches!(doc.kind(c), Some(Kind::Title | Kind::Subtitle | Kind::Rubric))
                })
                .unwrap_or(doc.children(root).len());
            let decoration = doc.new_element(Kind::Decoration);
            doc.insert(root, index, decoration);
            decoration
        }
    };
    let existing = match kind {
        Kind::Header => doc.children(decoration).first().copied(),
        _ => doc.children(decoration).last().copied(),
    };
    if let Some(part) = existing.filter(|&p| doc.is(p, kind)) {
        return part;
    }
    let part = doc.new_element(kind);
    if kind == Kind::Header {
        doc.insert(decoration, 0, part);
    } else {
        doc.append(decoration, part);
    }
    part
}

impl BlockParser<'_> {
    pub(super) fn contents(&mut self, inv: &Invocation) -> Outcome {
        self.check_section_context(inv)?;
        let mut messages = Vec::new();
        let title = match inv.argument(0) {
            Some(text) => {
                let (title, more) = self.directive_title(Kind::Title, text, inv.lineno)?;
                messages = more;
                Some(title)
            }
            None if inv.options.contains("local") => None,
            None => {
                let label = languages::label("contents");
                Some(self.doc.new_text_element(Kind::Title, "", label))
            }
        };

        let topic = self.doc.new_element(Kind::Topic);
        self.doc.push_attr(topic, "classes", "contents");
        self.add_classes(topic, inv.options.classes("class"));
        if inv.options.contains("local") {
            self.doc.push_attr(topic, "classes", "local");
        }
        let name = match title {
            Some(title) => {
                self.doc.append(topic, title);
                self.doc.astext(title)
            }
            None => languages::label("contents").to_string(),
        };
        let name = fully_normalize_name(&name);
        if !self.doc.nameids.contains_key(&name) {
            self.doc.push_attr(topic, "names", name);
        }
        self.doc.note_implicit_target(topic, None)?;

        let pending = self
            .doc
            .new_pending(PendingTransform::Contents, option_details(&inv.options));
        self.doc.set_rawsource(pending, inv.block_text.as_str());
        self.doc.append(topic, pending);
        let mut output = vec![topic];
        output.extend(messages);
        Ok(output)
    }

    pub(super) fn sectnum(&mut self, inv: &Invocation) -> Outcome {
        let pending = self
            .doc
            .new_pending(PendingTransform::SectNum, option_details(&inv.options));
        self.doc.set_rawsource(pending, inv.block_text.as_str());
        Ok(vec![pending])
    }

    pub(super) fn target_notes(&mut self, inv: &Invocation) -> Outcome {
        let pending = self
            .doc
            .new_pending(PendingTransform::TargetNotes, option_details(&inv.options));
        self.add_name(pending, inv)?;
        Ok(vec![pending])
    }

    /// `header` and `footer` fill the document decoration and produce no
    /// nodes in place.
    pub(super) fn decoration_part(&mut self, inv: &Invocation, kind: Kind) -> Outcome {
        let part = decoration_part(self.doc, kind);
        if inv.content.is_empty() {
            let text = format!("Problem with the \"{}\" directive: no content supplied.", inv.name);
            let paragraph = self.doc.new_text_element(Kind::Paragraph, "", &text);
            self.doc.append(part, paragraph);
            let warning = self
                .doc
                .warning(format!(
                    "Content block expected for the \"{}\" directive; none found.",
                    inv.name
                ))
                .line(inv.lineno)
                .emit()?;
            self.doc.append(part, warning);
        } else {
            self.parse_content(&inv.content, part);
        }
        Ok(Vec::new())
    }
}
