//! Small structural transforms: `class` directive targets and transition
//! placement.

use super::Transform;
use crate::error::Result;
use crate::nodes::{Attributes, Document, Kind, NodeId};

/// Add the classes of a `class` directive to the next suitable element,
/// climbing out of sections and containers when the directive comes last.
pub(crate) fn class_attribute(doc: &mut Document, pending: NodeId, details: &Attributes) -> Result<()> {
    let mut child = pending;
    while let Some(parent) = doc.parent(child) {
        let start = doc.index_in_parent(child).map_or(0, |i| i + 1);
        let target = doc.children(parent)[start..].iter().copied().find(|&sibling| {
            !doc
                .kind(sibling)
                .is_some_and(|k| k.is_invisible() || k == Kind::SystemMessage)
        });
        if let Some(element) = target {
            for class in details.list("class") {
                doc.push_attr(element, "classes", class.as_str());
            }
            doc.detach(pending);
            return Ok(());
        }
        child = parent;
    }

    let directive = details.get_str("directive").unwrap_or("class");
    let raw = doc.rawsource(pending).to_string();
    let literal = doc.new_text_element(Kind::LiteralBlock, &raw, &raw);
    let msg = doc
        .error(format!("No suitable element following \"{directive}\" directive"))
        .child(literal)
        .base_node(pending)
        .emit()?;
    doc.replace_with(pending, vec![msg]);
    Ok(())
}

/// Check that transitions sit between body elements and move a transition
/// that ends a section to after the section.
pub struct Transitions;

impl Transform for Transitions {
    fn name(&self) -> &'static str {
        "Transitions"
    }

    fn priority(&self) -> u16 {
        830
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for node in doc.find_all(doc.root(), Kind::Transition) {
            visit_transition(doc, node)?;
        }
        Ok(())
    }
}

fn visit_transition(doc: &mut Document, node: NodeId) -> Result<()> {
    let (Some(parent), Some(mut index)) = (doc.parent(node), doc.index_in_parent(node)) else {
        return Ok(());
    };
    let siblings = doc.children(parent).to_vec();
    let starts_container = index == 0
        || (doc.is(siblings[0], Kind::Title)
            && (index == 1 || (doc.is(siblings[1], Kind::Subtitle) && index == 2)));
    let message = if starts_container {
        Some("Document or section may not begin with a transition.")
    } else if doc.is(siblings[index - 1], Kind::Transition) {
        Some(
            "At least one body element must separate transitions; \
             adjacent transitions are not allowed.",
        )
    } else {
        None
    };
    if let Some(message) = message {
        let msg = doc.error(message).base_node(node).emit()?;
        doc.insert(parent, index, msg);
        index += 1;
    }
    if index + 1 != doc.children(parent).len() {
        return Ok(());
    }

    // Climb while the transition's container is the last child of its own
    // parent; the transition then moves after that container.
    let mut sibling = parent;
    loop {
        let Some(grandparent) = doc.parent(sibling) else {
            let msg = doc
                .error("Document may not end with a transition.")
                .base_node(node)
                .emit()?;
            if let Some(at) = doc.index_in_parent(node) {
                doc.insert(parent, at + 1, msg);
            }
            return Ok(());
        };
        let Some(position) = doc.index_in_parent(sibling) else {
            return Ok(());
        };
        if position + 1 != doc.children(grandparent).len() {
            doc.detach(node);
            doc.insert(grandparent, position + 1, node);
            return Ok(());
        }
        sibling = grandparent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transforms::{Pipeline, transform};
    use crate::writers::pseudoxml::pformat;
    use similar_asserts::assert_eq;

    fn parsed(text: &str) -> Document {
        let settings = Settings::builder().warning_stream("-").build();
        let mut doc = crate::parser::parse(text, &settings).unwrap();
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Transitions));
        transform(&mut doc, &pipeline).unwrap();
        doc
    }

    #[test]
    fn class_applies_to_following_paragraph() {
        let doc = parsed(".. class:: special\n\nParagraph.\n");
        assert_eq!(
            pformat(&doc, doc.root()),
            "<document source=\"<string>\">\n    <paragraph classes=\"special\">\n        Paragraph.\n"
        );
    }

    #[test]
    fn class_skips_invisible_siblings_and_climbs() {
        let doc = parsed("Section\n=======\n\n.. class:: x\n\nNext\n====\n");
        let sections = doc.find_all(doc.root(), Kind::Section);
        assert_eq!(doc.list(sections[1], "classes"), ["x"]);
    }

    #[test]
    fn class_without_target_reports() {
        let doc = parsed("Para.\n\n.. class:: lonely\n");
        let messages = doc.system_messages();
        assert_eq!(messages.len(), 1);
        assert!(doc.astext(messages[0]).contains("No suitable element following \"class\""));
    }

    #[test]
    fn transition_at_section_end_moves_out() {
        let doc = parsed("A\n=\n\nText.\n\n----------\n\nB\n=\n\nMore.\n");
        let root = doc.root();
        let kinds: Vec<_> = doc
            .children(root)
            .iter()
            .filter_map(|&c| doc.kind(c))
            .collect();
        assert_eq!(kinds, [Kind::Section, Kind::Transition, Kind::Section]);
    }

    #[test]
    fn transition_at_document_end_is_an_error() {
        let doc = parsed("Text.\n\n----------\n");
        let last = *doc.children(doc.root()).last().unwrap();
        assert!(doc.is(last, Kind::SystemMessage));
        assert!(doc.astext(last).contains("Document may not end with a transition."));
    }

    #[test]
    fn adjacent_transitions_are_an_error() {
        let doc = parsed("Text.\n\n----------\n\n----------\n\nMore.\n");
        let messages = doc.system_messages();
        assert_eq!(messages.len(), 1);
        assert!(doc.astext(messages[0]).contains("adjacent transitions are not allowed"));
    }
}
