//! Transforms that apply to every document regardless of its content:
//! settings-driven stripping, the footer decoration, and collecting and
//! filtering diagnostics.

use super::Transform;
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId};
use crate::parser::directives::decoration_part;

const GENERATOR_URL: &str = "https://crates.io/crates/restruct";
const RST_URL: &str = "https://docutils.sourceforge.io/rst.html";

/// Drop elements carrying one of `strip_elements_with_classes` and remove
/// the `strip_classes` values from every element.
pub struct StripClassesAndElements;

impl Transform for StripClassesAndElements {
    fn name(&self) -> &'static str {
        "StripClassesAndElements"
    }

    fn priority(&self) -> u16 {
        420
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let strip_elements = doc.settings.strip_elements_with_classes.clone();
        let strip_classes = doc.settings.strip_classes.clone();
        if strip_elements.is_empty() && strip_classes.is_empty() {
            return Ok(());
        }
        let root = doc.root();
        if !strip_elements.is_empty() {
            let doomed: Vec<NodeId> = doc
                .traverse(root)
                .into_iter()
                .filter(|&n| n != root)
                .filter(|&n| doc.list(n, "classes").iter().any(|c| strip_elements.contains(c)))
                .collect();
            for node in doomed {
                log::trace!("Stripping {:?} {node:?}", doc.kind(node));
                doc.detach(node);
            }
        }
        if !strip_classes.is_empty() {
            for node in doc.traverse(root) {
                if let Some(attrs) = doc.attrs_mut(node)
                    && attrs.contains("classes")
                {
                    attrs.list_mut("classes").retain(|c| !strip_classes.contains(c));
                }
            }
        }
        Ok(())
    }
}

/// Remove comments when `strip_comments` is set.
pub struct StripComments;

impl Transform for StripComments {
    fn name(&self) -> &'static str {
        "StripComments"
    }

    fn priority(&self) -> u16 {
        740
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        if !doc.settings.strip_comments {
            return Ok(());
        }
        for comment in doc.find_all(doc.root(), Kind::Comment) {
            doc.detach(comment);
        }
        Ok(())
    }
}

/// Add the generator and source links to the document footer.
pub struct Decorations;

impl Transform for Decorations {
    fn name(&self) -> &'static str {
        "Decorations"
    }

    fn priority(&self) -> u16 {
        820
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let source_url = doc.settings.source_url.clone();
        let generator = doc.settings.generator;
        if source_url.is_none() && !generator {
            return Ok(());
        }
        let mut text = Vec::new();
        if let Some(url) = source_url {
            text.push(link(doc, "View document source", &url));
            text.push(doc.new_text(".\n"));
        }
        if generator {
            text.push(doc.new_text("Generated by "));
            text.push(link(doc, env!("CARGO_PKG_NAME"), GENERATOR_URL));
            text.push(doc.new_text(" from "));
            text.push(link(doc, "reStructuredText", RST_URL));
            text.push(doc.new_text(" source.\n"));
        }
        let paragraph = doc.new_element_with(Kind::Paragraph, text);
        let footer = decoration_part(doc, Kind::Footer);
        doc.append(footer, paragraph);
        Ok(())
    }
}

fn link(doc: &mut Document, text: &str, refuri: &str) -> NodeId {
    let reference = doc.new_text_element(Kind::Reference, "", text);
    doc.set_attr(reference, "refuri", refuri);
    reference
}

/// Copy bookkeeping that normally stays off the tree into `internal:`
/// attributes, for the names listed in `expose_internals`.
pub struct ExposeInternals;

impl Transform for ExposeInternals {
    fn name(&self) -> &'static str {
        "ExposeInternals"
    }

    fn priority(&self) -> u16 {
        840
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let internals = doc.settings.expose_internals.clone();
        if internals.is_empty() {
            return Ok(());
        }
        for node in doc.traverse(doc.root()) {
            if doc.is_text(node) {
                continue;
            }
            for name in &internals {
                let value = match name.as_str() {
                    "resolved" => doc.resolved.contains(&node).then_some(1),
                    "referenced" => doc.referenced.contains(&node).then_some(1),
                    "line" => doc.line(node).and_then(|l| i64::try_from(l).ok()),
                    _ => None,
                };
                if let Some(value) = value {
                    doc.set_attr(node, &format!("internal:{name}"), value);
                }
            }
        }
        Ok(())
    }
}

/// Collect the transform messages not placed anywhere else into a closing
/// "Docutils System Messages" section.
pub struct Messages;

impl Transform for Messages {
    fn name(&self) -> &'static str {
        "Messages"
    }

    fn priority(&self) -> u16 {
        860
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let threshold = i64::from(doc.reporter.report_level());
        let messages: Vec<NodeId> = doc
            .transform_messages
            .iter()
            .copied()
            .filter(|&m| doc.parent(m).is_none())
            .filter(|&m| doc.get_int(m, "level").unwrap_or(0) >= threshold)
            .collect();
        if messages.is_empty() {
            return Ok(());
        }
        let section = doc.new_element(Kind::Section);
        doc.push_attr(section, "classes", "system-messages");
        let title = doc.new_text_element(Kind::Title, "", "Docutils System Messages");
        doc.append(section, title);
        doc.extend(section, messages);
        doc.transform_messages.clear();
        let root = doc.root();
        doc.append(root, section);
        Ok(())
    }
}

/// Remove messages below the report level, attached or not, and unwrap
/// `problematic` nodes whose message went with them.
pub struct FilterMessages;

impl Transform for FilterMessages {
    fn name(&self) -> &'static str {
        "FilterMessages"
    }

    fn priority(&self) -> u16 {
        870
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        let threshold = i64::from(doc.reporter.report_level());
        let mut candidates = doc.system_messages();
        candidates.extend(
            doc.transform_messages
                .iter()
                .copied()
                .filter(|&m| doc.parent(m).is_none()),
        );
        for msg in candidates {
            if doc.get_int(msg, "level").unwrap_or(0) >= threshold {
                continue;
            }
            doc.detach(msg);
            if let Some(id) = doc.list(msg, "ids").first().cloned() {
                doc.ids.remove(&id);
            }
        }
        for problematic in doc.find_all(doc.root(), Kind::Problematic) {
            let linked = doc
                .get_str(problematic, "refid")
                .is_some_and(|refid| doc.ids.contains_key(refid));
            if !linked {
                let children = doc.take_children(problematic);
                doc.replace_with(problematic, children);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transforms::{Pipeline, transform};
    use crate::writers::pseudoxml::pformat;
    use similar_asserts::assert_eq;

    fn run(text: &str, settings: Settings, transforms: Vec<Box<dyn Transform>>) -> Document {
        let mut doc = crate::parser::parse(text, &settings).unwrap();
        let mut pipeline = Pipeline::new();
        for t in transforms {
            pipeline.register(t);
        }
        transform(&mut doc, &pipeline).unwrap();
        doc
    }

    fn quiet() -> crate::config::SettingsBuilder {
        Settings::builder().warning_stream("-")
    }

    #[test]
    fn strips_comments_when_asked() {
        let text = "Para.\n\n.. a comment\n";
        let kept = run(text, quiet().build(), vec![Box::new(StripComments)]);
        assert_eq!(kept.find_all(kept.root(), Kind::Comment).len(), 1);
        let stripped = run(
            text,
            quiet().strip_comments(true).build(),
            vec![Box::new(StripComments)],
        );
        assert!(stripped.find_all(stripped.root(), Kind::Comment).is_empty());
    }

    #[test]
    fn strips_classes_and_elements() {
        let text = ".. class:: drop\n\nGone.\n\n.. class:: keep plain\n\nStays.\n";
        let settings = quiet()
            .strip_elements_with_classes(vec!["drop".into()])
            .strip_classes(vec!["plain".into()])
            .build();
        let doc = run(text, settings, vec![Box::new(StripClassesAndElements)]);
        let paragraphs = doc.find_all(doc.root(), Kind::Paragraph);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(doc.astext(paragraphs[0]), "Stays.");
        assert_eq!(doc.list(paragraphs[0], "classes"), ["keep"]);
    }

    #[test]
    fn generator_footer() {
        let settings = quiet().generator(true).source_url("src.rst").build();
        let doc = run("Text.\n", settings, vec![Box::new(Decorations)]);
        let footer = doc.find_all(doc.root(), Kind::Footer)[0];
        assert_eq!(
            doc.astext(footer),
            "View document source.\nGenerated by restruct from reStructuredText source.\n"
        );
        let decoration = doc.children(doc.root())[0];
        assert!(doc.is(decoration, Kind::Decoration));
    }

    #[test]
    fn exposes_internal_attributes() {
        let settings = quiet().expose_internals(vec!["line".into()]).build();
        let doc = run("Text.\n", settings, vec![Box::new(ExposeInternals)]);
        let paragraph = doc.children(doc.root())[0];
        assert_eq!(doc.get_int(paragraph, "internal:line"), Some(1));
    }

    #[test]
    fn loose_messages_get_their_own_section() {
        let doc = run(
            "See missing_.\n",
            quiet().build(),
            vec![
                Box::new(crate::transforms::references::DanglingReferences),
                Box::new(Messages),
                Box::new(FilterMessages),
            ],
        );
        let section = *doc.children(doc.root()).last().unwrap();
        assert_eq!(doc.list(section, "classes"), ["system-messages"]);
        let children = doc.children(section).to_vec();
        assert_eq!(doc.astext(children[0]), "Docutils System Messages");
        assert!(doc.is(children[1], Kind::SystemMessage));
        assert_eq!(doc.get_str(children[1], "type"), Some("ERROR"));

        let paragraph = doc.children(doc.root())[0];
        let problematic = doc.find_all(paragraph, Kind::Problematic)[0];
        let msgid = &doc.list(children[1], "ids")[0];
        assert_eq!(doc.get_str(problematic, "refid"), Some(msgid.as_str()));
        assert!(pformat(&doc, paragraph).contains("missing_"));
    }

    #[test]
    fn filters_messages_below_report_level() {
        let settings = quiet().report_level(4).build();
        let doc = run(
            "See missing_.\n",
            settings,
            vec![
                Box::new(crate::transforms::references::DanglingReferences),
                Box::new(Messages),
                Box::new(FilterMessages),
            ],
        );
        assert!(doc.system_messages().is_empty());
        assert!(doc.find_all(doc.root(), Kind::Problematic).is_empty());
        let paragraph = doc.children(doc.root())[0];
        assert_eq!(doc.astext(paragraph), "See missing_.");
    }
}
