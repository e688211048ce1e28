//! Depth-first traversal with pre/post callbacks.

use super::{Document, NodeId};

/// What the walker does after [`Visitor::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Do not descend; `depart` is still called for this node.
    SkipChildren,
    /// Abort the walk immediately.
    Stop,
}

pub trait Visitor {
    fn visit(&mut self, doc: &Document, node: NodeId) -> Walk;

    fn depart(&mut self, _doc: &Document, _node: NodeId) {}
}

impl Document {
    /// Walk the subtree at `start`, calling `visit` before and `depart` after
    /// each node's children. Uses an explicit stack so deep trees are fine.
    pub fn walk<V: Visitor + ?Sized>(&self, start: NodeId, visitor: &mut V) {
        // (node, index of the next child to enter)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        match visitor.visit(self, start) {
            Walk::Stop => return,
            Walk::SkipChildren => {
                visitor.depart(self, start);
                return;
            }
            Walk::Continue => stack.push((start, 0)),
        }

        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            let children = self.children(node);
            if *next < children.len() {
                let child = children[*next];
                *next += 1;
                match visitor.visit(self, child) {
                    Walk::Stop => return,
                    Walk::SkipChildren => visitor.depart(self, child),
                    Walk::Continue => stack.push((child, 0)),
                }
            } else {
                stack.pop();
                visitor.depart(self, node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::nodes::Kind;

    struct Recorder(Vec<String>);

    impl Visitor for Recorder {
        fn visit(&mut self, doc: &Document, node: NodeId) -> Walk {
            let label = doc.kind(node).map_or("#text", Kind::tag);
            self.0.push(format!("+{label}"));
            if doc.is(node, Kind::Emphasis) {
                Walk::SkipChildren
            } else {
                Walk::Continue
            }
        }

        fn depart(&mut self, doc: &Document, node: NodeId) {
            let label = doc.kind(node).map_or("#text", Kind::tag);
            self.0.push(format!("-{label}"));
        }
    }

    #[test]
    fn visits_in_document_order() {
        let mut doc = Document::new(Settings::default());
        let para = doc.new_text_element(Kind::Paragraph, "", "a");
        let em = doc.new_text_element(Kind::Emphasis, "", "b");
        doc.append(para, em);
        doc.append(doc.root(), para);

        let mut rec = Recorder(Vec::new());
        doc.walk(doc.root(), &mut rec);
        assert_eq!(
            rec.0,
            vec![
                "+document",
                "+paragraph",
                "+#text",
                "-#text",
                "+emphasis",
                "-emphasis",
                "-paragraph",
                "-document"
            ]
        );
    }
}
