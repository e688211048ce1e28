//! The document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Bookkeeping tables on the document store handles, never
//! references, so the tree can be rewritten freely by transforms.

mod attributes;
mod document;
mod kind;
mod names;
mod tree;
mod visitor;

pub use attributes::{AttrValue, Attributes, INT_ATTRIBUTES, LIST_ATTRIBUTES, split_list_value};
pub use document::{Document, Pending, PendingTransform};
pub use kind::Kind;
pub use names::{fully_normalize_name, make_id, whitespace_normalize_name};
pub use visitor::{Visitor, Walk};

/// Handle of a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) line: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub kind: Kind,
    pub attributes: Attributes,
    pub children: Vec<NodeId>,
    /// Markup the element was parsed from, used to rebuild problematic text.
    pub rawsource: String,
}

impl Element {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            attributes: Attributes::new(),
            children: Vec::new(),
            rawsource: String::new(),
        }
    }
}
