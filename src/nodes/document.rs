//! The document root and its name/reference bookkeeping.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::names::{fully_normalize_name, make_id, whitespace_normalize_name};
use super::{Attributes, Element, Kind, Node, NodeData, NodeId};
use crate::config::Settings;
use crate::error::Result;
use crate::reporter::{Level, Reporter};

/// Transforms that can be scheduled from inside the tree by a `pending` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingTransform {
    ClassAttribute,
    Contents,
    SectNum,
    TargetNotes,
}

impl PendingTransform {
    pub fn priority(self) -> u16 {
        match self {
            PendingTransform::ClassAttribute => 210,
            PendingTransform::TargetNotes => 540,
            PendingTransform::SectNum => 710,
            PendingTransform::Contents => 720,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PendingTransform::ClassAttribute => "restruct::transforms::misc::ClassAttribute",
            PendingTransform::Contents => "restruct::transforms::parts::Contents",
            PendingTransform::SectNum => "restruct::transforms::parts::SectNum",
            PendingTransform::TargetNotes => "restruct::transforms::references::TargetNotes",
        }
    }
}

/// Internal data of a `pending` node.
#[derive(Debug, Clone)]
pub struct Pending {
    pub transform: PendingTransform,
    pub details: Attributes,
}

/// Root of a parsed document: the node arena, the reporter and the
/// bookkeeping tables that map names and ids to nodes.
#[derive(Debug)]
pub struct Document {
    pub(super) nodes: Vec<Node>,
    pub(super) root: NodeId,
    pub settings: Settings,
    pub reporter: Reporter,

    /// id → element carrying it.
    pub ids: BTreeMap<String, NodeId>,
    /// name → id of its owner; `None` once the name became a duplicate.
    pub nameids: BTreeMap<String, Option<String>>,
    /// name → whether it was declared explicitly.
    pub nametypes: BTreeMap<String, bool>,
    pub explicit_targets: BTreeMap<String, NodeId>,
    pub indirect_targets: Vec<NodeId>,
    pub external_targets: Vec<NodeId>,
    pub refnames: BTreeMap<String, Vec<NodeId>>,
    pub refids: BTreeMap<String, Vec<NodeId>>,
    pub anonymous_refs: Vec<NodeId>,
    pub anonymous_targets: Vec<NodeId>,
    pub footnotes: Vec<NodeId>,
    pub autofootnotes: Vec<NodeId>,
    pub autofootnote_refs: Vec<NodeId>,
    pub symbol_footnotes: Vec<NodeId>,
    pub symbol_footnote_refs: Vec<NodeId>,
    pub footnote_refs: BTreeMap<String, Vec<NodeId>>,
    pub citations: Vec<NodeId>,
    pub citation_refs: BTreeMap<String, Vec<NodeId>>,
    /// whitespace-normalized name → definition.
    pub substitution_defs: BTreeMap<String, NodeId>,
    /// fully normalized name → whitespace-normalized name.
    pub substitution_names: BTreeMap<String, String>,
    pub pending: Vec<NodeId>,
    pub pending_details: HashMap<NodeId, Pending>,
    pub parse_messages: Vec<NodeId>,
    pub transform_messages: Vec<NodeId>,

    pub autofootnote_start: usize,
    pub symbol_footnote_start: usize,
    pub anonymous_start: usize,
    pub id_counter: BTreeMap<String, usize>,

    /// References and targets already resolved by a transform.
    pub resolved: HashSet<NodeId>,
    /// Targets some reference points at.
    pub referenced: HashSet<NodeId>,
    /// Title styles in order of first appearance: (underline char, overline char).
    pub title_styles: Vec<(char, Option<char>)>,
    pub(crate) in_transform: bool,
}

impl Document {
    pub fn new(settings: Settings) -> Self {
        let reporter = Reporter::from_settings(&settings);
        let mut root = Element::new(Kind::Document);
        root.attributes
            .set("source", settings.source_name().to_string());
        Self {
            nodes: vec![Node {
                data: NodeData::Element(root),
                parent: None,
                line: None,
            }],
            root: NodeId(0),
            settings,
            reporter,
            ids: BTreeMap::new(),
            nameids: BTreeMap::new(),
            nametypes: BTreeMap::new(),
            explicit_targets: BTreeMap::new(),
            indirect_targets: Vec::new(),
            external_targets: Vec::new(),
            refnames: BTreeMap::new(),
            refids: BTreeMap::new(),
            anonymous_refs: Vec::new(),
            anonymous_targets: Vec::new(),
            footnotes: Vec::new(),
            autofootnotes: Vec::new(),
            autofootnote_refs: Vec::new(),
            symbol_footnotes: Vec::new(),
            symbol_footnote_refs: Vec::new(),
            footnote_refs: BTreeMap::new(),
            citations: Vec::new(),
            citation_refs: BTreeMap::new(),
            substitution_defs: BTreeMap::new(),
            substitution_names: BTreeMap::new(),
            pending: Vec::new(),
            pending_details: HashMap::new(),
            parse_messages: Vec::new(),
            transform_messages: Vec::new(),
            autofootnote_start: 1,
            symbol_footnote_start: 0,
            anonymous_start: 1,
            id_counter: BTreeMap::new(),
            resolved: HashSet::new(),
            referenced: HashSet::new(),
            title_styles: Vec::new(),
            in_transform: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Every `system_message` currently attached to the tree, in document order.
    pub fn system_messages(&self) -> Vec<NodeId> {
        self.find_all(self.root, Kind::SystemMessage)
    }

    pub(crate) fn note_message(&mut self, msg: NodeId) {
        if self.in_transform {
            self.transform_messages.push(msg);
        } else {
            self.parse_messages.push(msg);
        }
    }

    // ----- ids and names -----

    /// Register the ids of `node`, generating one if it has none. Returns
    /// the node's first id.
    pub fn set_id(&mut self, node: NodeId, msgnode: Option<NodeId>) -> Result<String> {
        let existing = self.list(node, "ids").to_vec();
        if let Some(first) = existing.first() {
            for id in &existing {
                let owner = *self.ids.entry(id.clone()).or_insert(node);
                if owner != node {
                    let msg = self
                        .severe(format!("Duplicate ID: \"{id}\"."))
                        .base_node(node)
                        .emit()?;
                    if let Some(parent) = msgnode {
                        self.append(parent, msg);
                    }
                }
            }
            return Ok(first.clone());
        }

        let id_prefix = self.settings.id_prefix.clone();
        let mut chosen = None;
        for name in self.list(node, "names") {
            let base_id = if id_prefix.is_empty() {
                make_id(name)
            } else {
                make_id(&format!("x{name}"))
                    .get(1..)
                    .unwrap_or_default()
                    .to_string()
            };
            let candidate = format!("{id_prefix}{base_id}");
            if !base_id.is_empty() && !self.ids.contains_key(&candidate) {
                chosen = Some(candidate);
                break;
            }
        }

        let id = match chosen {
            Some(id) => id,
            None => {
                let prefix = format!("{id_prefix}{}", self.settings.auto_id_prefix);
                loop {
                    let counter = self.id_counter.entry(prefix.clone()).or_insert(0);
                    *counter += 1;
                    let candidate = format!("{prefix}{counter}");
                    if !self.ids.contains_key(&candidate) {
                        break candidate;
                    }
                }
            }
        };
        self.push_attr(node, "ids", id.clone());
        self.ids.insert(id.clone(), node);
        Ok(id)
    }

    /// Map each name of `node` to `id`, resolving clashes with earlier
    /// owners of the same name.
    pub fn set_name_id_map(
        &mut self,
        node: NodeId,
        id: &str,
        msgnode: Option<NodeId>,
        explicit: bool,
    ) -> Result<()> {
        let names = self.list(node, "names").to_vec();
        for name in names {
            if self.nameids.contains_key(&name) {
                self.set_duplicate_name_id(node, id, &name, msgnode, explicit)?;
            } else {
                self.nameids.insert(name.clone(), Some(id.to_string()));
                self.nametypes.insert(name.clone(), explicit);
                if explicit {
                    self.explicit_targets.insert(name, node);
                }
            }
        }
        Ok(())
    }

    fn set_duplicate_name_id(
        &mut self,
        node: NodeId,
        id: &str,
        name: &str,
        msgnode: Option<NodeId>,
        explicit: bool,
    ) -> Result<()> {
        let old_id = self.nameids.get(name).cloned().flatten();
        let old_explicit = self.nametypes.get(name).copied().unwrap_or(false);
        self.nametypes
            .insert(name.to_string(), old_explicit || explicit);

        if explicit {
            if old_explicit {
                let mut level = Level::Warning;
                if let Some(old_id) = &old_id
                    && let Some(&old_node) = self.ids.get(old_id)
                {
                    if let Some(refuri) = self.get_str(node, "refuri")
                        && !self.list(old_node, "names").is_empty()
                        && self.get_str(old_node, "refuri") == Some(refuri)
                    {
                        level = Level::Info;
                    }
                    if level > Level::Info {
                        self.dupname(old_node, name);
                        self.nameids.insert(name.to_string(), None);
                        self.explicit_targets.remove(name);
                    }
                }
                let msg = self
                    .system_message(level, format!("Duplicate explicit target name: \"{name}\"."))
                    .backref(id)
                    .base_node(node)
                    .category("structure")
                    .emit()?;
                if let Some(parent) = msgnode {
                    self.append(parent, msg);
                }
                self.dupname(node, name);
            } else {
                self.nameids
                    .insert(name.to_string(), Some(id.to_string()));
                self.explicit_targets.insert(name.to_string(), node);
                if let Some(old_id) = &old_id
                    && let Some(&old_node) = self.ids.get(old_id)
                {
                    self.dupname(old_node, name);
                }
            }
        } else {
            if let Some(old_id) = &old_id
                && !old_explicit
            {
                self.nameids.insert(name.to_string(), None);
                if let Some(&old_node) = self.ids.get(old_id) {
                    self.dupname(old_node, name);
                }
            }
            self.dupname(node, name);
        }

        if !explicit || (!old_explicit && old_id.is_some()) {
            let msg = self
                .info(format!("Duplicate implicit target name: \"{name}\"."))
                .backref(id)
                .base_node(node)
                .emit()?;
            if let Some(parent) = msgnode {
                self.append(parent, msg);
            }
        }
        Ok(())
    }

    /// Move `name` from the node's `names` to its `dupnames`.
    pub fn dupname(&mut self, node: NodeId, name: &str) {
        if let Some(attrs) = self.attrs_mut(node) {
            attrs.push("dupnames", name);
            attrs.list_mut("names").retain(|n| n != name);
        }
        self.referenced.insert(node);
    }

    pub fn note_implicit_target(&mut self, target: NodeId, msgnode: Option<NodeId>) -> Result<()> {
        let id = self.set_id(target, msgnode)?;
        self.set_name_id_map(target, &id, msgnode, false)
    }

    pub fn note_explicit_target(&mut self, target: NodeId, msgnode: Option<NodeId>) -> Result<()> {
        let id = self.set_id(target, msgnode)?;
        self.set_name_id_map(target, &id, msgnode, true)
    }

    // ----- references -----

    pub fn note_refname(&mut self, node: NodeId) {
        if let Some(refname) = self.get_str(node, "refname").map(str::to_string) {
            self.refnames.entry(refname).or_default().push(node);
        }
    }

    pub fn note_refid(&mut self, node: NodeId) {
        if let Some(refid) = self.get_str(node, "refid").map(str::to_string) {
            self.refids.entry(refid).or_default().push(node);
        }
    }

    pub fn note_indirect_target(&mut self, target: NodeId) {
        self.indirect_targets.push(target);
        if !self.list(target, "names").is_empty() {
            self.note_refname(target);
        }
    }

    pub fn note_external_target(&mut self, target: NodeId) {
        self.external_targets.push(target);
    }

    pub fn note_anonymous_ref(&mut self, node: NodeId) {
        self.anonymous_refs.push(node);
    }

    pub fn note_anonymous_target(&mut self, target: NodeId) -> Result<()> {
        self.set_id(target, None)?;
        self.anonymous_targets.push(target);
        Ok(())
    }

    // ----- footnotes and citations -----

    pub fn note_autofootnote(&mut self, footnote: NodeId) -> Result<()> {
        self.set_id(footnote, None)?;
        self.autofootnotes.push(footnote);
        Ok(())
    }

    pub fn note_autofootnote_ref(&mut self, node: NodeId) -> Result<()> {
        self.set_id(node, None)?;
        self.autofootnote_refs.push(node);
        Ok(())
    }

    pub fn note_symbol_footnote(&mut self, footnote: NodeId) -> Result<()> {
        self.set_id(footnote, None)?;
        self.symbol_footnotes.push(footnote);
        Ok(())
    }

    pub fn note_symbol_footnote_ref(&mut self, node: NodeId) -> Result<()> {
        self.set_id(node, None)?;
        self.symbol_footnote_refs.push(node);
        Ok(())
    }

    pub fn note_footnote(&mut self, footnote: NodeId) -> Result<()> {
        self.set_id(footnote, None)?;
        self.footnotes.push(footnote);
        Ok(())
    }

    pub fn note_footnote_ref(&mut self, node: NodeId) -> Result<()> {
        self.set_id(node, None)?;
        if let Some(refname) = self.get_str(node, "refname").map(str::to_string) {
            self.footnote_refs.entry(refname).or_default().push(node);
        }
        self.note_refname(node);
        Ok(())
    }

    pub fn note_citation(&mut self, citation: NodeId) {
        self.citations.push(citation);
    }

    pub fn note_citation_ref(&mut self, node: NodeId) -> Result<()> {
        self.set_id(node, None)?;
        if let Some(refname) = self.get_str(node, "refname").map(str::to_string) {
            self.citation_refs.entry(refname).or_default().push(node);
        }
        self.note_refname(node);
        Ok(())
    }

    // ----- substitutions -----

    pub fn note_substitution_def(
        &mut self,
        subdef: NodeId,
        def_name: &str,
        msgnode: Option<NodeId>,
    ) -> Result<()> {
        let name = whitespace_normalize_name(def_name);
        if let Some(&old) = self.substitution_defs.get(&name) {
            let msg = self
                .error(format!(
                    "Duplicate substitution definition name: \"{name}\"."
                ))
                .base_node(subdef)
                .category("reference")
                .emit()?;
            if let Some(parent) = msgnode {
                self.append(parent, msg);
            }
            self.dupname(old, &name);
        }
        self.substitution_defs.insert(name.clone(), subdef);
        self.substitution_names
            .insert(fully_normalize_name(&name), name);
        Ok(())
    }

    pub fn note_substitution_ref(&mut self, subref: NodeId, refname: &str) {
        self.set_attr(subref, "refname", whitespace_normalize_name(refname));
    }

    // ----- pending transforms -----

    pub fn note_pending(&mut self, node: NodeId, pending: Pending) {
        self.pending.push(node);
        self.pending_details.insert(node, pending);
    }

    /// New detached `pending` node scheduled for `transform`.
    pub fn new_pending(&mut self, transform: PendingTransform, details: Attributes) -> NodeId {
        let node = self.new_element(Kind::Pending);
        self.note_pending(node, Pending { transform, details });
        node
    }
}
