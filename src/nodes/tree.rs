//! Arena storage and structural tree operations.

use super::{AttrValue, Attributes, Document, Element, Kind, Node, NodeData, NodeId};

impl Document {
    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            line: None,
        });
        id
    }

    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// New detached element. Fixed-text kinds start out with
    /// `xml:space="preserve"`.
    pub fn new_element(&mut self, kind: Kind) -> NodeId {
        let mut element = Element::new(kind);
        if kind.is_fixed_text() {
            element.attributes.set("xml:space", "preserve");
        }
        self.alloc(NodeData::Element(element))
    }

    /// New element with a raw source string and, if `text` is non-empty, one
    /// text child.
    pub fn new_text_element(&mut self, kind: Kind, rawsource: &str, text: &str) -> NodeId {
        let id = self.new_element(kind);
        if let Some(el) = self.element_mut(id) {
            el.rawsource = rawsource.to_string();
        }
        if !text.is_empty() {
            let child = self.new_text(text);
            self.append(id, child);
        }
        id
    }

    /// New element whose children are `children`.
    pub fn new_element_with(&mut self, kind: Kind, children: Vec<NodeId>) -> NodeId {
        let id = self.new_element(kind);
        self.extend(id, children);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<Kind> {
        self.element(id).map(|el| el.kind)
    }

    pub fn is(&self, id: NodeId, kind: Kind) -> bool {
        self.kind(id) == Some(kind)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].data, NodeData::Text(_))
    }

    pub fn text_value(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn line(&self, id: NodeId) -> Option<usize> {
        self.nodes[id.index()].line
    }

    /// The line of `id`, else of its nearest ancestor that has one. Inline
    /// nodes carry no line of their own.
    pub fn source_line(&self, id: NodeId) -> Option<usize> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(line) = self.line(node) {
                return Some(line);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn set_line(&mut self, id: NodeId, line: usize) {
        self.nodes[id.index()].line = Some(line);
    }

    pub fn rawsource(&self, id: NodeId) -> &str {
        match &self.nodes[id.index()].data {
            NodeData::Element(el) => &el.rawsource,
            NodeData::Text(t) => t,
        }
    }

    pub fn set_rawsource(&mut self, id: NodeId, rawsource: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.rawsource = rawsource.into();
        }
    }

    // ----- attributes -----

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        self.element(id).map(|el| &el.attributes)
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        self.element_mut(id).map(|el| &mut el.attributes)
    }

    pub fn get_attr(&self, id: NodeId, key: &str) -> Option<&AttrValue> {
        self.attrs(id).and_then(|a| a.get(key))
    }

    pub fn get_str(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attrs(id).and_then(|a| a.get_str(key))
    }

    pub fn get_int(&self, id: NodeId, key: &str) -> Option<i64> {
        self.attrs(id).and_then(|a| a.get_int(key))
    }

    pub fn list(&self, id: NodeId, key: &str) -> &[String] {
        self.attrs(id).map(|a| a.list(key)).unwrap_or(&[])
    }

    pub fn has_attr(&self, id: NodeId, key: &str) -> bool {
        self.attrs(id).is_some_and(|a| a.contains(key))
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<AttrValue>) {
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.set(key, value);
        }
    }

    pub fn push_attr(&mut self, id: NodeId, key: &str, item: impl Into<String>) {
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.push(key, item);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<AttrValue> {
        self.attrs_mut(id).and_then(|a| a.remove(key))
    }

    // ----- structure -----

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(el) = self.element_mut(parent) {
            el.children.push(child);
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    pub fn extend(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        for child in children {
            self.append(parent, child);
        }
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        if let Some(el) = self.element_mut(parent) {
            let index = index.min(el.children.len());
            el.children.insert(index, child);
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    /// Remove `child` from its parent's child list. The node stays in the
    /// arena and may be re-attached.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.index()].parent.take()
            && let Some(el) = self.element_mut(parent)
        {
            el.children.retain(|c| *c != child);
        }
    }

    /// Detach and return all children of `parent`.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = match self.element_mut(parent) {
            Some(el) => std::mem::take(&mut el.children),
            None => Vec::new(),
        };
        for child in &children {
            self.nodes[child.index()].parent = None;
        }
        children
    }

    /// Put `replacements` where `old` was; `old` ends up detached.
    pub fn replace_with(&mut self, old: NodeId, replacements: Vec<NodeId>) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        let Some(index) = self.index_in_parent(old) else {
            return;
        };
        self.detach(old);
        for (offset, node) in replacements.into_iter().enumerate() {
            self.insert(parent, index + offset, node);
        }
    }

    /// Merge runs of adjacent text children of `parent` into their first
    /// node and drop empty text children.
    pub fn normalize_text(&mut self, parent: NodeId) {
        let children = self.take_children(parent);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let Some(text) = self.text_value(child).map(str::to_string) else {
                kept.push(child);
                continue;
            };
            if text.is_empty() {
                continue;
            }
            if let Some(&last) = kept.last()
                && let NodeData::Text(previous) = &mut self.nodes[last.index()].data
            {
                previous.push_str(&text);
                continue;
            }
            kept.push(child);
        }
        self.extend(parent, kept);
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// The next sibling of `id` or of its nearest ancestor that has one.
    pub fn next_node_ascending(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
    }

    /// True when `id` is the root or its ancestor chain reaches the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Pre-order list of `id` and all its descendants.
    pub fn traverse(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// All elements of `kind` at or below `id`, in document order.
    pub fn find_all(&self, id: NodeId, kind: Kind) -> Vec<NodeId> {
        self.traverse(id)
            .into_iter()
            .filter(|n| self.is(*n, kind))
            .collect()
    }

    /// Plain text content. Children of text elements are concatenated;
    /// children of other elements are separated by blank lines.
    pub fn astext(&self, id: NodeId) -> String {
        match &self.nodes[id.index()].data {
            NodeData::Text(t) => t.clone(),
            NodeData::Element(el) => {
                let separator = if el.kind.is_text_element() { "" } else { "\n\n" };
                el.children
                    .iter()
                    .map(|c| self.astext(*c))
                    .collect::<Vec<_>>()
                    .join(separator)
            }
        }
    }

    /// Copy the subtree rooted at `id` into fresh, detached nodes.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id.index()].clone();
        let (copy_data, children) = match node.data {
            NodeData::Text(t) => (NodeData::Text(t), Vec::new()),
            NodeData::Element(mut el) => {
                let children = std::mem::take(&mut el.children);
                (NodeData::Element(el), children)
            }
        };
        let copy = self.alloc(copy_data);
        self.nodes[copy.index()].line = node.line;
        for child in children {
            let child_copy = self.deep_copy(child);
            self.append(copy, child_copy);
        }
        copy
    }
}
