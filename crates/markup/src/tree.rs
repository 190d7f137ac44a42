//! Arena-backed element tree.
//!
//! Nodes live in a single `Vec` and are addressed by `NodeId`. Each record stores its parent
//! index and an ordered list of child indices, so splices are plain index-vector edits.
//!
//! Invariants:
//! - `NodeId(0)` is the document node and never has a parent.
//! - A node has at most one parent and appears exactly once in that parent's child list.
//! - Detaching a node keeps its record (and its subtree) alive in the arena; it simply becomes
//!   unreachable from the root. Ids are never reused.
//! - Operations must not create cycles.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    /// Pre-rendered output token, written verbatim by the serializer.
    Raw(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0:?} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("node {0:?} cannot have children")]
    InvalidParent(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
}

#[derive(Clone, Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Document | NodeKind::Element { .. })
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<NodeRecord>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// First element child of the document node.
    pub fn root_element(&self) -> Option<NodeId> {
        self.first_element_child(self.root())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str, attributes: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_string(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    pub fn create_raw(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Raw(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, target: &str) -> bool {
        self.element_name(id) == Some(target)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        self.text(id).is_some_and(|t| t.trim().is_empty())
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = self.kind_mut(id) {
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, existing)) => {
                    existing.clear();
                    existing.push_str(value);
                }
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = self.kind_mut(id) else {
            return None;
        };
        let pos = attributes.iter().position(|(k, _)| k == name)?;
        Some(attributes.remove(pos).1)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Returns true if `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !self.nodes[parent.index()].allows_children() {
            return Err(TreeError::InvalidParent(parent));
        }
        if self.parent(child).is_some() || child == self.root() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Insert `child` as the sibling immediately preceding `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_relative(reference, child, 0)
    }

    /// Insert `child` as the sibling immediately following `reference`.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_relative(reference, child, 1)
    }

    fn insert_relative(
        &mut self,
        reference: NodeId,
        child: NodeId,
        offset: usize,
    ) -> Result<(), TreeError> {
        let parent = self
            .parent(reference)
            .ok_or(TreeError::Detached(reference))?;
        self.check_insert(parent, child)?;
        let siblings = &mut self.nodes[parent.index()].children;
        let pos = siblings
            .iter()
            .position(|c| *c == reference)
            .ok_or(TreeError::Detached(reference))?;
        siblings.insert(pos + offset, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Unlink `id` from its parent. The subtree stays intact and can be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    /// Detach and return all children of `id`, in order.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for child in &children {
            self.nodes[child.index()].parent = None;
        }
        children
    }

    /// Replace `id` by its children in its parent's child list.
    pub fn unwrap_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let children = self.take_children(id);
        for child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent.index()].children;
        let pos = siblings
            .iter()
            .position(|c| *c == id)
            .ok_or(TreeError::Detached(id))?;
        siblings.splice(pos..=pos, children);
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    /// All nodes below `id` in document order (pre-order), excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all text nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Deep-copy the subtree rooted at `node` of `other` into this arena.
    ///
    /// The copy is detached; the caller decides where it goes.
    pub fn import_subtree(&mut self, other: &Tree, node: NodeId) -> NodeId {
        let kind = match other.kind(node) {
            NodeKind::Document => NodeKind::Element {
                name: String::new(),
                attributes: Vec::new(),
            },
            kind => kind.clone(),
        };
        let copy = self.push(kind);
        let mut stack: Vec<(NodeId, NodeId)> = vec![(node, copy)];
        while let Some((source, target)) = stack.pop() {
            for &child in other.children(source) {
                let child_copy = self.push(other.kind(child).clone());
                self.nodes[target.index()].children.push(child_copy);
                self.nodes[child_copy.index()].parent = Some(target);
                stack.push((child, child_copy));
            }
        }
        copy
    }

    /// Deep-copy every child of `node` in `other`, returning detached copies in order.
    pub fn import_children(&mut self, other: &Tree, node: NodeId) -> Vec<NodeId> {
        other
            .children(node)
            .iter()
            .map(|child| self.import_subtree(other, *child))
            .collect()
    }

    /// Copy of the tree holding only the nodes reachable from the root.
    ///
    /// Node ids are renumbered in document order; ids of `self` are not valid in the copy.
    pub fn compacted(&self) -> Tree {
        let mut out = Tree::new();
        let root = out.root();
        for child in out.import_children(self, self.root()) {
            out.nodes[child.index()].parent = Some(root);
            out.nodes[root.index()].children.push(child);
        }
        out
    }
}
