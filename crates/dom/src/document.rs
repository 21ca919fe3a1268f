//! The mutable document arena.
//!
//! Nodes are never freed: detaching a node only unlinks it from its parent,
//! so every [`NodeId`] handed out stays valid for the life of the document.
//! Passes rely on that when they snapshot query results before mutating.

use crate::error::DomError;
use crate::node::{
    Attribute, ElementData, ExpandedName, NodeData, NodeId, NodeKind, SourceLocation,
};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    origin: Option<String>,
    /// Document-order rank of every node, built on first use and dropped by
    /// any mutable access to a node.
    order: OnceLock<Vec<usize>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only its root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Root)],
            origin: None,
            order: OnceLock::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The name the document was loaded from, if any.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn set_origin(&mut self, origin: Option<String>) {
        self.origin = origin;
    }

    /// The first element child of the root.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.order.take();
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.order.take();
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    // --- Inspection ---

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.data(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.data_mut(id).kind {
            NodeKind::Element(data) => Ok(data),
            other => Err(DomError::Structure(format!(
                "expected an element, found {:?}",
                other
            ))),
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&ExpandedName> {
        self.element(id).map(|e| &e.name)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Whether `id` is an element with the given namespace and local name.
    pub fn is_named(&self, id: NodeId, namespace: Option<&str>, local: &str) -> bool {
        self.name(id).is_some_and(|n| n.matches(namespace, local))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    /// Position of `id` among its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// The topmost ancestor of `id`: the root for attached nodes, the top of
    /// the detached subtree otherwise.
    pub fn top(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Rank of `id` in document order. The tree under the root comes first,
    /// then each detached subtree in the order its top node was created.
    pub fn position(&self, id: NodeId) -> usize {
        self.order.get_or_init(|| self.rank_nodes())[id.0]
    }

    fn rank_nodes(&self) -> Vec<usize> {
        let mut ranks = vec![0; self.nodes.len()];
        let mut next = 0;
        let tops = (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| self.parent(id).is_none());
        for top in tops {
            for node in self.descendants_or_self(top) {
                ranks[node.0] = next;
                next += 1;
            }
        }
        ranks
    }

    pub fn location(&self, id: NodeId) -> Option<&SourceLocation> {
        self.data(id).location.as_ref()
    }

    pub fn set_location(&mut self, id: NodeId, location: Option<SourceLocation>) {
        self.data_mut(id).location = location;
    }

    /// Text content for text nodes, the concatenated descendant text for
    /// elements and the root.
    pub fn string_value(&self, id: NodeId) -> String {
        match &self.data(id).kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
            NodeKind::ProcessingInstruction { value, .. } => value.clone().unwrap_or_default(),
            NodeKind::Root | NodeKind::Element(_) => {
                let mut out = String::new();
                for node in self.descendants_or_self(id) {
                    if let NodeKind::Text(text) = &self.data(node).kind {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    /// `id` followed by all its descendants in document order.
    pub fn descendants_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text nodes that precede the first non-text child.
    pub fn leading_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            match &self.data(child).kind {
                NodeKind::Text(text) => out.push_str(text),
                _ => break,
            }
        }
        out
    }

    /// The text nodes that directly follow `id` among its siblings.
    pub fn tail(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let Some(index) = self.child_index(id) else {
            return Vec::new();
        };
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .take_while(|&c| matches!(self.data(c).kind, NodeKind::Text(_)))
            .collect()
    }

    // --- Attributes ---

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.data(id).kind {
            NodeKind::Element(data) => &data.attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.element(id)
            .and_then(|data| data.attribute(namespace, local))
    }

    /// Sets an attribute, replacing the value of an existing one with the same
    /// namespace and local name.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: ExpandedName,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let value = value.into();
        let data = self.element_mut(id)?;
        match data
            .attributes
            .iter_mut()
            .find(|a| a.name.key() == name.key())
        {
            Some(existing) => existing.value = value,
            None => data.attributes.push(Attribute { name, value }),
        }
        Ok(())
    }

    pub fn remove_attribute(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        local: &str,
    ) -> Option<Attribute> {
        let data = self.element_mut(id).ok()?;
        let index = data
            .attributes
            .iter()
            .position(|a| a.name.matches(namespace, local))?;
        Some(data.attributes.remove(index))
    }

    pub fn remove_attribute_at(&mut self, id: NodeId, index: usize) -> Option<Attribute> {
        let data = self.element_mut(id).ok()?;
        (index < data.attributes.len()).then(|| data.attributes.remove(index))
    }

    /// Appends a whitespace-separated token to the `class` attribute.
    pub fn add_class(&mut self, id: NodeId, token: &str) -> Result<(), DomError> {
        let class = match self.attribute(id, None, "class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, token),
            _ => token.to_string(),
        };
        self.set_attribute(id, ExpandedName::local("class"), class)
    }

    // --- Construction ---

    pub fn create_element(&mut self, name: ExpandedName) -> NodeId {
        self.push(NodeData::new(NodeKind::Element(ElementData::new(name))))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Comment(text.into())))
    }

    pub fn create_processing_instruction(&mut self, target: &str, value: Option<&str>) -> NodeId {
        self.push(NodeData::new(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            value: value.map(str::to_string),
        }))
    }

    pub(crate) fn create_element_data(&mut self, data: ElementData) -> NodeId {
        self.push(NodeData::new(NodeKind::Element(data)))
    }

    // --- Mutation ---

    /// Unlinks `id` from its parent. The node and its subtree stay usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.data_mut(id).parent.take() {
            self.data_mut(parent).children.retain(|&c| c != id);
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !matches!(
            self.data(parent).kind,
            NodeKind::Root | NodeKind::Element(_)
        ) {
            return Err(DomError::Structure(format!(
                "node {:?} cannot have children",
                parent
            )));
        }
        if matches!(self.data(child).kind, NodeKind::Root) {
            return Err(DomError::Structure(
                "the root node cannot be inserted".to_string(),
            ));
        }
        let mut current = Some(parent);
        while let Some(node) = current {
            if node == child {
                return Err(DomError::Structure(format!(
                    "node {:?} cannot be inserted into its own subtree",
                    child
                )));
            }
            current = self.parent(node);
        }
        Ok(())
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Moves `child` to position `index` of `parent`'s children, clamped to the end.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let children = &mut self.data_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Appends text, merging it into a trailing text node when there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<(), DomError> {
        if let Some(&last) = self.children(parent).last()
            && let NodeKind::Text(existing) = &mut self.data_mut(last).kind
        {
            existing.push_str(text);
            return Ok(());
        }
        let node = self.create_text(text);
        self.append_child(parent, node)
    }

    /// Puts `new` where `old` is and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self
            .parent(old)
            .ok_or_else(|| DomError::Structure(format!("node {:?} has no parent", old)))?;
        self.check_insert(parent, new)?;
        self.detach(new);
        let index = self
            .child_index(old)
            .ok_or_else(|| DomError::Structure(format!("node {:?} is not linked", old)))?;
        self.data_mut(parent).children[index] = new;
        self.data_mut(new).parent = Some(parent);
        self.data_mut(old).parent = None;
        Ok(())
    }

    /// Detaches every child of `id` and returns them in order.
    pub fn remove_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.data_mut(id).children);
        for &child in &children {
            self.data_mut(child).parent = None;
        }
        children
    }

    /// Replaces the text before the first non-text child. Empty text removes it.
    pub fn set_leading_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let leading: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .take_while(|&c| matches!(self.data(c).kind, NodeKind::Text(_)))
            .collect();
        for node in leading {
            self.detach(node);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.insert_child(id, 0, node)?;
        }
        Ok(())
    }

    /// Copies the subtree under `id` into new, detached nodes.
    /// Source locations are copied along so diagnostics still point at the original.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let source = self.data(id);
        let mut data = NodeData::new(source.kind.clone());
        data.location = source.location.clone();
        let children = source.children.clone();
        let copy = self.push(data);
        for child in children {
            let child_copy = self.deep_copy(child);
            self.data_mut(child_copy).parent = Some(copy);
            self.data_mut(copy).children.push(child_copy);
        }
        copy
    }
}
