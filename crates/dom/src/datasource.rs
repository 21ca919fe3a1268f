//! Query access to a [`Document`]: the bridge between the arena and the
//! XPath engine.

use crate::document::Document;
use crate::node::{NodeId, NodeKind};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use xtools_xpath1::{DataSourceNode, NodeType, QName};

/// An owned query match. Attributes are not arena nodes, so they are
/// addressed by their element and their position in its attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeHandle {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl NodeHandle {
    /// The arena node: the node itself, or the element owning the attribute.
    pub fn node_id(self) -> NodeId {
        match self {
            NodeHandle::Node(id) | NodeHandle::Attribute(id, _) => id,
        }
    }
}

/// A borrowed view of one node, implementing [`DataSourceNode`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    handle: NodeHandle,
}

impl Document {
    pub fn node_ref(&self, handle: NodeHandle) -> NodeRef<'_> {
        NodeRef { doc: self, handle }
    }
}

impl<'a> NodeRef<'a> {
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn node_id(&self) -> NodeId {
        self.handle.node_id()
    }

    /// Sort key in document order. Attributes sort after their element and
    /// before its children.
    fn order_key(&self) -> (usize, usize) {
        let position = self.doc.position(self.handle.node_id());
        match self.handle {
            NodeHandle::Node(_) => (position, 0),
            NodeHandle::Attribute(_, index) => (position, index + 1),
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for NodeRef<'_> {}

impl Hash for NodeRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl PartialOrd for NodeRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.handle == other.handle {
            return Ordering::Equal;
        }
        self.order_key().cmp(&other.order_key())
    }
}

impl<'a> DataSourceNode<'a> for NodeRef<'a> {
    fn node_type(&self) -> NodeType {
        match self.handle {
            NodeHandle::Attribute(..) => NodeType::Attribute,
            NodeHandle::Node(id) => match self.doc.kind(id) {
                NodeKind::Root => NodeType::Root,
                NodeKind::Element(_) => NodeType::Element,
                NodeKind::Text(_) => NodeType::Text,
                NodeKind::Comment(_) => NodeType::Comment,
                NodeKind::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            },
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        let doc = self.doc;
        match self.handle {
            NodeHandle::Attribute(id, index) => doc.attributes(id).get(index).map(|attr| QName {
                prefix: attr.name.prefix.as_deref(),
                namespace: attr.name.namespace.as_deref(),
                local_part: attr.name.local.as_str(),
            }),
            NodeHandle::Node(id) => match doc.kind(id) {
                NodeKind::Element(data) => Some(QName {
                    prefix: data.name.prefix.as_deref(),
                    namespace: data.name.namespace.as_deref(),
                    local_part: data.name.local.as_str(),
                }),
                NodeKind::ProcessingInstruction { target, .. } => Some(QName::local(target)),
                _ => None,
            },
        }
    }

    fn string_value(&self) -> String {
        match self.handle {
            NodeHandle::Attribute(id, index) => self
                .doc
                .attributes(id)
                .get(index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
            NodeHandle::Node(id) => self.doc.string_value(id),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let doc = self.doc;
        match self.handle {
            NodeHandle::Node(id) => {
                let count = doc.attributes(id).len();
                Box::new((0..count).map(move |index| NodeRef {
                    doc,
                    handle: NodeHandle::Attribute(id, index),
                }))
            }
            NodeHandle::Attribute(..) => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let doc = self.doc;
        match self.handle {
            NodeHandle::Node(id) => Box::new(doc.children(id).iter().map(move |&child| NodeRef {
                doc,
                handle: NodeHandle::Node(child),
            })),
            NodeHandle::Attribute(..) => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        let parent = match self.handle {
            NodeHandle::Attribute(id, _) => Some(id),
            NodeHandle::Node(id) => self.doc.parent(id),
        };
        parent.map(|id| NodeRef {
            doc: self.doc,
            handle: NodeHandle::Node(id),
        })
    }
}
