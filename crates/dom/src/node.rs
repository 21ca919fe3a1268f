//! Node records stored in the [`Document`](crate::Document) arena.

use std::fmt;

/// Opaque handle of a node inside one [`Document`](crate::Document).
///
/// Identity is the handle itself: two structurally equal elements are still
/// different nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A namespace-qualified name plus the prefix it prefers when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub namespace: Option<String>,
    pub local: String,
    pub prefix: Option<String>,
}

impl ExpandedName {
    /// A name in no namespace.
    pub fn local(local: &str) -> Self {
        Self {
            namespace: None,
            local: local.to_string(),
            prefix: None,
        }
    }

    pub fn new(namespace: &str, local: &str, prefix: Option<&str>) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            local: local.to_string(),
            prefix: prefix.map(str::to_string),
        }
    }

    /// Compares namespace and local name, ignoring the prefix.
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local == local
    }

    /// Whether the name lives in `namespace`.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// The name as written in markup, `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Namespace and local name only, used as a key when comparing child tags.
    pub fn key(&self) -> (Option<&str>, &str) {
        (self.namespace.as_deref(), self.local.as_str())
    }
}

/// Clark notation: `{namespace}local`.
impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: ExpandedName,
    pub value: String,
}

/// Where an element started in its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The last path component of the input, e.g. `form.xml`.
    pub origin: String,
    /// 1-based line number.
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: ExpandedName,
    pub attributes: Vec<Attribute>,
    /// Namespace declarations written on this element in the source,
    /// `(prefix, uri)` with `None` for the default namespace.
    pub namespace_decls: Vec<(Option<String>, String)>,
}

impl ElementData {
    pub fn new(name: ExpandedName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespace_decls: Vec::new(),
        }
    }

    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(namespace, local))
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, value: Option<String> },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) location: Option<SourceLocation>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            location: None,
        }
    }
}
