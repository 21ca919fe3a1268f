//! Short, single-line descriptions of nodes for error messages.
//!
//! A context reads `[form.xml:12]<xt:string idref="p1"/>`: the source location
//! followed by the serialized node with namespace declarations removed,
//! whitespace collapsed and the whole cut to a fixed width.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use xtools_dom::{Document, NodeHandle, NodeId, NodeKind, SourceLocation};

pub const DEFAULT_SNIPPET_WIDTH: usize = 80;

static XMLNS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xmlns(:[A-Za-z_][\w\-.]*)?="[^"]*""#).expect("BUG: invalid XMLNS_RE regex literal")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("BUG: invalid WHITESPACE_RE regex literal"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    location: Option<SourceLocation>,
    rendered: String,
}

impl NodeContext {
    /// Describes an element or other arena node.
    pub fn of_node(doc: &Document, id: NodeId, width: usize) -> Self {
        Self::of(doc, NodeHandle::Node(id), width)
    }

    pub fn of(doc: &Document, handle: NodeHandle, width: usize) -> Self {
        let location = doc.location(handle.node_id()).cloned();
        let snippet = snippet(doc, handle);
        let prefix = match &location {
            Some(loc) => format!("[{}:{}]", loc.origin, loc.line),
            None => "[?:?]".to_string(),
        };
        let text = format!("{}{}", prefix, snippet);
        let rendered = if text.chars().count() > width {
            let cut: String = text.chars().take(width).collect();
            format!("{}...", cut)
        } else {
            text
        };
        Self { location, rendered }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

impl fmt::Display for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

fn snippet(doc: &Document, handle: NodeHandle) -> String {
    let raw = match handle {
        NodeHandle::Attribute(id, index) => doc
            .attributes(id)
            .get(index)
            .map(|attr| format!("@{}=\"{}\"", attr.name.qualified(), attr.value))
            .unwrap_or_default(),
        NodeHandle::Node(id) => match doc.kind(id) {
            NodeKind::Root => "/".to_string(),
            NodeKind::Text(text) => text.clone(),
            _ => doc.node_to_xml(id).unwrap_or_else(|e| {
                log::warn!("Could not serialize node for diagnostics: {}", e);
                doc.name(id)
                    .map(|n| format!("<{}>", n.qualified()))
                    .unwrap_or_default()
            }),
        },
    };
    let stripped = XMLNS_RE.replace_all(&raw, "");
    WHITESPACE_RE.replace_all(&stripped, " ").into_owned()
}
