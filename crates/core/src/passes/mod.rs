//! The rewrite passes run by the [`Transformer`](crate::Transformer).
//!
//! Each pass snapshots the nodes it works on in document order before it
//! changes anything, then rewrites the tree in place.

pub mod append;
pub mod contents;
pub mod hoist;
pub mod inheritance;
pub mod strings;

use crate::config::DuplicateTags;
use crate::diagnostics::NodeContext;
use crate::error::{Expected, Matches, TransformError};
use crate::evaluator::{QueryEvaluator, rewrite_id_shorthand};
use xtools_dom::{Document, NodeHandle, NodeId};
use xtools_xpath1::XPathError;

/// Shared state handed to every pass.
pub struct PassContext<'t> {
    pub evaluator: &'t QueryEvaluator,
    pub snippet_width: usize,
    pub duplicate_tags: DuplicateTags,
}

impl PassContext<'_> {
    pub fn context(&self, doc: &Document, id: NodeId) -> NodeContext {
        NodeContext::of_node(doc, id, self.snippet_width)
    }

    pub fn evaluation_error(
        &self,
        doc: &Document,
        id: NodeId,
        query: &str,
        source: XPathError,
    ) -> TransformError {
        TransformError::Evaluation {
            context: self.context(doc, id),
            query: query.to_string(),
            source,
        }
    }

    pub fn cardinality_error(
        &self,
        doc: &Document,
        id: NodeId,
        query: &str,
        expected: Expected,
        actual: &[NodeHandle],
    ) -> TransformError {
        let matches = actual
            .iter()
            .map(|&handle| NodeContext::of(doc, handle, self.snippet_width).to_string())
            .collect();
        TransformError::Cardinality {
            context: self.context(doc, id),
            query: query.to_string(),
            expected,
            actual: Matches(matches),
        }
    }

    /// Reads the `xpath` attribute of a directive and expands `#id` shorthand.
    pub fn directive_query(&self, doc: &Document, id: NodeId) -> Result<String, TransformError> {
        doc.attribute(id, None, "xpath")
            .map(|query| rewrite_id_shorthand(query).into_owned())
            .ok_or_else(|| TransformError::MissingQuery {
                context: self.context(doc, id),
            })
    }

    /// Selects nodes for a directive, wrapping failures with its context.
    pub fn select(
        &self,
        doc: &Document,
        id: NodeId,
        query: &str,
    ) -> Result<Vec<NodeHandle>, TransformError> {
        self.evaluator
            .select(doc, id, query)
            .map_err(|e| self.evaluation_error(doc, id, query, e))
    }
}

/// Elements named `{namespace}local`, in document order.
pub fn elements_named(doc: &Document, namespace: &str, local: &str) -> Vec<NodeId> {
    doc.descendants_or_self(doc.root())
        .into_iter()
        .filter(|&id| doc.is_named(id, Some(namespace), local))
        .collect()
}

/// Moves the copies of `nodes` to the end of `parent`'s children.
pub(crate) fn append_copies(
    doc: &mut Document,
    parent: NodeId,
    nodes: &[NodeId],
) -> Result<(), TransformError> {
    let copies: Vec<NodeId> = nodes.iter().map(|&node| doc.deep_copy(node)).collect();
    for copy in copies {
        doc.append_child(parent, copy)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::functions::{FunctionRegistry, builtin_functions};
    use crate::namespaces::{AK_NS, XHTML_NS, with_reserved};

    pub fn evaluator() -> QueryEvaluator {
        let namespaces = with_reserved([
            ("ak".to_string(), AK_NS.to_string()),
            ("h".to_string(), XHTML_NS.to_string()),
        ]);
        QueryEvaluator::new(
            namespaces,
            FunctionRegistry::new(builtin_functions()).unwrap(),
        )
    }

    pub fn pass_context(evaluator: &QueryEvaluator) -> PassContext<'_> {
        PassContext {
            evaluator,
            snippet_width: 80,
            duplicate_tags: DuplicateTags::Reject,
        }
    }

    pub fn parse(xml: &str) -> Document {
        let _ = env_logger::builder().is_test(true).try_init();
        Document::parse_str(xml, Some("test.xml")).unwrap()
    }

    /// The serialized document element.
    pub fn body(doc: &Document) -> String {
        doc.node_to_xml(doc.document_element().unwrap()).unwrap()
    }

    pub fn find(doc: &Document, id: &str) -> NodeId {
        doc.descendants_or_self(doc.root())
            .into_iter()
            .find(|&n| doc.attribute(n, None, "id") == Some(id))
            .unwrap()
    }
}
