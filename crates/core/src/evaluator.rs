//! Evaluates queries written in directive attributes.

use crate::functions::FunctionRegistry;
use log::info;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;
use xtools_dom::{Document, NodeHandle, NodeId};
use xtools_xpath1::engine::format_number;
use xtools_xpath1::{DataSourceNode, EvaluationContext, XPathError, XPathValue, evaluate, parse_expression};

static ID_SHORTHAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([\w:-]+)").expect("BUG: invalid ID_SHORTHAND_RE regex literal")
});

/// Rewrites a leading `#identifier` into a document-wide lookup by `id`:
/// `#p1/name` becomes `//*[@id='p1']/name`.
pub fn rewrite_id_shorthand(query: &str) -> Cow<'_, str> {
    ID_SHORTHAND_RE.replace(query, "//*[@id='$1']")
}

/// A query result detached from the document borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    NodeSet(Vec<NodeHandle>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl QueryValue {
    /// Converts the value to a string with the XPath `string()` rules.
    pub fn into_string(self, doc: &Document) -> String {
        match self {
            QueryValue::NodeSet(nodes) => nodes
                .first()
                .map(|&n| doc.node_ref(n).string_value())
                .unwrap_or_default(),
            QueryValue::String(s) => s,
            QueryValue::Number(n) => format_number(n),
            QueryValue::Boolean(b) => b.to_string(),
        }
    }
}

/// Compiles and runs queries with a fixed set of prefix bindings and custom
/// functions.
#[derive(Debug, Clone)]
pub struct QueryEvaluator {
    namespaces: HashMap<String, String>,
    functions: FunctionRegistry,
}

impl QueryEvaluator {
    pub fn new(namespaces: HashMap<String, String>, functions: FunctionRegistry) -> Self {
        Self {
            namespaces,
            functions,
        }
    }

    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Evaluates `query` with `context` as the context node. The query is
    /// used as given; callers apply [`rewrite_id_shorthand`] themselves.
    pub fn evaluate(
        &self,
        doc: &Document,
        context: NodeId,
        query: &str,
    ) -> Result<QueryValue, XPathError> {
        info!(target: "xtools::query", "{}", query);
        let expr = parse_expression(query)?;
        let context_node = doc.node_ref(NodeHandle::Node(context));
        let root_node = doc.node_ref(NodeHandle::Node(doc.top(context)));
        let e_ctx = EvaluationContext::new(
            context_node,
            root_node,
            &self.namespaces,
            Some(&self.functions),
        );
        Ok(match evaluate(&expr, &e_ctx)? {
            XPathValue::NodeSet(nodes) => {
                QueryValue::NodeSet(nodes.iter().map(|n| n.handle()).collect())
            }
            XPathValue::String(s) => QueryValue::String(s),
            XPathValue::Number(n) => QueryValue::Number(n),
            XPathValue::Boolean(b) => QueryValue::Boolean(b),
        })
    }

    /// Evaluates a query that has to select nodes.
    pub fn select(
        &self,
        doc: &Document,
        context: NodeId,
        query: &str,
    ) -> Result<Vec<NodeHandle>, XPathError> {
        match self.evaluate(doc, context, query)? {
            QueryValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "`{}` selects {:?}, not a node-set",
                query, other
            ))),
        }
    }
}
