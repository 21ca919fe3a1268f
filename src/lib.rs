//! xtools resolves template directives in XML documents.
//!
//! This crate re-exports the engine from `xtools-core`, the document model
//! from `xtools-dom` and the query engine from `xtools-xpath1`, and holds the
//! command line front end.

pub mod cli;

pub use xtools_core::{
    CustomFunction, DuplicateTags, FunctionContext, FunctionError, FunctionRegistry,
    IdentityStage, NodeContext, QueryEvaluator, QueryValue, TransformError, TransformStage,
    Transformer, TransformerBuilder, TransformerConfig, aname, builtin_functions, namespaces,
    rewrite_id_shorthand,
};
pub use xtools_dom::{Document, DomError, ExpandedName, NodeHandle, NodeId, NodeRef};
pub use xtools_xpath1 as xpath;
