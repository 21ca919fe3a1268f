//! Defines the error type shared by every pass of the engine.

use crate::diagnostics::NodeContext;
use itertools::Itertools;
use std::fmt;
use thiserror::Error;
use xtools_dom::DomError;
use xtools_xpath1::XPathError;

/// How many nodes a query had to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(n) => write!(f, "{}", n),
            Expected::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// The rendered members of an `xt:extends` cycle, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(pub Vec<NodeContext>);

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n->...", self.0.iter().join("\n->\n"))
    }
}

/// The matches that broke a cardinality constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matches(pub Vec<String>);

impl fmt::Display for Matches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actual number of nodes: {}", self.0.len())?;
        if !self.0.is_empty() {
            write!(f, "\nnodes:\n{}", self.0.iter().join("\n"))?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("no xpath attribute in element:\n{context}")]
    MissingQuery { context: NodeContext },

    #[error(
        "in element:\n{context}\nxpath `{query}` references invalid number of nodes\nexpected number of nodes: {expected}\n{actual}"
    )]
    Cardinality {
        context: NodeContext,
        query: String,
        expected: Expected,
        actual: Matches,
    },

    #[error("{derived}\nis not subset of\n{base}\ndifference: {{{names}}}", names = .difference.join(", "))]
    SubsetViolation {
        derived: NodeContext,
        base: NodeContext,
        difference: Vec<String>,
    },

    #[error("cycle in extends:\n{0}")]
    Cycle(Cycle),

    #[error("The element has no parent. It might be the root element:\n{context}")]
    OrphanElement { context: NodeContext },

    #[error("element selected for tag hoisting has no tag attribute:\n{context}")]
    MissingTagAttribute { context: NodeContext },

    #[error("tag wrapper has no element child to annotate:\n{context}")]
    EmptyWrapper { context: NodeContext },

    #[error("in element:\n{context}\nfailed to evaluate `{query}`: {source}")]
    Evaluation {
        context: NodeContext,
        query: String,
        #[source]
        source: XPathError,
    },

    #[error("custom function '{0}' is registered more than once")]
    DuplicateFunction(String),

    #[error("element has several children named {tag}:\n{context}")]
    DuplicateTags { context: NodeContext, tag: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),
}
