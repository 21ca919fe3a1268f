//! A namespace-aware XPath 1.0 engine.
//!
//! Expressions are parsed once with [`parse_expression`] and evaluated with
//! [`evaluate`] against any tree that implements [`DataSourceNode`]. Prefixed
//! names are resolved through the bindings carried by the
//! [`EvaluationContext`], and prefixed function calls are handed to an
//! [`ExtensionResolver`].

pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, PathOrigin, Step};
pub use datasource::{DataSourceNode, NodeType, QName};
pub use engine::{EvaluationContext, XPathValue, evaluate};
pub use error::XPathError;
pub use functions::ExtensionResolver;
pub use parser::parse_expression;
