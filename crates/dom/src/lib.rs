//! A mutable XML tree for in-place rewriting.
//!
//! [`Document`] is an arena of nodes addressed by [`NodeId`]. Documents are
//! loaded with `roxmltree`, which records the source line of every element,
//! and written back with `quick-xml`. [`NodeRef`] exposes the tree to the
//! XPath engine in `xtools-xpath1`.

pub mod datasource;
pub mod document;
pub mod error;
pub mod node;
pub mod parse;
pub mod serialize;

pub use datasource::{NodeHandle, NodeRef};
pub use document::Document;
pub use error::DomError;
pub use node::{Attribute, ElementData, ExpandedName, NodeId, NodeKind, SourceLocation};
