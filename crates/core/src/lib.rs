//! The directive resolution engine.
//!
//! A [`Transformer`] rewrites a [`Document`](xtools_dom::Document) in place:
//!
//! 1. `xt:extends` merges base elements into derived ones,
//! 2. `xt:string` computes text and links,
//! 3. `xt:contents` copies the contents of another node,
//! 4. `xt:append` copies whole nodes,
//! 5. `tag:*` attributes are hoisted into wrapper elements.
//!
//! A [`TransformStage`] then runs over the result, after which the wrappers are
//! flattened into `class`/`data-tag` annotations.
//!
//! ```no_run
//! use xtools_core::{IdentityStage, TransformerBuilder};
//! use xtools_dom::Document;
//!
//! let transformer = TransformerBuilder::new()
//!     .with_namespace("ak", "http://ki.ujep.cz/ns/akreditace")
//!     .with_builtin_functions()
//!     .build()?;
//! let doc = Document::parse_file("form.xml")?;
//! let resolved = transformer.process(doc, &IdentityStage)?;
//! println!("{}", resolved.to_xml_string()?);
//! # Ok::<(), xtools_core::TransformError>(())
//! ```

pub mod config;
pub mod destyle;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod namespaces;
pub mod passes;
pub mod stage;
pub mod transformer;

pub use config::{DuplicateTags, TransformerConfig};
pub use diagnostics::NodeContext;
pub use error::TransformError;
pub use evaluator::{QueryEvaluator, QueryValue, rewrite_id_shorthand};
pub use functions::{CustomFunction, FunctionContext, FunctionError, FunctionRegistry, aname, builtin_functions};
pub use stage::{IdentityStage, TransformStage};
pub use transformer::{Transformer, TransformerBuilder};
