use crate::error::TransformError;
use crate::functions::FunctionRegistry;
use xtools_dom::Document;

/// The declarative rewrite that runs between hoisting tags into wrappers and
/// flattening them again.
///
/// A stage receives the resolved document and the custom functions the
/// directives could call, and returns the document to flatten.
pub trait TransformStage {
    fn transform(
        &self,
        document: Document,
        functions: &FunctionRegistry,
    ) -> Result<Document, TransformError>;
}

/// Returns the document unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStage;

impl TransformStage for IdentityStage {
    fn transform(
        &self,
        document: Document,
        _functions: &FunctionRegistry,
    ) -> Result<Document, TransformError> {
        Ok(document)
    }
}

impl<F> TransformStage for F
where
    F: Fn(Document, &FunctionRegistry) -> Result<Document, TransformError>,
{
    fn transform(
        &self,
        document: Document,
        functions: &FunctionRegistry,
    ) -> Result<Document, TransformError> {
        self(document, functions)
    }
}
