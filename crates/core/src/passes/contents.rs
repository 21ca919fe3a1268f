//! `xt:contents`: copies the children of one other node into the directive.

use super::{PassContext, append_copies, elements_named};
use crate::error::{Expected, TransformError};
use crate::namespaces::XT_NS;
use log::debug;
use xtools_dom::{Document, NodeHandle, NodeKind};
use xtools_xpath1::XPathError;

pub fn replace_contents(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    for id in elements_named(doc, XT_NS, "contents") {
        let query = ctx.directive_query(doc, id)?;
        let matches = ctx.select(doc, id, &query)?;
        let source = match matches.as_slice() {
            [NodeHandle::Node(source)] => *source,
            [NodeHandle::Attribute(..)] => {
                return Err(ctx.evaluation_error(
                    doc,
                    id,
                    &query,
                    XPathError::TypeError("an attribute has no contents to copy".to_string()),
                ));
            }
            _ => {
                return Err(ctx.cardinality_error(doc, id, &query, Expected::Exactly(1), &matches));
            }
        };

        // Every non-text child, each followed by its trailing text.
        let mut copied = Vec::new();
        for &child in doc.children(source) {
            if matches!(doc.kind(child), NodeKind::Text(_)) {
                continue;
            }
            copied.push(child);
            copied.extend(doc.tail(child));
        }
        debug!("Copying {} nodes into xt:contents", copied.len());
        let leading = doc.leading_text(source);
        append_copies(doc, id, &copied)?;
        if !leading.is_empty() {
            doc.set_leading_text(id, &leading)?;
        }
    }
    Ok(())
}
