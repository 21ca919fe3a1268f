//! `xt:append`: copies every node a query selects into the directive.

use super::{PassContext, append_copies, elements_named};
use crate::error::{Expected, TransformError};
use crate::namespaces::XT_NS;
use log::debug;
use xtools_dom::{Document, NodeHandle, NodeId};
use xtools_xpath1::XPathError;

pub fn append_lists(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    for id in elements_named(doc, XT_NS, "append") {
        let query = ctx.directive_query(doc, id)?;
        let matches = ctx.select(doc, id, &query)?;
        if matches.is_empty() {
            return Err(ctx.cardinality_error(doc, id, &query, Expected::AtLeast(1), &matches));
        }
        let nodes: Vec<NodeId> = matches
            .iter()
            .map(|handle| match handle {
                NodeHandle::Node(node) => Ok(*node),
                NodeHandle::Attribute(..) => Err(ctx.evaluation_error(
                    doc,
                    id,
                    &query,
                    XPathError::TypeError("attributes cannot be appended".to_string()),
                )),
            })
            .collect::<Result<_, _>>()?;
        debug!("Appending {} nodes", nodes.len());
        append_copies(doc, id, &nodes)?;
    }
    Ok(())
}
