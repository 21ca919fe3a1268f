//! Strips inline presentation from a finished document.

use log::debug;
use xtools_dom::{Document, NodeId};

/// Removes every `style` element and every unqualified `style` attribute,
/// whatever namespace the element is in.
pub fn destyle(doc: &mut Document) {
    let nodes: Vec<NodeId> = doc.descendants_or_self(doc.root());
    let mut elements = 0;
    let mut attributes = 0;
    for id in nodes {
        let Some(name) = doc.name(id) else {
            continue;
        };
        if name.local == "style" {
            doc.detach(id);
            elements += 1;
        } else if doc.remove_attribute(id, None, "style").is_some() {
            attributes += 1;
        }
    }
    debug!(
        "Removed {} style elements and {} style attributes",
        elements, attributes
    );
}
