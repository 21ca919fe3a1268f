//! `xt:extends`: a derived element takes every child its base has and it
//! lacks, keeping its own children for the names it already has.
//!
//! ```xml
//! <table id="base"><a>1</a><b>2</b></table>
//! <table xt:extends="#base"><b>3</b></table>
//! ```
//! leaves the second table with `<a>1</a><b>3</b>`.

use super::PassContext;
use crate::config::DuplicateTags;
use crate::error::{Cycle, Expected, TransformError};
use crate::evaluator::rewrite_id_shorthand;
use crate::namespaces::XT_NS;
use log::debug;
use std::collections::{HashMap, HashSet};
use xtools_dom::{Document, ExpandedName, NodeHandle, NodeId, NodeKind};

/// An element carrying `xt:extends` and the element it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extends {
    pub derived: NodeId,
    pub base: NodeId,
}

/// Resolves every `xt:extends` attribute and merges bases into derived
/// elements, bases first. Nothing is changed when a base cannot be
/// resolved or the relation has a cycle.
pub fn merge_extends(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    let relation = resolve_relation(doc, ctx)?;
    if relation.is_empty() {
        return Ok(());
    }
    check_acyclic(doc, ctx, &relation)?;

    let mut pending = relation;
    while !pending.is_empty() {
        let waiting: HashSet<NodeId> = pending.iter().map(|e| e.derived).collect();
        let (ready, rest): (Vec<Extends>, Vec<Extends>) = pending
            .into_iter()
            .partition(|e| !waiting.contains(&e.base));
        debug!("Merging {} derived elements, {} waiting", ready.len(), rest.len());
        for edge in ready {
            merge_pair(doc, ctx, edge)?;
        }
        pending = rest;
    }
    Ok(())
}

/// Finds the base of every derived element, in document order.
pub fn resolve_relation(
    doc: &Document,
    ctx: &PassContext<'_>,
) -> Result<Vec<Extends>, TransformError> {
    let derived: Vec<NodeId> = doc
        .descendants_or_self(doc.root())
        .into_iter()
        .filter(|&id| doc.attribute(id, Some(XT_NS), "extends").is_some())
        .collect();

    let mut relation = Vec::with_capacity(derived.len());
    for id in derived {
        let query = doc
            .attribute(id, Some(XT_NS), "extends")
            .map(|q| rewrite_id_shorthand(q).into_owned())
            .unwrap_or_default();
        // Bases are looked up from the root; errors point at the derived element.
        let matches = ctx
            .evaluator
            .select(doc, doc.root(), &query)
            .map_err(|e| ctx.evaluation_error(doc, id, &query, e))?;
        match matches.as_slice() {
            [NodeHandle::Node(base)] if doc.is_element(*base) => relation.push(Extends {
                derived: id,
                base: *base,
            }),
            _ => {
                return Err(ctx.cardinality_error(doc, id, &query, Expected::Exactly(1), &matches));
            }
        }
    }
    Ok(relation)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Colour-marking walk over the relation. Every derived element has one
/// base, so each walk is a single path.
fn check_acyclic(
    doc: &Document,
    ctx: &PassContext<'_>,
    relation: &[Extends],
) -> Result<(), TransformError> {
    let bases: HashMap<NodeId, NodeId> = relation.iter().map(|e| (e.derived, e.base)).collect();
    let mut marks: HashMap<NodeId, Mark> = HashMap::new();

    for edge in relation {
        let mut path = Vec::new();
        let mut current = Some(edge.derived);
        while let Some(node) = current {
            match marks.get(&node) {
                Some(Mark::Done) => break,
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|&n| n == node).unwrap_or(0);
                    let members = path[start..]
                        .iter()
                        .map(|&n| ctx.context(doc, n))
                        .collect();
                    return Err(TransformError::Cycle(Cycle(members)));
                }
                None => {
                    marks.insert(node, Mark::InProgress);
                    path.push(node);
                    current = bases.get(&node).copied();
                }
            }
        }
        for node in path {
            marks.insert(node, Mark::Done);
        }
    }
    Ok(())
}

type Key = (Option<String>, String);

fn key_of(name: &ExpandedName) -> Key {
    (name.namespace.clone(), name.local.clone())
}

/// Element children keyed by name, in order of first appearance.
fn index_children(
    doc: &Document,
    ctx: &PassContext<'_>,
    parent: NodeId,
) -> Result<Vec<(Key, NodeId)>, TransformError> {
    let mut indexed: Vec<(Key, NodeId)> = Vec::new();
    for child in doc.element_children(parent) {
        let Some(name) = doc.name(child) else {
            continue;
        };
        let key = key_of(name);
        match indexed.iter_mut().find(|(k, _)| *k == key) {
            None => indexed.push((key, child)),
            Some(slot) => match ctx.duplicate_tags {
                DuplicateTags::LastWins => slot.1 = child,
                DuplicateTags::Reject => {
                    return Err(TransformError::DuplicateTags {
                        context: ctx.context(doc, parent),
                        tag: name.to_string(),
                    });
                }
            },
        }
    }
    Ok(indexed)
}

fn merge_pair(doc: &mut Document, ctx: &PassContext<'_>, edge: Extends) -> Result<(), TransformError> {
    let Extends { derived, base } = edge;
    let base_children = index_children(doc, ctx, base)?;
    let derived_children = index_children(doc, ctx, derived)?;

    let difference: Vec<String> = derived_children
        .iter()
        .filter(|(key, _)| !base_children.iter().any(|(k, _)| k == key))
        .filter_map(|(_, child)| doc.name(*child).map(|n| n.to_string()))
        .collect();
    if !difference.is_empty() {
        return Err(TransformError::SubsetViolation {
            derived: ctx.context(doc, derived),
            base: ctx.context(doc, base),
            difference,
        });
    }

    // Each merged child is followed by the text that followed it.
    let mut merged: Vec<NodeId> = Vec::new();
    for (key, base_child) in &base_children {
        match derived_children.iter().find(|(k, _)| k == key) {
            Some(&(_, own)) => {
                merged.push(own);
                merged.extend(doc.tail(own));
            }
            None => {
                let tail = doc.tail(*base_child);
                merged.push(doc.deep_copy(*base_child));
                merged.extend(tail.into_iter().map(|t| doc.deep_copy(t)));
            }
        }
    }

    let leading = doc.leading_text(derived);
    let dropped = doc
        .remove_children(derived)
        .into_iter()
        .filter(|&n| matches!(doc.kind(n), NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. }))
        .count();
    if dropped > 0 {
        debug!("Dropped {} comments or processing instructions while merging", dropped);
    }
    if !leading.is_empty() {
        doc.append_text(derived, &leading)?;
    }
    for node in merged {
        doc.append_child(derived, node)?;
    }
    Ok(())
}
