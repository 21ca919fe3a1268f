//! Node enumeration along each axis.
//!
//! Forward axes come out in document order. Reverse axes (`ancestor`,
//! `ancestor-or-self`, `preceding-sibling`, `preceding`) list the nearest
//! node first, which is the order positional predicates count in.

use crate::ast::Axis;
use crate::datasource::{DataSourceNode, NodeType};
use std::iter;

pub fn along<'a, N: DataSourceNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::SelfNode => vec![node],
        Axis::Child => node.children().collect(),
        Axis::Attribute => node.attributes().collect(),
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Descendant => descendants(node),
        Axis::DescendantOrSelf => iter::once(node).chain(descendants(node)).collect(),
        Axis::Ancestor => ancestors(node).collect(),
        Axis::AncestorOrSelf => iter::once(node).chain(ancestors(node)).collect(),
        Axis::FollowingSibling => following_siblings(node),
        Axis::PrecedingSibling => preceding_siblings(node),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
    }
}

fn ancestors<'a, N: DataSourceNode<'a>>(node: N) -> impl Iterator<Item = N> {
    iter::successors(node.parent(), |current| current.parent())
}

/// Pre-order walk below `node`.
pub fn descendants<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut found = Vec::new();
    let mut pending: Vec<N> = node.children().collect();
    pending.reverse();
    while let Some(next) = pending.pop() {
        found.push(next);
        let mark = pending.len();
        pending.extend(next.children());
        pending[mark..].reverse();
    }
    found
}

// Attributes are not among their element's children, so they have no
// siblings: the position lookup fails and both axes come out empty.
fn following_siblings<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    parent
        .children()
        .skip_while(|sibling| *sibling != node)
        .skip(1)
        .collect()
}

fn preceding_siblings<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    let mut before: Vec<N> = parent.children().take_while(|sibling| *sibling != node).collect();
    if before.len() == parent.children().count() {
        return Vec::new();
    }
    before.reverse();
    before
}

fn following<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut found = Vec::new();
    // Everything inside an attribute's element comes after the attribute.
    if node.node_type() == NodeType::Attribute
        && let Some(owner) = node.parent()
    {
        found.extend(descendants(owner));
    }
    for current in iter::once(node).chain(ancestors(node)) {
        for sibling in following_siblings(current) {
            found.push(sibling);
            found.extend(descendants(sibling));
        }
    }
    found
}

fn preceding<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut found = Vec::new();
    for current in iter::once(node).chain(ancestors(node)) {
        for sibling in preceding_siblings(current) {
            found.extend(descendants(sibling).into_iter().rev());
            found.push(sibling);
        }
    }
    found
}
