//! Tag hoisting.
//!
//! Before the transform stage, `<p tag:note="v">` becomes
//! `<tag:note value="v"><p/></tag:note>` so the stage can match on the
//! wrapper. Afterwards every wrapper is dissolved again: its children get
//! the class `tag_note`, the first one also gets `data-tag="v"`.

use super::PassContext;
use crate::error::TransformError;
use crate::namespaces::{TAG_NS, TAG_PREFIX};
use log::{debug, warn};
use xtools_dom::{Document, ExpandedName, NodeId};

/// Hoists the first tag attribute of every element carrying one into a
/// wrapper element.
pub fn wrap_tags(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    let tagged: Vec<NodeId> = doc
        .descendants_or_self(doc.root())
        .into_iter()
        .filter(|&id| doc.attributes(id).iter().any(|a| a.name.in_namespace(TAG_NS)))
        .collect();
    for id in tagged {
        wrap(doc, ctx, id)?;
    }
    Ok(())
}

fn wrap(doc: &mut Document, ctx: &PassContext<'_>, id: NodeId) -> Result<NodeId, TransformError> {
    let missing = |doc: &Document| TransformError::MissingTagAttribute {
        context: ctx.context(doc, id),
    };
    let Some(index) = doc
        .attributes(id)
        .iter()
        .position(|a| a.name.in_namespace(TAG_NS))
    else {
        return Err(missing(doc));
    };
    if doc.parent(id).is_none() {
        return Err(TransformError::OrphanElement {
            context: ctx.context(doc, id),
        });
    }
    let attribute = doc
        .remove_attribute_at(id, index)
        .ok_or_else(|| missing(doc))?;

    let wrapper = doc.create_element(ExpandedName::new(
        TAG_NS,
        &attribute.name.local,
        Some(TAG_PREFIX),
    ));
    doc.set_attribute(wrapper, ExpandedName::local("value"), attribute.value)?;
    doc.set_location(wrapper, doc.location(id).cloned());
    doc.replace(id, wrapper)?;
    doc.append_child(wrapper, id)?;

    let leftover = doc
        .attributes(id)
        .iter()
        .filter(|a| a.name.in_namespace(TAG_NS))
        .count();
    if leftover > 0 {
        warn!(
            "{} more tag attributes left on {}",
            leftover,
            ctx.context(doc, id)
        );
    }
    debug!("Wrapped element in tag:{}", attribute.name.local);
    Ok(wrapper)
}

/// Dissolves every tag wrapper, innermost first, annotating its children.
pub fn flatten_tags(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    let wrappers: Vec<NodeId> = doc
        .descendants_or_self(doc.root())
        .into_iter()
        .filter(|&id| doc.name(id).is_some_and(|n| n.in_namespace(TAG_NS)))
        .collect();
    for id in wrappers.into_iter().rev() {
        flatten(doc, ctx, id)?;
    }
    Ok(())
}

fn flatten(doc: &mut Document, ctx: &PassContext<'_>, id: NodeId) -> Result<(), TransformError> {
    // A wrapper at the top of the document would leave several roots.
    let Some(parent) = doc.parent(id).filter(|&p| doc.is_element(p)) else {
        return Err(TransformError::OrphanElement {
            context: ctx.context(doc, id),
        });
    };
    let elements: Vec<NodeId> = doc.element_children(id).collect();
    let Some(&first) = elements.first() else {
        return Err(TransformError::EmptyWrapper {
            context: ctx.context(doc, id),
        });
    };

    let class = format!("tag_{}", doc.name(id).map(|n| n.local.as_str()).unwrap_or_default());
    let value = doc.attribute(id, None, "value").unwrap_or_default().to_string();
    for &element in &elements {
        doc.add_class(element, &class)?;
    }
    doc.set_attribute(first, ExpandedName::local("data-tag"), value)?;

    let index = doc.child_index(id).unwrap_or(0);
    let children = doc.remove_children(id);
    doc.detach(id);
    for (offset, child) in children.into_iter().enumerate() {
        doc.insert_child(parent, index + offset, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::{body, evaluator, parse, pass_context};

    const HEAD: &str = r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags">"#;

    fn doc_with(xml: &str) -> Document {
        parse(&format!("{}{}</form>", HEAD, xml))
    }

    #[test]
    fn test_wrap_moves_first_tag_attribute_to_wrapper() {
        let mut doc = doc_with(r#"<a/><p id="x" tag:note="v" tag:other="w">t</p><b/>"#);
        let ev = evaluator();
        wrap_tags(&mut doc, &pass_context(&ev)).unwrap();
        assert_eq!(
            body(&doc),
            r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags"><a/><tag:note value="v"><p id="x" tag:other="w">t</p></tag:note><b/></form>"#
        );
    }

    #[test]
    fn test_wrap_then_flatten_round_trip() {
        let mut doc = doc_with(r#"<a/> before <p class="c" tag:foo="v"><i>1</i> mid <j>2</j></p> after <b/>"#);
        let ev = evaluator();
        let ctx = pass_context(&ev);
        wrap_tags(&mut doc, &ctx).unwrap();

        // A stage would replace the wrapped element by its contents.
        let wrapper = doc
            .descendants_or_self(doc.root())
            .into_iter()
            .find(|&n| doc.is_named(n, Some(TAG_NS), "foo"))
            .unwrap();
        let p = doc.element_children(wrapper).next().unwrap();
        for child in doc.remove_children(p) {
            doc.append_child(wrapper, child).unwrap();
        }
        doc.detach(p);

        flatten_tags(&mut doc, &ctx).unwrap();
        assert_eq!(
            body(&doc),
            r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags"><a/> before <i class="tag_foo" data-tag="v">1</i> mid <j class="tag_foo">2</j> after <b/></form>"#
        );
    }

    #[test]
    fn test_flatten_keeps_existing_classes() {
        let mut doc = doc_with(r#"<p tag:foo="v" class="x y">t</p>"#);
        let ev = evaluator();
        let ctx = pass_context(&ev);
        wrap_tags(&mut doc, &ctx).unwrap();
        flatten_tags(&mut doc, &ctx).unwrap();
        assert_eq!(
            body(&doc),
            r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags"><p class="x y tag_foo" data-tag="v">t</p></form>"#
        );
    }

    #[test]
    fn test_nested_wrappers_flatten_innermost_first() {
        let mut doc = doc_with(r#"<div tag:outer="o"><p tag:inner="i">t</p></div>"#);
        let ev = evaluator();
        let ctx = pass_context(&ev);
        wrap_tags(&mut doc, &ctx).unwrap();
        flatten_tags(&mut doc, &ctx).unwrap();
        assert_eq!(
            body(&doc),
            r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags"><div class="tag_outer" data-tag="o"><p class="tag_inner" data-tag="i">t</p></div></form>"#
        );
    }

    #[test]
    fn test_missing_value_gives_empty_data_tag() {
        let mut doc = doc_with(r#"<tag:box><p/><q/></tag:box>"#);
        let ev = evaluator();
        flatten_tags(&mut doc, &pass_context(&ev)).unwrap();
        assert_eq!(
            body(&doc),
            r#"<form xmlns:tag="http://ki.ujep.cz/ns/xtags"><p class="tag_box" data-tag=""/><q class="tag_box"/></form>"#
        );
    }

    #[test]
    fn test_flatten_failures() {
        let ev = evaluator();
        let ctx = pass_context(&ev);

        let mut doc = doc_with(r#"<tag:box value="v">only text</tag:box>"#);
        assert!(matches!(
            flatten_tags(&mut doc, &ctx).unwrap_err(),
            TransformError::EmptyWrapper { .. }
        ));

        let mut doc = parse(r#"<tag:box xmlns:tag="http://ki.ujep.cz/ns/xtags"><p/></tag:box>"#);
        let err = flatten_tags(&mut doc, &ctx).unwrap_err();
        assert!(matches!(err, TransformError::OrphanElement { .. }));
        assert!(err.to_string().starts_with("The element has no parent."));
    }

    #[test]
    fn test_wrap_failures() {
        let ev = evaluator();
        let ctx = pass_context(&ev);
        let mut doc = doc_with("<p/>");
        let p = doc.element_children(doc.document_element().unwrap()).next().unwrap();
        assert!(matches!(
            wrap(&mut doc, &ctx, p).unwrap_err(),
            TransformError::MissingTagAttribute { .. }
        ));

        let mut doc = doc_with("");
        let detached = doc.create_element(ExpandedName::local("p"));
        doc.set_attribute(detached, ExpandedName::new(TAG_NS, "x", Some("tag")), "v")
            .unwrap();
        assert!(matches!(
            wrap(&mut doc, &ctx, detached).unwrap_err(),
            TransformError::OrphanElement { .. }
        ));
    }
}
