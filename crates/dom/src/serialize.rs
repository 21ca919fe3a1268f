//! Writing documents back out with `quick-xml`.
//!
//! Namespace declarations are produced on demand: an element declares the
//! bindings its own name and attributes need unless an ancestor already did.

use crate::document::Document;
use crate::error::DomError;
use crate::node::{ElementData, ExpandedName, NodeId, NodeKind};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::io::Write;
use xtools_xpath1::engine::XML_NAMESPACE;

type Binding = (Option<String>, String);

impl Document {
    /// Serializes the whole document with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, DomError> {
        let mut buffer = Vec::new();
        self.write_xml(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn write_xml<W: Write>(&self, out: W) -> Result<(), DomError> {
        let mut serializer = Serializer::new(self, out);
        serializer
            .writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        serializer.writer.get_mut().write_all(b"\n")?;
        for &child in self.children(self.root()) {
            serializer.write_node(child)?;
        }
        serializer.writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    /// Serializes one node and its subtree, without a declaration.
    pub fn node_to_xml(&self, id: NodeId) -> Result<String, DomError> {
        let mut buffer = Vec::new();
        let mut serializer = Serializer::new(self, &mut buffer);
        serializer.write_node(id)?;
        drop(serializer);
        Ok(String::from_utf8(buffer)?)
    }
}

struct Serializer<'d, W: Write> {
    doc: &'d Document,
    writer: Writer<W>,
    scopes: Vec<Vec<Binding>>,
}

impl<'d, W: Write> Serializer<'d, W> {
    fn new(doc: &'d Document, out: W) -> Self {
        Self {
            doc,
            writer: Writer::new(out),
            scopes: Vec::new(),
        }
    }

    fn write_node(&mut self, id: NodeId) -> Result<(), DomError> {
        let doc = self.doc;
        match doc.kind(id) {
            NodeKind::Root => {
                for &child in doc.children(id) {
                    self.write_node(child)?;
                }
            }
            NodeKind::Element(data) => self.write_element(id, data)?,
            NodeKind::Text(text) => {
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
            }
            NodeKind::Comment(text) => {
                self.writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            NodeKind::ProcessingInstruction { target, value } => {
                let content = match value {
                    Some(value) => format!("{} {}", target, value),
                    None => target.clone(),
                };
                self.writer.write_event(Event::PI(BytesPI::new(content)))?;
            }
        }
        Ok(())
    }

    fn write_element(&mut self, id: NodeId, data: &ElementData) -> Result<(), DomError> {
        let mut pending: Vec<Binding> = Vec::new();
        for (prefix, uri) in &data.namespace_decls {
            if self.resolve(&pending, prefix.as_deref()).as_deref() != Some(uri.as_str()) {
                pending.push((prefix.clone(), uri.clone()));
            }
        }

        let element_name = self.element_prefix(&data.name, &mut pending);
        let qname = with_prefix(element_name.as_deref(), &data.name.local);
        let attributes: Vec<(String, &str)> = data
            .attributes
            .iter()
            .map(|attr| {
                let prefix = self.attribute_prefix(&attr.name, &mut pending);
                (
                    with_prefix(prefix.as_deref(), &attr.name.local),
                    attr.value.as_str(),
                )
            })
            .collect();

        let mut start = BytesStart::new(qname.as_str());
        for (prefix, uri) in &pending {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (key, value) in &attributes {
            start.push_attribute((key.as_str(), *value));
        }

        let doc = self.doc;
        let children = doc.children(id);
        if children.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(start))?;
        self.scopes.push(pending);
        for &child in children {
            self.write_node(child)?;
        }
        self.scopes.pop();
        self.writer
            .write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        Ok(())
    }

    /// The URI `prefix` is bound to, looking at this element's pending
    /// declarations first.
    fn resolve(&self, pending: &[Binding], prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        pending
            .iter()
            .rev()
            .chain(self.scopes.iter().rev().flat_map(|scope| scope.iter().rev()))
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    fn element_prefix(&self, name: &ExpandedName, pending: &mut Vec<Binding>) -> Option<String> {
        match &name.namespace {
            None => {
                if self.resolve(pending, None).is_some() {
                    pending.push((None, String::new()));
                }
                None
            }
            Some(uri) => self.bind(pending, uri, name.prefix.as_deref(), true),
        }
    }

    fn attribute_prefix(&self, name: &ExpandedName, pending: &mut Vec<Binding>) -> Option<String> {
        match &name.namespace {
            None => None,
            Some(uri) if uri == XML_NAMESPACE => Some("xml".to_string()),
            Some(uri) => self.bind(pending, uri, name.prefix.as_deref(), false),
        }
    }

    /// Picks a prefix for `uri`, declaring it on the current element when needed.
    /// Unprefixed attributes are never in a namespace, so they cannot use the default.
    fn bind(
        &self,
        pending: &mut Vec<Binding>,
        uri: &str,
        preferred: Option<&str>,
        allow_default: bool,
    ) -> Option<String> {
        match preferred {
            Some(prefix) if prefix != "xml" && prefix != "xmlns" => {
                if self.resolve(pending, Some(prefix)).as_deref() == Some(uri) {
                    return Some(prefix.to_string());
                }
                if !pending.iter().any(|(p, _)| p.as_deref() == Some(prefix)) {
                    pending.push((Some(prefix.to_string()), uri.to_string()));
                    return Some(prefix.to_string());
                }
            }
            None if allow_default => {
                if self.resolve(pending, None).as_deref() == Some(uri) {
                    return None;
                }
                if !pending.iter().any(|(p, _)| p.is_none()) {
                    pending.push((None, uri.to_string()));
                    return None;
                }
            }
            _ => {}
        }

        let candidates: Vec<String> = pending
            .iter()
            .chain(self.scopes.iter().flatten())
            .filter(|(_, bound)| bound == uri)
            .filter_map(|(p, _)| p.clone())
            .collect();
        if let Some(prefix) = candidates
            .into_iter()
            .find(|p| self.resolve(pending, Some(p.as_str())).as_deref() == Some(uri))
        {
            return Some(prefix);
        }

        let mut counter = 0;
        loop {
            let prefix = format!("ns{}", counter);
            if self.resolve(pending, Some(prefix.as_str())).is_none()
                && !pending.iter().any(|(p, _)| p.as_deref() == Some(prefix.as_str()))
            {
                pending.push((Some(prefix.clone()), uri.to_string()));
                return Some(prefix);
            }
            counter += 1;
        }
    }
}

fn with_prefix(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_preserves_structure() {
        let xml = r#"<form xmlns="urn:form" xmlns:xt="urn:xt"><xt:string idref="a">x &amp; y</xt:string><!-- c --><p class="k">t</p><empty/></form>"#;
        let doc = Document::parse_str(xml, None).unwrap();
        let out = doc.to_xml_string().unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(out.contains(r#"xmlns="urn:form""#));
        assert!(out.contains(r#"xmlns:xt="urn:xt""#));
        assert!(out.contains(r#"<xt:string idref="a">x &amp; y</xt:string>"#));
        assert!(out.contains("<!-- c -->"));
        assert!(out.contains("<empty/>"));

        let reparsed = Document::parse_str(&out, None).unwrap();
        let form = reparsed.document_element().unwrap();
        assert_eq!(reparsed.element_children(form).count(), 3);
    }

    #[test]
    fn test_created_nodes_get_declarations() {
        let mut doc = Document::new();
        let root = doc.root();
        let top = doc.create_element(ExpandedName::local("top"));
        doc.append_child(root, top).unwrap();
        let anchor = doc.create_element(ExpandedName::new(
            "http://www.w3.org/1999/xhtml",
            "a",
            None,
        ));
        doc.set_attribute(anchor, ExpandedName::local("href"), "#p1")
            .unwrap();
        doc.set_attribute(anchor, ExpandedName::new("urn:tag", "kind", None), "v")
            .unwrap();
        doc.append_text(anchor, "1 < 2").unwrap();
        doc.append_child(top, anchor).unwrap();

        let out = doc.node_to_xml(top).unwrap();
        assert_eq!(
            out,
            r##"<top><a xmlns="http://www.w3.org/1999/xhtml" xmlns:ns0="urn:tag" href="#p1" ns0:kind="v">1 &lt; 2</a></top>"##
        );
    }

    #[test]
    fn test_unqualified_child_of_default_namespace() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.create_element(ExpandedName::new("urn:a", "outer", None));
        let inner = doc.create_element(ExpandedName::local("inner"));
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        let out = doc.node_to_xml(outer).unwrap();
        assert_eq!(out, r#"<outer xmlns="urn:a"><inner xmlns=""/></outer>"#);
    }

    #[test]
    fn test_xml_namespace_is_never_declared() {
        let doc = Document::parse_str(r#"<p xml:lang="cs">a</p>"#, None).unwrap();
        let p = doc.document_element().unwrap();
        assert_eq!(doc.node_to_xml(p).unwrap(), r#"<p xml:lang="cs">a</p>"#);
    }
}
