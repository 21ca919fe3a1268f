//! Loading documents through `roxmltree`.

use crate::document::Document;
use crate::error::DomError;
use crate::node::{Attribute, ElementData, ExpandedName, NodeId, SourceLocation};
use std::path::Path;

impl Document {
    /// Parses XML text. `origin` names the source in diagnostics; without one,
    /// elements carry no location.
    pub fn parse_str(text: &str, origin: Option<&str>) -> Result<Document, DomError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let source = roxmltree::Document::parse_with_options(text, options)?;
        let mut doc = Document::new();
        doc.set_origin(origin.map(str::to_string));
        let root = doc.root();
        let builder = Builder {
            source: &source,
            origin,
        };
        for child in source.root().children() {
            builder.copy_node(&mut doc, child, root)?;
        }
        log::debug!(
            "Parsed document '{}' into {} nodes",
            origin.unwrap_or("<string>"),
            doc.descendants_or_self(root).len()
        );
        Ok(doc)
    }

    /// Reads and parses a file; the origin is the file name without directories.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document, DomError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DomError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read '{}': {}", path.display(), e),
            ))
        })?;
        let origin = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse_str(&text, Some(&origin))
    }
}

struct Builder<'s, 'input> {
    source: &'s roxmltree::Document<'input>,
    origin: Option<&'s str>,
}

impl<'s, 'input> Builder<'s, 'input> {
    fn copy_node(
        &self,
        doc: &mut Document,
        node: roxmltree::Node<'s, 'input>,
        parent: NodeId,
    ) -> Result<(), DomError> {
        match node.node_type() {
            roxmltree::NodeType::Element => {
                let id = doc.create_element_data(self.element_data(node));
                if let Some(origin) = self.origin {
                    let pos = self.source.text_pos_at(node.range().start);
                    doc.set_location(
                        id,
                        Some(SourceLocation {
                            origin: origin.to_string(),
                            line: pos.row,
                        }),
                    );
                }
                doc.append_child(parent, id)?;
                for child in node.children() {
                    self.copy_node(doc, child, id)?;
                }
            }
            roxmltree::NodeType::Text => {
                doc.append_text(parent, node.text().unwrap_or(""))?;
            }
            roxmltree::NodeType::Comment => {
                let id = doc.create_comment(node.text().unwrap_or(""));
                doc.append_child(parent, id)?;
            }
            roxmltree::NodeType::PI => {
                if let Some(pi) = node.pi() {
                    let id = doc.create_processing_instruction(pi.target, pi.value);
                    doc.append_child(parent, id)?;
                }
            }
            roxmltree::NodeType::Root => {}
        }
        Ok(())
    }

    fn element_data(&self, node: roxmltree::Node<'s, 'input>) -> ElementData {
        let tag = node.tag_name();
        let name = ExpandedName {
            namespace: tag.namespace().map(str::to_string),
            local: tag.name().to_string(),
            prefix: tag
                .namespace()
                .and_then(|ns| node.lookup_prefix(ns))
                .map(str::to_string),
        };
        let attributes = node
            .attributes()
            .map(|attr| Attribute {
                name: ExpandedName {
                    namespace: attr.namespace().map(str::to_string),
                    local: attr.name().to_string(),
                    prefix: attr
                        .namespace()
                        .and_then(|ns| node.lookup_prefix(ns))
                        .map(str::to_string),
                },
                value: attr.value().to_string(),
            })
            .collect();

        // roxmltree reports every in-scope binding; keep the ones that are new here.
        let inherited: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        let namespace_decls = node
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect();

        ElementData {
            name,
            attributes,
            namespace_decls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<form xmlns="urn:form" xmlns:xt="http://ki.ujep.cz/ns/xtools">
  <!-- people -->
  <person id="p1" xml:lang="cs">Jan<b>N</b>tail</person>
  <xt:string idref="p1"/>
</form>"#;

    #[test]
    fn test_parse_names_and_locations() {
        let doc = Document::parse_str(SAMPLE, Some("form.xml")).unwrap();
        let form = doc.document_element().unwrap();
        let name = doc.name(form).unwrap();
        assert!(name.matches(Some("urn:form"), "form"));
        assert_eq!(name.prefix, None);
        assert_eq!(doc.location(form).unwrap().line, 2);
        assert_eq!(doc.location(form).unwrap().origin, "form.xml");

        let elements: Vec<NodeId> = doc.element_children(form).collect();
        assert_eq!(elements.len(), 2);
        let person = elements[0];
        assert_eq!(doc.location(person).unwrap().line, 4);
        assert_eq!(doc.attribute(person, None, "id"), Some("p1"));
        assert_eq!(
            doc.attribute(person, Some("http://www.w3.org/XML/1998/namespace"), "lang"),
            Some("cs")
        );
        assert_eq!(doc.leading_text(person), "Jan");
        assert_eq!(doc.string_value(person), "JanNtail");

        let directive = elements[1];
        let name = doc.name(directive).unwrap();
        assert!(name.matches(Some("http://ki.ujep.cz/ns/xtools"), "string"));
        assert_eq!(name.prefix.as_deref(), Some("xt"));
    }

    #[test]
    fn test_parse_keeps_comments_and_declarations() {
        let doc = Document::parse_str(SAMPLE, None).unwrap();
        let form = doc.document_element().unwrap();
        assert!(doc.location(form).is_none());
        assert!(
            doc.children(form)
                .iter()
                .any(|&c| matches!(doc.kind(c), NodeKind::Comment(t) if t == " people "))
        );
        let decls = &doc.element(form).unwrap().namespace_decls;
        assert_eq!(decls.len(), 2);
        let person = doc.element_children(form).next().unwrap();
        assert!(doc.element(person).unwrap().namespace_decls.is_empty());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Document::parse_str("<a><b></a>", None),
            Err(DomError::XmlParse(_))
        ));
    }

    #[test]
    fn test_parse_file_uses_file_name_as_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xml");
        std::fs::write(&path, "<root>\n<child/>\n</root>").unwrap();
        let doc = Document::parse_file(&path).unwrap();
        let root = doc.document_element().unwrap();
        let child = doc.element_children(root).next().unwrap();
        assert_eq!(doc.location(child).unwrap().to_string(), "input.xml:2");

        let missing = Document::parse_file(dir.path().join("missing.xml"));
        assert!(matches!(missing, Err(DomError::Io(_))));
    }
}
