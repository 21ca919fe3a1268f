//! `xt:string`: computed text.
//!
//! `<xt:string xpath="count(//row)"/>` gets the count as its text.
//! `<xt:string idref="garant|aname"/>` gets an XHTML anchor pointing at
//! `#garant` whose text is `f:aname(//*[@id='garant'])`.

use super::{PassContext, elements_named};
use crate::error::TransformError;
use crate::namespaces::{FUNC_PREFIX, XHTML_NS, XT_NS};
use log::debug;
use xtools_dom::{Document, ExpandedName, NodeId};

const DEFAULT_FUNCTION: &str = "string";

/// What one `xt:string` element asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StringDirective {
    idref: Option<String>,
    function: String,
}

impl StringDirective {
    fn read(doc: &Document, id: NodeId) -> Self {
        let explicit = doc
            .attribute(id, None, "f")
            .unwrap_or(DEFAULT_FUNCTION)
            .to_string();
        match doc.attribute(id, None, "idref") {
            Some(idref) => match idref.split_once('|') {
                Some((idref, function)) => Self {
                    idref: Some(idref.to_string()),
                    function: format!("{}:{}", FUNC_PREFIX, function),
                },
                None => Self {
                    idref: Some(idref.to_string()),
                    function: explicit,
                },
            },
            None => Self {
                idref: None,
                function: explicit,
            },
        }
    }
}

pub fn replace_strings(doc: &mut Document, ctx: &PassContext<'_>) -> Result<(), TransformError> {
    for id in elements_named(doc, XT_NS, "string") {
        let directive = StringDirective::read(doc, id);
        if doc.attribute(id, None, "xpath").is_none()
            && let Some(idref) = &directive.idref
        {
            doc.set_attribute(id, ExpandedName::local("xpath"), format!("#{}", idref))?;
        }
        let query = ctx.directive_query(doc, id)?;
        let wrapped = format!("{}({})", directive.function, query);
        let text = ctx
            .evaluator
            .evaluate(doc, id, &wrapped)
            .map_err(|e| ctx.evaluation_error(doc, id, &wrapped, e))?
            .into_string(doc);

        match &directive.idref {
            Some(idref) => {
                debug!("Linking #{} as {:?}", idref, text);
                let anchor = doc.create_element(ExpandedName::new(XHTML_NS, "a", None));
                doc.set_attribute(anchor, ExpandedName::local("href"), format!("#{}", idref))?;
                doc.append_text(anchor, &text)?;
                doc.append_child(id, anchor)?;
            }
            None => doc.set_leading_text(id, &text)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::{evaluator, parse, pass_context};
    use xtools_xpath1::XPathError;

    const HEAD: &str = r#"<form xmlns:xt="http://ki.ujep.cz/ns/xtools" xmlns:ak="http://ki.ujep.cz/ns/akreditace">"#;

    fn directives(doc: &Document) -> Vec<NodeId> {
        elements_named(doc, XT_NS, "string")
    }

    fn run(xml: &str) -> Result<Document, TransformError> {
        let mut doc = parse(&format!("{}{}</form>", HEAD, xml));
        let ev = evaluator();
        replace_strings(&mut doc, &pass_context(&ev))?;
        Ok(doc)
    }

    fn inner(doc: &Document, id: NodeId) -> String {
        let xml = doc.node_to_xml(id).unwrap();
        let start = xml.find('>').unwrap() + 1;
        let end = xml.rfind("</").unwrap_or(xml.len());
        xml[start..end].to_string()
    }

    #[test]
    fn test_directive_parsing() {
        let doc = parse(&format!(
            r#"{}<xt:string idref="a"/><xt:string idref="a|aname" f="concat"/><xt:string f="count"/><xt:string/></form>"#,
            HEAD
        ));
        let parsed: Vec<StringDirective> = directives(&doc)
            .into_iter()
            .map(|id| StringDirective::read(&doc, id))
            .collect();
        let expect = |idref: Option<&str>, function: &str| StringDirective {
            idref: idref.map(str::to_string),
            function: function.to_string(),
        };
        assert_eq!(
            parsed,
            vec![
                expect(Some("a"), "string"),
                expect(Some("a"), "f:aname"),
                expect(None, "count"),
                expect(None, "string"),
            ]
        );
    }

    #[test]
    fn test_idref_appends_anchor_and_keeps_children() {
        let doc = run(r#"<p id="p1">Hello <b>world</b></p><xt:string idref="p1"><i>old</i></xt:string>"#)
            .unwrap();
        let directive = directives(&doc)[0];
        assert_eq!(doc.attribute(directive, None, "xpath"), Some("#p1"));
        assert_eq!(
            inner(&doc, directive),
            r##"<i>old</i><a xmlns="http://www.w3.org/1999/xhtml" href="#p1">Hello world</a>"##
        );
    }

    #[test]
    fn test_idref_with_function() {
        let doc = run(
            r#"<ak:osoba id="g"><ak:jméno>Jan Novák</ak:jméno><ak:tituly>prof., PhD.</ak:tituly></ak:osoba><xt:string idref="g|aname"/>"#,
        )
        .unwrap();
        let directive = directives(&doc)[0];
        let anchor = doc.element_children(directive).next().unwrap();
        assert!(doc.is_named(anchor, Some(XHTML_NS), "a"));
        assert_eq!(doc.attribute(anchor, None, "href"), Some("#g"));
        assert_eq!(doc.string_value(anchor), "prof. Jan Novák, PhD.");
    }

    #[test]
    fn test_xpath_sets_text() {
        let doc = run(
            r##"<row/><row/><xt:string xpath="//row">stale<b/></xt:string><xt:string f="count" xpath="//row"/><xt:string xpath="#nothing"/>"##,
        )
        .unwrap();
        let found = directives(&doc);
        // The leading text is replaced, the rest is kept.
        assert_eq!(inner(&doc, found[0]), "<b/>");
        assert_eq!(doc.string_value(found[1]), "2");
        assert_eq!(doc.string_value(found[2]), "");
        assert_eq!(doc.element_children(found[1]).count(), 0);
    }

    #[test]
    fn test_explicit_xpath_wins_over_idref() {
        let doc = run(r##"<p id="p1">one</p><p id="p2">two</p><xt:string idref="p1" xpath="#p2"/>"##)
            .unwrap();
        let directive = directives(&doc)[0];
        let anchor = doc.element_children(directive).next().unwrap();
        assert_eq!(doc.attribute(anchor, None, "href"), Some("#p1"));
        assert_eq!(doc.string_value(anchor), "two");
    }

    #[test]
    fn test_missing_query() {
        let err = run("<xt:string/>").unwrap_err();
        assert!(matches!(err, TransformError::MissingQuery { .. }));
        assert!(
            err.to_string()
                .starts_with("no xpath attribute in element:\n[test.xml:1]<xt:string />")
        );
    }

    #[test]
    fn test_evaluation_failures_carry_the_directive() {
        let err = run(r#"<xt:string xpath="//["/>"#).unwrap_err();
        match err {
            TransformError::Evaluation { query, context, source } => {
                assert_eq!(query, "string(//[)");
                assert!(context.to_string().contains("xt:string"));
                assert!(matches!(source, XPathError::XPathParse(..)));
            }
            other => panic!("Expected an evaluation error, got {:?}", other),
        }

        let err = run(r#"<xt:string idref="x|nosuch"/>"#).unwrap_err();
        assert!(matches!(
            err,
            TransformError::Evaluation { source: XPathError::FunctionError { .. }, .. }
        ));
    }
}
