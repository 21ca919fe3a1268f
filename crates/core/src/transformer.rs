use crate::config::{DuplicateTags, TransformerConfig};
use crate::destyle::destyle;
use crate::error::TransformError;
use crate::evaluator::QueryEvaluator;
use crate::functions::{CustomFunction, FunctionRegistry, builtin_functions};
use crate::namespaces::{RESERVED, with_reserved};
use crate::passes::{PassContext, append, contents, hoist, inheritance, strings};
use crate::stage::TransformStage;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use xtools_dom::Document;

/// Resolves the directives of a document.
///
/// Built with [`TransformerBuilder`]; one transformer can process any number
/// of documents.
#[derive(Debug, Clone)]
pub struct Transformer {
    evaluator: QueryEvaluator,
    snippet_width: usize,
    duplicate_tags: DuplicateTags,
    destyle: bool,
}

impl Transformer {
    pub fn builder() -> TransformerBuilder {
        TransformerBuilder::new()
    }

    pub fn evaluator(&self) -> &QueryEvaluator {
        &self.evaluator
    }

    /// The custom functions, for stages that want to call them too.
    pub fn functions(&self) -> &FunctionRegistry {
        self.evaluator.functions()
    }

    fn pass_context(&self) -> PassContext<'_> {
        PassContext {
            evaluator: &self.evaluator,
            snippet_width: self.snippet_width,
            duplicate_tags: self.duplicate_tags,
        }
    }

    /// Runs the directive passes in order: inheritance, strings, contents,
    /// append, then wraps tagged elements.
    pub fn replace_all(&self, doc: &mut Document) -> Result<(), TransformError> {
        let ctx = self.pass_context();
        debug!("Merging xt:extends");
        inheritance::merge_extends(doc, &ctx)?;
        debug!("Replacing xt:string");
        strings::replace_strings(doc, &ctx)?;
        debug!("Replacing xt:contents");
        contents::replace_contents(doc, &ctx)?;
        debug!("Replacing xt:append");
        append::append_lists(doc, &ctx)?;
        debug!("Wrapping tag attributes");
        hoist::wrap_tags(doc, &ctx)?;
        Ok(())
    }

    /// Dissolves the tag wrappers left after the stage.
    pub fn flatten(&self, doc: &mut Document) -> Result<(), TransformError> {
        hoist::flatten_tags(doc, &self.pass_context())
    }

    /// The whole pipeline: directives, `stage`, flattening and, when
    /// configured, style removal.
    pub fn process(
        &self,
        mut doc: Document,
        stage: &dyn TransformStage,
    ) -> Result<Document, TransformError> {
        self.replace_all(&mut doc)?;
        let mut doc = stage.transform(doc, self.functions())?;
        self.flatten(&mut doc)?;
        if self.destyle {
            destyle(&mut doc);
        }
        info!(
            "Processed {}",
            doc.origin().unwrap_or("document")
        );
        Ok(doc)
    }
}

/// Collects namespaces, functions and settings for a [`Transformer`].
#[derive(Debug, Clone, Default)]
pub struct TransformerBuilder {
    config: TransformerConfig,
    functions: Vec<CustomFunction>,
}

impl TransformerBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the settings. Namespaces bound earlier with
    /// [`with_namespace`](Self::with_namespace) are kept unless the config
    /// binds the same prefix.
    pub fn with_config(mut self, config: TransformerConfig) -> Self {
        let mut namespaces = std::mem::take(&mut self.config.namespaces);
        namespaces.extend(config.namespaces.clone());
        self.config = TransformerConfig {
            namespaces,
            ..config
        };
        self
    }

    /// Reads settings from a JSON file.
    pub fn with_config_file<P: AsRef<Path>>(self, path: P) -> Result<Self, TransformError> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref).map_err(|e| {
            TransformError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read config from '{}': {}", path_ref.display(), e),
            ))
        })?;
        let config = TransformerConfig::from_json(&text)?;
        Ok(self.with_config(config))
    }

    /// Binds a prefix for use in queries.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.config.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_function(mut self, function: CustomFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Adds `aname` and the other built-in functions.
    pub fn with_builtin_functions(mut self) -> Self {
        self.functions.extend(builtin_functions());
        self
    }

    pub fn with_snippet_width(mut self, width: usize) -> Self {
        self.config.snippet_width = width;
        self
    }

    pub fn with_duplicate_tags(mut self, policy: DuplicateTags) -> Self {
        self.config.duplicate_tags = policy;
        self
    }

    pub fn with_destyle(mut self, destyle: bool) -> Self {
        self.config.destyle = destyle;
        self
    }

    pub fn build(self) -> Result<Transformer, TransformError> {
        check_reserved(&self.config.namespaces)?;
        let functions = FunctionRegistry::new(self.functions)?;
        let namespaces = with_reserved(self.config.namespaces);
        Ok(Transformer {
            evaluator: QueryEvaluator::new(namespaces, functions),
            snippet_width: self.config.snippet_width,
            duplicate_tags: self.config.duplicate_tags,
            destyle: self.config.destyle,
        })
    }
}

fn check_reserved(namespaces: &BTreeMap<String, String>) -> Result<(), TransformError> {
    for (prefix, uri) in RESERVED {
        if let Some(bound) = namespaces.get(prefix)
            && bound != uri
        {
            return Err(TransformError::Config(format!(
                "prefix '{}' is reserved for {}, cannot bind it to {}",
                prefix, uri, bound
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{AK_NS, XT_NS};
    use std::io::Write;
    use std::time::{Duration, Instant};
    use tempfile::NamedTempFile;

    const FORM: &str = r##"<form xmlns:xt="http://ki.ujep.cz/ns/xtools" xmlns:tag="http://ki.ujep.cz/ns/xtags" xmlns:ak="http://ki.ujep.cz/ns/akreditace">
<ak:osoba id="g"><ak:jméno>Jan Novák</ak:jméno><ak:tituly>prof., PhD.</ak:tituly></ak:osoba>
<card id="base"><head>Base</head><garant><xt:string idref="g|aname"/></garant></card>
<card xt:extends="#base"><head>Derived</head></card>
<list id="items"><li>one</li><li>two</li></list>
<xt:append xpath="#items/li"/>
<p tag:note="n1">text</p>
</form>"##;

    fn transformer() -> Transformer {
        TransformerBuilder::new()
            .with_namespace("ak", AK_NS)
            .with_builtin_functions()
            .build()
            .unwrap()
    }

    #[test]
    fn test_replace_all_runs_every_pass() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut doc = Document::parse_str(FORM, Some("form.xml")).unwrap();
        transformer().replace_all(&mut doc).unwrap();
        let out = doc.to_xml_string().unwrap();

        // The derived card got the garant, resolved after the merge.
        assert_eq!(out.matches("prof. Jan Novák, PhD.</a>").count(), 2);
        assert!(out.contains("<head>Derived</head><garant>"));
        assert!(out.contains(r##"<xt:append xpath="#items/li"><li>one</li><li>two</li></xt:append>"##));
        assert!(out.contains(r#"<tag:note value="n1"><p>text</p></tag:note>"#));
    }

    #[test]
    fn test_process_with_identity_stage() {
        let doc = Document::parse_str(FORM, Some("form.xml")).unwrap();
        let out = transformer()
            .process(doc, &crate::stage::IdentityStage)
            .unwrap();
        let xml = out.to_xml_string().unwrap();
        assert!(xml.contains(r#"<p class="tag_note" data-tag="n1">text</p>"#));
        assert!(!xml.contains("<tag:"));
    }

    #[test]
    fn test_process_with_custom_stage() {
        let doc = Document::parse_str(FORM, Some("form.xml")).unwrap();
        let stage = |mut doc: Document, functions: &FunctionRegistry| -> Result<Document, TransformError> {
            assert!(functions.get("aname").is_some());
            let strings = crate::passes::elements_named(&doc, XT_NS, "string");
            for id in strings {
                doc.add_class(id, "seen")?;
            }
            Ok(doc)
        };
        let out = transformer().process(doc, &stage).unwrap();
        let xml = out.to_xml_string().unwrap();
        assert_eq!(xml.matches(r#"class="seen""#).count(), 2);
    }

    #[test]
    fn test_destyle_runs_last() {
        let doc = Document::parse_str(
            r#"<html xmlns:tag="http://ki.ujep.cz/ns/xtags"><style>x</style><p tag:k="v" style="a">t</p></html>"#,
            None,
        )
        .unwrap();
        let transformer = TransformerBuilder::new().with_destyle(true).build().unwrap();
        let out = transformer
            .process(doc, &crate::stage::IdentityStage)
            .unwrap();
        let html = out.document_element().unwrap();
        assert_eq!(
            out.node_to_xml(html).unwrap(),
            r#"<html xmlns:tag="http://ki.ujep.cz/ns/xtags"><p class="tag_k" data-tag="v">t</p></html>"#
        );
    }

    #[test]
    fn test_reserved_prefixes_cannot_be_rebound() {
        let err = TransformerBuilder::new()
            .with_namespace("xt", "urn:other")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransformError::Config(_)));
        assert!(
            TransformerBuilder::new()
                .with_namespace("xt", XT_NS)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_builder_settings_reach_the_passes() {
        let duplicates = r##"<form xmlns:xt="http://ki.ujep.cz/ns/xtools"><t id="base"><a>1</a><a>2</a></t><t xt:extends="#base"/></form>"##;
        let strict = Transformer::builder().build().unwrap();
        let mut doc = Document::parse_str(duplicates, None).unwrap();
        assert!(matches!(
            strict.replace_all(&mut doc),
            Err(TransformError::DuplicateTags { .. })
        ));

        let lenient = Transformer::builder()
            .with_duplicate_tags(DuplicateTags::LastWins)
            .with_snippet_width(12)
            .build()
            .unwrap();
        let mut doc = Document::parse_str(duplicates, None).unwrap();
        lenient.replace_all(&mut doc).unwrap();

        let bad = Document::parse_str(
            r#"<form xmlns:xt="http://ki.ujep.cz/ns/xtools"><xt:contents xpath="//none"/></form>"#,
            Some("bad.xml"),
        )
        .unwrap();
        let err = lenient.process(bad, &crate::stage::IdentityStage).unwrap_err();
        assert!(err.to_string().starts_with("in element:\n[bad.xml:1]<...\n"));
    }

    #[test]
    fn test_builtins_twice_is_a_duplicate() {
        let err = TransformerBuilder::new()
            .with_builtin_functions()
            .with_builtin_functions()
            .build()
            .unwrap_err();
        assert!(matches!(err, TransformError::DuplicateFunction(name) if name == "aname"));
    }

    #[test]
    fn test_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"namespaces": {{"ak": "{}"}}, "snippet_width": 30, "duplicate_tags": "last_wins"}}"#,
            AK_NS
        )
        .unwrap();
        let transformer = TransformerBuilder::new()
            .with_namespace("h", "http://www.w3.org/1999/xhtml")
            .with_config_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(transformer.snippet_width, 30);
        assert_eq!(transformer.duplicate_tags, DuplicateTags::LastWins);
        assert_eq!(transformer.evaluator().namespaces()["ak"], AK_NS);
        assert_eq!(
            transformer.evaluator().namespaces()["h"],
            "http://www.w3.org/1999/xhtml"
        );
        assert_eq!(transformer.evaluator().namespaces()["xt"], XT_NS);
    }

    #[test]
    fn test_missing_config_file() {
        let err = TransformerBuilder::new()
            .with_config_file("/nonexistent/xtools.json")
            .unwrap_err();
        assert!(matches!(err, TransformError::Io(_)));
        assert!(err.to_string().contains("/nonexistent/xtools.json"));
    }

    #[test]
    fn test_errors_abort_the_pipeline() {
        let doc = Document::parse_str(
            r#"<form xmlns:xt="http://ki.ujep.cz/ns/xtools"><xt:contents xpath="//none"/></form>"#,
            Some("bad.xml"),
        )
        .unwrap();
        let err = transformer()
            .process(doc, &crate::stage::IdentityStage)
            .unwrap_err();
        assert!(matches!(err, TransformError::Cardinality { .. }));
        assert!(err.to_string().contains("[bad.xml:1]"));
    }

    #[test]
    fn test_id_lookups_scale_to_flat_documents() {
        let items: String = (0..3000).map(|i| format!("<p id=\"p{i}\">item {i}</p>")).collect();
        let strings: String = (0..50)
            .map(|i| format!("<q><xt:string idref=\"p{}\"/></q>", i * 60))
            .collect();
        let xml = format!(r#"<form xmlns:xt="http://ki.ujep.cz/ns/xtools">{items}{strings}</form>"#);
        let doc = Document::parse_str(&xml, Some("flat.xml")).unwrap();

        let started = Instant::now();
        let out = transformer()
            .process(doc, &crate::stage::IdentityStage)
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let xml = out.to_xml_string().unwrap();
        assert_eq!(xml.matches("</a>").count(), 50);
        assert!(xml.contains(">item 0</a>"));
        assert!(xml.contains(">item 2940</a>"));
    }
}
