//! Custom functions callable from queries as `f:name(node-set)`.
//!
//! Functions live in [`FUNC_NS`]. The [`FunctionRegistry`] implements the
//! XPath engine's [`ExtensionResolver`] hook, so every query evaluated by the
//! engine sees the same set of functions, and the external transform stage
//! can look them up by name.

use crate::error::TransformError;
use crate::namespaces::{AK_NS, FUNC_NS, FUNC_PREFIX};
use itertools::Itertools;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use xtools_dom::{Document, NodeHandle, NodeRef};
use xtools_xpath1::{EvaluationContext, ExtensionResolver, XPathError, XPathValue};

/// Title tokens written after a person's name.
const SUFFIX_TITLES: [&str; 7] = ["PhD.", "CSc.", "DrSc.", "DiS.", "MBA", "LL.M", "dr. h. c."];

/// One title: the multi-word `dr. h. c.` or a run without whitespace and commas.
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dr\.\s+h\.\s+c\.|[^\s,]+").expect("BUG: invalid TITLE_RE regex literal")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FunctionError(pub String);

/// What a custom function can see besides its argument.
pub struct FunctionContext<'a> {
    pub document: &'a Document,
    /// The context node of the query that made the call.
    pub context_node: NodeRef<'a>,
}

type FunctionImpl =
    dyn for<'a> Fn(&FunctionContext<'a>, &[NodeRef<'a>]) -> Result<String, FunctionError>
        + Send
        + Sync;

/// A named function returning a string for a node-set argument.
#[derive(Clone)]
pub struct CustomFunction {
    name: String,
    func: Arc<FunctionImpl>,
}

impl CustomFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: for<'a> Fn(&FunctionContext<'a>, &[NodeRef<'a>]) -> Result<String, FunctionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<'a>(
        &self,
        ctx: &FunctionContext<'a>,
        nodes: &[NodeRef<'a>],
    ) -> Result<String, FunctionError> {
        (self.func)(ctx, nodes)
    }
}

impl fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, CustomFunction>,
}

impl FunctionRegistry {
    /// Builds a registry, rejecting names registered twice.
    pub fn new(functions: Vec<CustomFunction>) -> Result<Self, TransformError> {
        let mut map = BTreeMap::new();
        for function in functions {
            let name = function.name.clone();
            if map.insert(name.clone(), function).is_some() {
                return Err(TransformError::DuplicateFunction(name));
            }
        }
        Ok(Self { functions: map })
    }

    pub fn get(&self, name: &str) -> Option<&CustomFunction> {
        self.functions.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The `(namespace, local name)` pairs under which the functions are callable.
    pub fn extension_names(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.functions.keys().map(|name| (FUNC_NS, name.as_str()))
    }
}

impl<'a> ExtensionResolver<'a, NodeRef<'a>> for FunctionRegistry {
    fn call(
        &self,
        namespace: &str,
        local_name: &str,
        args: Vec<XPathValue<NodeRef<'a>>>,
        e_ctx: &EvaluationContext<'a, '_, NodeRef<'a>>,
    ) -> Result<XPathValue<NodeRef<'a>>, XPathError> {
        let failure = |message: String| XPathError::FunctionError {
            function: format!("{}:{}", FUNC_PREFIX, local_name),
            message,
        };
        if namespace != FUNC_NS {
            return Err(XPathError::FunctionError {
                function: format!("{{{}}}{}", namespace, local_name),
                message: "Unknown extension function".to_string(),
            });
        }
        let function = self
            .get(local_name)
            .ok_or_else(|| failure("Unknown custom function".to_string()))?;

        let [argument]: [XPathValue<NodeRef<'a>>; 1] = args.try_into().map_err(
            |args: Vec<XPathValue<NodeRef<'a>>>| {
                failure(format!("Expected 1 argument, got {}", args.len()))
            },
        )?;
        let XPathValue::NodeSet(nodes) = argument else {
            return Err(failure("The argument must be a node-set".to_string()));
        };

        let ctx = FunctionContext {
            document: e_ctx.context_node.document(),
            context_node: e_ctx.context_node,
        };
        function
            .call(&ctx, &nodes)
            .map(XPathValue::String)
            .map_err(|e| failure(e.0))
    }
}

/// Formats a person's name with academic titles placed around it:
/// `prof. Jan Novák, PhD.`.
///
/// The argument must hold exactly one node with `ak:jméno` and `ak:tituly`
/// children. Titles are separated by whitespace or commas; `dr. h. c.` counts
/// as a single title.
pub fn aname(ctx: &FunctionContext<'_>, nodes: &[NodeRef<'_>]) -> Result<String, FunctionError> {
    let [person] = nodes else {
        return Err(FunctionError(format!(
            "aname expects exactly one person, got {}",
            nodes.len()
        )));
    };
    let doc = ctx.document;
    let child_text = |local: &str| match person.handle() {
        NodeHandle::Node(id) => doc
            .element_children(id)
            .find(|&child| doc.is_named(child, Some(AK_NS), local))
            .map(|child| doc.string_value(child))
            .unwrap_or_default(),
        NodeHandle::Attribute(..) => String::new(),
    };

    let name = child_text("jméno");
    let titles = child_text("tituly");
    let (suffixes, prefixes): (Vec<String>, Vec<String>) = TITLE_RE
        .find_iter(&titles)
        .map(|m| m.as_str().split_whitespace().join(" "))
        .partition(|t| SUFFIX_TITLES.contains(&t.as_str()));

    let mut out = String::new();
    if !prefixes.is_empty() {
        out.push_str(&prefixes.join(" "));
        out.push(' ');
    }
    out.push_str(&name);
    if !suffixes.is_empty() {
        out.push_str(", ");
        out.push_str(&suffixes.join(", "));
    }
    Ok(out)
}

/// The functions every transformer gets unless told otherwise.
pub fn builtin_functions() -> Vec<CustomFunction> {
    vec![CustomFunction::new("aname", aname)]
}
