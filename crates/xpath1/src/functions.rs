//! The XPath 1.0 core function library and the hook for prefixed functions.

use crate::ast::Axis;
use crate::axes;
use crate::datasource::{DataSourceNode, NodeType, QName};
use crate::engine::{EvaluationContext, XML_NAMESPACE, XPathValue, parse_number};
use crate::error::XPathError;
use std::collections::{HashMap, HashSet};

/// Answers calls to prefixed functions such as `f:aname(...)`.
///
/// The engine resolves the prefix and evaluates the arguments first; the
/// resolver reports names it does not know itself.
pub trait ExtensionResolver<'a, N: DataSourceNode<'a>> {
    fn call(
        &self,
        namespace: &str,
        local_name: &str,
        args: Vec<XPathValue<N>>,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<XPathValue<N>, XPathError>;
}

const CORE_FUNCTIONS: &[&str] = &[
    "last",
    "position",
    "count",
    "id",
    "local-name",
    "namespace-uri",
    "name",
    "string",
    "concat",
    "starts-with",
    "contains",
    "substring-before",
    "substring-after",
    "substring",
    "string-length",
    "normalize-space",
    "translate",
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
];

pub fn evaluate_function<'a, 'd, N: DataSourceNode<'a>>(
    name: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<XPathValue<N>, XPathError> {
    if let Some((prefix, local_name)) = name.split_once(':') {
        let namespace = e_ctx.resolve_prefix(prefix)?;
        return match e_ctx.extensions {
            Some(resolver) => resolver.call(namespace, local_name, args, e_ctx),
            None => Err(XPathError::FunctionError {
                function: name.to_string(),
                message: "No extension functions are available".to_string(),
            }),
        };
    }

    let context = e_ctx.context_node;
    let value = match (name, args.as_slice()) {
        ("last", []) => XPathValue::Number(e_ctx.context_size as f64),
        ("position", []) => XPathValue::Number(e_ctx.context_position as f64),
        ("count", [set]) => XPathValue::Number(node_set(name, set)?.len() as f64),
        ("id", [wanted]) => XPathValue::NodeSet(elements_by_id(wanted, e_ctx.root_node)),
        ("local-name" | "namespace-uri" | "name", []) => {
            XPathValue::String(name_part(name, Some(context)))
        }
        ("local-name" | "namespace-uri" | "name", [set]) => {
            XPathValue::String(name_part(name, node_set(name, set)?.first().copied()))
        }

        ("string", []) => XPathValue::String(context.string_value()),
        ("string", [value]) => XPathValue::String(value.to_string()),
        ("concat", values) if values.len() >= 2 => {
            XPathValue::String(values.iter().map(ToString::to_string).collect())
        }
        ("starts-with", [haystack, needle]) => {
            XPathValue::Boolean(haystack.to_string().starts_with(&needle.to_string()))
        }
        ("contains", [haystack, needle]) => {
            XPathValue::Boolean(haystack.to_string().contains(&needle.to_string()))
        }
        ("substring-before", [text, marker]) => {
            let (text, marker) = (text.to_string(), marker.to_string());
            let before = text.find(&marker).map_or("", |at| &text[..at]);
            XPathValue::String(before.to_string())
        }
        ("substring-after", [text, marker]) => {
            let (text, marker) = (text.to_string(), marker.to_string());
            let after = text.find(&marker).map_or("", |at| &text[at + marker.len()..]);
            XPathValue::String(after.to_string())
        }
        ("substring", [text, start]) => {
            XPathValue::String(substring(&text.to_string(), start.to_number(), f64::INFINITY))
        }
        ("substring", [text, start, length]) => XPathValue::String(substring(
            &text.to_string(),
            start.to_number(),
            length.to_number(),
        )),
        ("string-length", []) => XPathValue::Number(context.string_value().chars().count() as f64),
        ("string-length", [text]) => XPathValue::Number(text.to_string().chars().count() as f64),
        ("normalize-space", []) => XPathValue::String(normalize_space(&context.string_value())),
        ("normalize-space", [text]) => XPathValue::String(normalize_space(&text.to_string())),
        ("translate", [text, from, to]) => XPathValue::String(translate(
            &text.to_string(),
            &from.to_string(),
            &to.to_string(),
        )),

        ("boolean", [value]) => XPathValue::Boolean(value.to_bool()),
        ("not", [value]) => XPathValue::Boolean(!value.to_bool()),
        ("true", []) => XPathValue::Boolean(true),
        ("false", []) => XPathValue::Boolean(false),
        ("lang", [wanted]) => XPathValue::Boolean(has_lang(context, &wanted.to_string())),

        ("number", []) => XPathValue::Number(parse_number(&context.string_value())),
        ("number", [value]) => XPathValue::Number(value.to_number()),
        ("sum", [set]) => XPathValue::Number(
            node_set(name, set)?
                .iter()
                .map(|node| parse_number(&node.string_value()))
                .sum(),
        ),
        ("floor", [value]) => XPathValue::Number(value.to_number().floor()),
        ("ceiling", [value]) => XPathValue::Number(value.to_number().ceil()),
        ("round", [value]) => XPathValue::Number(round(value.to_number())),

        (known, _) if CORE_FUNCTIONS.contains(&known) => {
            return Err(XPathError::FunctionError {
                function: name.to_string(),
                message: format!("wrong number of arguments ({})", args.len()),
            });
        }
        _ => {
            return Err(XPathError::FunctionError {
                function: name.to_string(),
                message: "unknown function".to_string(),
            });
        }
    };
    Ok(value)
}

fn node_set<'v, 'a, N: DataSourceNode<'a>>(
    function: &str,
    value: &'v XPathValue<N>,
) -> Result<&'v [N], XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::TypeError(format!(
            "{}() needs a node-set, got a {}",
            function,
            other.type_name()
        ))),
    }
}

/// `local-name`, `namespace-uri` or `name` of a node; empty for no node.
fn name_part<'a, N: DataSourceNode<'a>>(function: &str, node: Option<N>) -> String {
    let Some(QName {
        prefix,
        namespace,
        local_part,
    }) = node.and_then(|n| n.name())
    else {
        return String::new();
    };
    match (function, prefix) {
        ("local-name", _) => local_part.to_string(),
        ("namespace-uri", _) => namespace.unwrap_or_default().to_string(),
        (_, Some(prefix)) => format!("{}:{}", prefix, local_part),
        (_, None) => local_part.to_string(),
    }
}

fn is_id_attribute(name: QName<'_>) -> bool {
    name.local_part == "id" && name.namespace.is_none_or(|ns| ns == XML_NAMESPACE)
}

/// Elements whose `id` or `xml:id` is one of the whitespace separated tokens.
fn elements_by_id<'a, N: DataSourceNode<'a>>(wanted: &XPathValue<N>, root: N) -> Vec<N> {
    let tokens: HashSet<String> = match wanted {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .flat_map(|node| {
                node.string_value()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        other => other
            .to_string()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    };
    axes::descendants(root)
        .into_iter()
        .filter(|node| {
            node.node_type() == NodeType::Element
                && node.attributes().any(|attr| {
                    attr.name().is_some_and(is_id_attribute)
                        && tokens.contains(attr.string_value().trim())
                })
        })
        .collect()
}

/// Characters at 1-based positions `p` with
/// `round(start) <= p < round(start) + round(length)`. NaN bounds select
/// nothing.
fn substring(text: &str, start: f64, length: f64) -> String {
    let first = round(start);
    let end = first + round(length);
    text.chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (index + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn round(n: f64) -> f64 {
    if n.is_finite() { (n + 0.5).floor() } else { n }
}

fn normalize_space(text: &str) -> String {
    text.split([' ', '\t', '\r', '\n'])
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The first occurrence of a character in `from` wins; characters past the
/// end of `to` are removed.
fn translate(text: &str, from: &str, to: &str) -> String {
    let replacements: Vec<char> = to.chars().collect();
    let mut map: HashMap<char, Option<char>> = HashMap::new();
    for (index, c) in from.chars().enumerate() {
        map.entry(c).or_insert(replacements.get(index).copied());
    }
    text.chars()
        .filter_map(|c| map.get(&c).copied().unwrap_or(Some(c)))
        .collect()
}

/// Whether the nearest `xml:lang` is `wanted` or a sublanguage of it.
fn has_lang<'a, N: DataSourceNode<'a>>(node: N, wanted: &str) -> bool {
    let declared = axes::along(Axis::AncestorOrSelf, node)
        .into_iter()
        .find_map(|candidate| {
            candidate
                .attributes()
                .find(|attr| {
                    attr.name()
                        .is_some_and(|q| q.local_part == "lang" && q.namespace == Some(XML_NAMESPACE))
                })
                .map(|attr| attr.string_value().to_ascii_lowercase())
        });
    let wanted = wanted.to_ascii_lowercase();
    declared.is_some_and(|lang| {
        lang == wanted || lang.strip_prefix(&wanted).is_some_and(|rest| rest.starts_with('-'))
    })
}
