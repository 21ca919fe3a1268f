//! Evaluation of parsed expressions over any [`DataSourceNode`] tree.

use crate::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, PathOrigin, Step};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use crate::functions::{self, ExtensionResolver};
use crate::{axes, operators};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// The namespace URI the `xml` prefix is permanently bound to.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone)]
pub enum XPathValue<N> {
    /// Sorted in document order, without duplicates.
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => !(n.is_nan() || *n == 0.0),
            XPathValue::Boolean(b) => *b,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            XPathValue::String(s) => parse_number(s),
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or(f64::NAN, |node| parse_number(&node.string_value())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

/// The XPath `number()` conversion: optional whitespace around an optional
/// minus sign and plain decimal digits. Anything else is NaN.
pub(crate) fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let well_formed = is_digits(whole)
        && fraction.is_none_or(is_digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// The XPath `string()` form of a number: no exponent, no trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Also folds negative zero.
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// The XPath `string()` conversion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => match nodes.first() {
                Some(node) => f.write_str(&node.string_value()),
                None => Ok(()),
            },
            XPathValue::String(s) => f.write_str(s),
            XPathValue::Number(n) => f.write_str(&format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Everything an expression can see while it runs.
///
/// `'a` borrows the tree, `'d` the bindings the caller owns.
pub struct EvaluationContext<'a, 'd, N: DataSourceNode<'a>> {
    pub context_node: N,
    /// What absolute paths and `id()` start from.
    pub root_node: N,
    /// 1-based.
    pub context_position: usize,
    pub context_size: usize,
    pub namespaces: &'d HashMap<String, String>,
    /// Receives every prefixed function call; without one those calls fail.
    pub extensions: Option<&'d dyn ExtensionResolver<'a, N>>,
    _tree: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DataSourceNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        namespaces: &'d HashMap<String, String>,
        extensions: Option<&'d dyn ExtensionResolver<'a, N>>,
    ) -> Self {
        Self {
            context_node,
            root_node,
            context_position: 1,
            context_size: 1,
            namespaces,
            extensions,
            _tree: PhantomData,
        }
    }

    /// The same bindings focused on `node` at `position` of `size`.
    pub fn with_focus(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            context_position: position,
            context_size: size,
            ..*self
        }
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Result<&'d str, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.namespaces
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| XPathError::UnknownPrefix(prefix.to_string()))
    }
}

// Manual impls: a derive would also require `N: Clone` through the marker.
impl<'a, 'd, N: DataSourceNode<'a>> Clone for EvaluationContext<'a, 'd, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, 'd, N: DataSourceNode<'a>> Copy for EvaluationContext<'a, 'd, N> {}

pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::Variable(name) => Err(XPathError::UnknownVariable(name.clone())),
        Expression::FunctionCall { name, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, e_ctx))
                .collect::<Result<Vec<_>, _>>()?;
            functions::evaluate_function(name, values, e_ctx)
        }
        // The right operand of `or`/`and` only runs when it decides the result.
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } => Ok(XPathValue::Boolean(
            evaluate(left, e_ctx)?.to_bool() || evaluate(right, e_ctx)?.to_bool(),
        )),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => Ok(XPathValue::Boolean(
            evaluate(left, e_ctx)?.to_bool() && evaluate(right, e_ctx)?.to_bool(),
        )),
        Expression::BinaryOp { left, op, right } => {
            operators::evaluate(*op, evaluate(left, e_ctx)?, evaluate(right, e_ctx)?)
        }
        Expression::Negate(inner) => Ok(XPathValue::Number(-evaluate(inner, e_ctx)?.to_number())),
        Expression::Filter { base, predicates } => {
            let nodes = expect_node_set(evaluate(base, e_ctx)?, "a filter expression")?;
            Ok(XPathValue::NodeSet(apply_predicates(nodes, predicates, e_ctx)?))
        }
        Expression::LocationPath(path) => Ok(XPathValue::NodeSet(select_path(path, e_ctx)?)),
    }
}

fn expect_node_set<'a, N: DataSourceNode<'a>>(
    value: XPathValue<N>,
    usage: &str,
) -> Result<Vec<N>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::TypeError(format!(
            "{} needs a node-set, got a {}",
            usage,
            other.type_name()
        ))),
    }
}

fn select_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut nodes = match &path.origin {
        PathOrigin::ContextNode => vec![e_ctx.context_node],
        PathOrigin::Root => vec![e_ctx.root_node],
        PathOrigin::Expression(start) => {
            expect_node_set(evaluate(start, e_ctx)?, "a location step")?
        }
    };
    for step in &path.steps {
        nodes = apply_step(step, &nodes, e_ctx)?;
    }
    Ok(nodes)
}

/// Predicates run per context node, so `item[1]` is the first item of every
/// parent. The merged selection is returned in document order.
fn apply_step<'a, N>(
    step: &Step,
    context: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let test = Matcher::resolve(&step.test, e_ctx)?;
    let principal = match step.axis {
        Axis::Attribute => NodeType::Attribute,
        _ => NodeType::Element,
    };
    let mut selected = BTreeSet::new();
    for &node in context {
        let candidates: Vec<N> = axes::along(step.axis, node)
            .into_iter()
            .filter(|candidate| test.matches(candidate, principal))
            .collect();
        selected.extend(apply_predicates(candidates, &step.predicates, e_ctx)?);
    }
    Ok(selected.into_iter().collect())
}

fn apply_predicates<'a, N>(
    mut nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    for predicate in predicates {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let position = index + 1;
            let focus = e_ctx.with_focus(node, position, size);
            // A number is shorthand for `position() = number`.
            let keep = match evaluate(predicate, &focus)? {
                XPathValue::Number(n) => n == position as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    Ok(nodes)
}

/// A node test with its prefix resolved.
#[derive(Debug, Clone, PartialEq)]
enum Matcher<'t> {
    Any,
    AnyIn(&'t str),
    Named {
        namespace: Option<&'t str>,
        local: &'t str,
    },
    Node,
    Kind(NodeType),
    Instruction(Option<&'t str>),
}

impl<'t> Matcher<'t> {
    fn resolve<'a, 'd: 't, N: DataSourceNode<'a>>(
        test: &'t NodeTest,
        e_ctx: &EvaluationContext<'a, 'd, N>,
    ) -> Result<Self, XPathError> {
        Ok(match test {
            NodeTest::AnyName => Matcher::Any,
            NodeTest::AnyNameIn(prefix) => Matcher::AnyIn(e_ctx.resolve_prefix(prefix)?),
            NodeTest::Name { prefix, local } => Matcher::Named {
                namespace: match prefix {
                    Some(prefix) => Some(e_ctx.resolve_prefix(prefix)?),
                    None => None,
                },
                local: local.as_str(),
            },
            NodeTest::Node => Matcher::Node,
            NodeTest::Text => Matcher::Kind(NodeType::Text),
            NodeTest::Comment => Matcher::Kind(NodeType::Comment),
            NodeTest::ProcessingInstruction(target) => Matcher::Instruction(target.as_deref()),
        })
    }

    /// Name tests only select the principal node type of the axis.
    fn matches<'a, N: DataSourceNode<'a>>(&self, node: &N, principal: NodeType) -> bool {
        let node_type = node.node_type();
        match self {
            Matcher::Node => true,
            Matcher::Kind(kind) => node_type == *kind,
            Matcher::Instruction(target) => {
                node_type == NodeType::ProcessingInstruction
                    && target.is_none_or(|t| node.name().is_some_and(|q| q.local_part == t))
            }
            Matcher::Any => node_type == principal,
            Matcher::AnyIn(uri) => {
                node_type == principal && node.name().is_some_and(|q| q.namespace == Some(*uri))
            }
            Matcher::Named { namespace, local } => {
                node_type == principal
                    && node
                        .name()
                        .is_some_and(|q| q.local_part == *local && q.namespace == *namespace)
            }
        }
    }
}
