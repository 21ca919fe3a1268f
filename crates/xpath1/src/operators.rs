//! Binary operators with the XPath 1.0 comparison and conversion rules.

use crate::ast::BinaryOperator;
use crate::datasource::DataSourceNode;
use crate::engine::{XPathValue, parse_number};
use crate::error::XPathError;
use std::cmp::Ordering;

/// Applies a binary operator to two already evaluated operands.
///
/// The engine short-circuits `or` and `and` itself; they are handled here too
/// so the function is total over [`BinaryOperator`].
pub fn evaluate<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match op {
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals => Ok(XPathValue::Boolean(evaluate_equality(&left, &right, true))),
        BinaryOperator::NotEquals => {
            Ok(XPathValue::Boolean(evaluate_equality(&left, &right, false)))
        }
        BinaryOperator::LessThan => evaluate_relational(&left, &right, |ord| ord == Ordering::Less),
        BinaryOperator::LessThanOrEqual => {
            evaluate_relational(&left, &right, |ord| ord != Ordering::Greater)
        }
        BinaryOperator::GreaterThan => {
            evaluate_relational(&left, &right, |ord| ord == Ordering::Greater)
        }
        BinaryOperator::GreaterThanOrEqual => {
            evaluate_relational(&left, &right, |ord| ord != Ordering::Less)
        }
        BinaryOperator::Plus => evaluate_arithmetic(&left, &right, |a, b| a + b),
        BinaryOperator::Minus => evaluate_arithmetic(&left, &right, |a, b| a - b),
        BinaryOperator::Multiply => evaluate_arithmetic(&left, &right, |a, b| a * b),
        BinaryOperator::Divide => evaluate_arithmetic(&left, &right, |a, b| a / b),
        // Truncating remainder, which is what `%` on f64 already does.
        BinaryOperator::Modulo => evaluate_arithmetic(&left, &right, |a, b| a % b),
        BinaryOperator::Union => evaluate_union(left, right),
    }
}

fn string_values<'a, N: DataSourceNode<'a>>(nodes: &[N]) -> impl Iterator<Item = String> + '_ {
    nodes.iter().map(|n| n.string_value())
}

fn number_of(s: &str) -> f64 {
    parse_number(s)
}

/// `=` and `!=`. A comparison involving a node-set holds if it holds for
/// at least one node.
fn evaluate_equality<'a, N: DataSourceNode<'a>>(
    left: &XPathValue<N>,
    right: &XPathValue<N>,
    equals: bool,
) -> bool {
    let test_str = |a: &str, b: &str| (a == b) == equals;
    let test_num = |a: f64, b: f64| (a == b) == equals;
    let test_bool = |a: bool, b: bool| (a == b) == equals;

    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_strings: Vec<String> = string_values(r).collect();
            string_values(l).any(|ls| right_strings.iter().any(|rs| test_str(&ls, rs)))
        }
        (XPathValue::NodeSet(nodes), other) | (other, XPathValue::NodeSet(nodes)) => match other {
            XPathValue::Number(n) => string_values(nodes).any(|s| test_num(number_of(&s), *n)),
            XPathValue::String(s) => string_values(nodes).any(|v| test_str(&v, s)),
            XPathValue::Boolean(b) => test_bool(!nodes.is_empty(), *b),
            XPathValue::NodeSet(_) => false,
        },
        (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
            test_bool(left.to_bool(), right.to_bool())
        }
        (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
            test_num(left.to_number(), right.to_number())
        }
        _ => test_str(&left.to_string(), &right.to_string()),
    }
}

/// `<`, `<=`, `>` and `>=` always compare numbers.
fn evaluate_relational<'a, N, F>(
    left: &XPathValue<N>,
    right: &XPathValue<N>,
    predicate: F,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a>,
    F: Fn(Ordering) -> bool,
{
    let left_numbers = numbers_of(left);
    let right_numbers = numbers_of(right);
    let result = left_numbers.iter().any(|l| {
        right_numbers
            .iter()
            .any(|r| l.partial_cmp(r).is_some_and(&predicate))
    });
    Ok(XPathValue::Boolean(result))
}

fn numbers_of<'a, N: DataSourceNode<'a>>(value: &XPathValue<N>) -> Vec<f64> {
    match value {
        XPathValue::NodeSet(nodes) => string_values(nodes).map(|s| number_of(&s)).collect(),
        other => vec![other.to_number()],
    }
}

fn evaluate_arithmetic<'a, N, F>(
    left: &XPathValue<N>,
    right: &XPathValue<N>,
    op: F,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a>,
    F: Fn(f64, f64) -> f64,
{
    Ok(XPathValue::Number(op(left.to_number(), right.to_number())))
}

fn evaluate_union<'a, N: DataSourceNode<'a>>(
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match (left, right) {
        (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
            l.extend(r);
            l.sort();
            l.dedup();
            Ok(XPathValue::NodeSet(l))
        }
        (l, r) => Err(XPathError::TypeError(format!(
            "'|' needs two node-sets, got a {} and a {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}
