//! XPath 1.0 expression parser built from `nom` combinators.
//!
//! Every token parser skips the whitespace in front of it, so the grammar
//! functions below read like the productions of the XPath 1.0 grammar.

use crate::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, PathOrigin, Step};
use crate::error::XPathError;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit0, digit1, multispace0, satisfy};
use nom::combinator::{map, map_opt, map_res, not, opt, recognize, value};
use nom::error::ErrorKind;
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};

type PResult<'a, T> = IResult<&'a str, T>;
type PError<'a> = nom::error::Error<&'a str>;

/// Parses a complete expression. Trailing input is an error.
pub fn parse_expression(query: &str) -> Result<Expression, XPathError> {
    let failure = |rest: &str, reason: String| {
        let offset = query.len() - rest.len();
        XPathError::XPathParse(query.to_string(), format!("{} at offset {}", reason, offset))
    };
    match terminated(or_expr, multispace0).parse(query) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(failure(rest, format!("unexpected `{}`", rest))),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(failure(e.input, "invalid expression".to_string()))
        }
        Err(nom::Err::Incomplete(_)) => Err(failure("", "unexpected end".to_string())),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn sym<'a>(token: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = PError<'a>> {
    preceded(multispace0, tag(token))
}

/// An operator name such as `div`; `division` is a name, not `div` + `ision`.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = PError<'a>> {
    terminated(sym(word), not(satisfy(is_name_char)))
}

fn nc_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char))).parse(input)
}

fn qualified_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

// --- Operators, loosest first ---

/// One left-associative precedence level: `operand (operator operand)*`.
fn binary_level<'a>(
    input: &'a str,
    operand: fn(&'a str) -> PResult<'a, Expression>,
    operator: fn(&'a str) -> PResult<'a, BinaryOperator>,
) -> PResult<'a, Expression> {
    let (mut input, mut left) = operand(input)?;
    loop {
        match pair(operator, operand).parse(input) {
            Ok((rest, (op, right))) => {
                left = Expression::binary(left, op, right);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        }
    }
}

fn or_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, and_expr, or_op)
}

fn and_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, equality_expr, and_op)
}

fn equality_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, relational_expr, equality_op)
}

fn relational_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, additive_expr, relational_op)
}

fn additive_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, multiplicative_expr, additive_op)
}

fn multiplicative_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, unary_expr, multiplicative_op)
}

fn union_expr(input: &str) -> PResult<'_, Expression> {
    binary_level(input, path_expr, union_op)
}

fn or_op(input: &str) -> PResult<'_, BinaryOperator> {
    value(BinaryOperator::Or, keyword("or")).parse(input)
}

fn and_op(input: &str) -> PResult<'_, BinaryOperator> {
    value(BinaryOperator::And, keyword("and")).parse(input)
}

fn equality_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::NotEquals, sym("!=")),
        value(BinaryOperator::Equals, sym("=")),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::LessThanOrEqual, sym("<=")),
        value(BinaryOperator::GreaterThanOrEqual, sym(">=")),
        value(BinaryOperator::LessThan, sym("<")),
        value(BinaryOperator::GreaterThan, sym(">")),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Plus, sym("+")),
        value(BinaryOperator::Minus, sym("-")),
    ))
    .parse(input)
}

// In operator position `*` is multiplication; in operand position it is a
// name test and never reaches this parser.
fn multiplicative_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Multiply, sym("*")),
        value(BinaryOperator::Divide, keyword("div")),
        value(BinaryOperator::Modulo, keyword("mod")),
    ))
    .parse(input)
}

fn union_op(input: &str) -> PResult<'_, BinaryOperator> {
    value(BinaryOperator::Union, sym("|")).parse(input)
}

fn unary_expr(input: &str) -> PResult<'_, Expression> {
    let (input, signs) = many0(sym("-")).parse(input)?;
    let (input, operand) = union_expr(input)?;
    let expr = signs
        .iter()
        .fold(operand, |inner, _| Expression::Negate(Box::new(inner)));
    Ok((input, expr))
}

// --- Paths ---

/// `FilterExpr (('/' | '//') RelativeLocationPath)?` or a plain location path.
fn path_expr(input: &str) -> PResult<'_, Expression> {
    match filter_expr(input) {
        Ok((rest, base)) => {
            let (rest, steps) = relative_steps(rest)?;
            if steps.is_empty() {
                return Ok((rest, base));
            }
            let path = LocationPath {
                origin: PathOrigin::Expression(Box::new(base)),
                steps,
            };
            Ok((rest, Expression::LocationPath(path)))
        }
        Err(nom::Err::Error(_)) => map(location_path, Expression::LocationPath).parse(input),
        Err(e) => Err(e),
    }
}

fn filter_expr(input: &str) -> PResult<'_, Expression> {
    let (input, base) = primary_expr(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    if predicates.is_empty() {
        return Ok((input, base));
    }
    let filter = Expression::Filter {
        base: Box::new(base),
        predicates,
    };
    Ok((input, filter))
}

/// `true` for `//`.
fn separator(input: &str) -> PResult<'_, bool> {
    alt((value(true, sym("//")), value(false, sym("/")))).parse(input)
}

/// Any number of `/step` and `//step`, with `//` expanded.
fn relative_steps(input: &str) -> PResult<'_, Vec<Step>> {
    let (input, pairs) = many0(pair(separator, step)).parse(input)?;
    let mut steps = Vec::with_capacity(pairs.len());
    for (descend, next) in pairs {
        if descend {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next);
    }
    Ok((input, steps))
}

fn location_path(input: &str) -> PResult<'_, LocationPath> {
    if let Ok((rest, descend)) = separator(input) {
        return absolute_path(rest, descend);
    }
    let (input, first) = step(input)?;
    let (input, more) = relative_steps(input)?;
    let mut steps = vec![first];
    steps.extend(more);
    Ok((
        input,
        LocationPath {
            origin: PathOrigin::ContextNode,
            steps,
        },
    ))
}

fn absolute_path(input: &str, descend: bool) -> PResult<'_, LocationPath> {
    let (input, first) = match step(input) {
        Ok(parsed) => parsed,
        // A lone `/` selects the root; `//` needs a step after it.
        Err(nom::Err::Error(_)) if !descend => {
            let root = LocationPath {
                origin: PathOrigin::Root,
                steps: Vec::new(),
            };
            return Ok((input, root));
        }
        Err(e) => return Err(e),
    };
    let (input, more) = relative_steps(input)?;
    let mut steps = Vec::with_capacity(more.len() + 2);
    if descend {
        steps.push(Step::descendant_or_self());
    }
    steps.push(first);
    steps.extend(more);
    Ok((
        input,
        LocationPath {
            origin: PathOrigin::Root,
            steps,
        },
    ))
}

fn step(input: &str) -> PResult<'_, Step> {
    let (input, (axis, test)) = alt((
        value((Axis::Parent, NodeTest::Node), sym("..")),
        value((Axis::SelfNode, NodeTest::Node), sym(".")),
        map(preceded(sym("@"), node_test), |test| (Axis::Attribute, test)),
        map(pair(opt(axis_name), node_test), |(axis, test)| {
            (axis.unwrap_or(Axis::Child), test)
        }),
    ))
    .parse(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    Ok((
        input,
        Step {
            axis,
            test,
            predicates,
        },
    ))
}

fn axis_name(input: &str) -> PResult<'_, Axis> {
    map_opt(
        terminated(preceded(multispace0, nc_name), sym("::")),
        Axis::from_name,
    )
    .parse(input)
}

fn node_test(input: &str) -> PResult<'_, NodeTest> {
    preceded(
        multispace0,
        alt((value(NodeTest::AnyName, tag("*")), kind_test, name_test)),
    )
    .parse(input)
}

fn kind_test(input: &str) -> PResult<'_, NodeTest> {
    let (rest, kind) = terminated(nc_name, sym("(")).parse(input)?;
    let (rest, test) = match kind {
        "node" => (rest, NodeTest::Node),
        "text" => (rest, NodeTest::Text),
        "comment" => (rest, NodeTest::Comment),
        "processing-instruction" => {
            let (rest, target) = opt(string_literal).parse(rest)?;
            (rest, NodeTest::ProcessingInstruction(target))
        }
        _ => return Err(nom::Err::Error(PError::new(input, ErrorKind::Tag))),
    };
    let (rest, _) = sym(")").parse(rest)?;
    Ok((rest, test))
}

fn name_test(input: &str) -> PResult<'_, NodeTest> {
    let (rest, first) = nc_name(input)?;
    if let Some(after) = rest.strip_prefix(":*") {
        return Ok((after, NodeTest::AnyNameIn(first.to_string())));
    }
    if let Some(after) = rest.strip_prefix(':')
        && let Ok((after, local)) = nc_name(after)
    {
        return Ok((after, NodeTest::name(Some(first), local)));
    }
    Ok((rest, NodeTest::name(None, first)))
}

fn predicate(input: &str) -> PResult<'_, Expression> {
    delimited(sym("["), or_expr, sym("]")).parse(input)
}

// --- Primary expressions ---

fn primary_expr(input: &str) -> PResult<'_, Expression> {
    alt((
        map(preceded(sym("$"), qualified_name), |name: &str| {
            Expression::Variable(name.to_string())
        }),
        map(string_literal, Expression::Literal),
        map(number, Expression::Number),
        delimited(sym("("), or_expr, sym(")")),
        function_call,
    ))
    .parse(input)
}

fn quoted<'a>(quote: char) -> impl Parser<&'a str, Output = &'a str, Error = PError<'a>> {
    delimited(char(quote), take_while(move |c| c != quote), char(quote))
}

fn string_literal(input: &str) -> PResult<'_, String> {
    map(
        preceded(multispace0, alt((quoted('"'), quoted('\'')))),
        |text: &str| text.to_string(),
    )
    .parse(input)
}

// Only `Digits ('.' Digits?)?` and `'.' Digits`: no sign, exponent, `inf` or `nan`.
fn number(input: &str) -> PResult<'_, f64> {
    map_res(
        preceded(
            multispace0,
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
        ),
        |digits: &str| digits.parse::<f64>(),
    )
    .parse(input)
}

fn function_call(input: &str) -> PResult<'_, Expression> {
    let (rest, name) = preceded(multispace0, qualified_name).parse(input)?;
    if matches!(name, "node" | "text" | "comment" | "processing-instruction") {
        return Err(nom::Err::Error(PError::new(input, ErrorKind::Verify)));
    }
    let (rest, args) =
        delimited(sym("("), separated_list0(sym(","), or_expr), sym(")")).parse(rest)?;
    Ok((
        rest,
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        },
    ))
}
