//! Conversion module for transforming evalexpr AST nodes into expression nodes.
//!
//! This module turns the operator tree produced by the evalexpr crate into our own
//! [`Node`] graph, which supports symbolic differentiation and optimization. Expressions
//! must mention at most one variable; whatever its name, it becomes the variable `X`.
//!
//! The main entry points are [`parse`], which goes straight from a string, and
//! [`build_node`], which recursively traverses an already parsed evalexpr tree.

use std::collections::BTreeSet;

use evalexpr::{build_operator_tree, Node as EvalNode, Operator, Value};
use itertools::Itertools;

use crate::errors::{ConvertError, GraphError};
use crate::expr::Node;

/// Parses an expression string into a node.
///
/// # Example
/// ```
/// use symdiff::convert::parse;
///
/// let f = parse("t^2 + sin(t)").unwrap();
/// assert_eq!(f.description().unwrap(), "(X ** 2) + sin(X)");
/// ```
pub fn parse(expression: &str) -> Result<Node, GraphError> {
    let tree: EvalNode = build_operator_tree(expression)?;
    Ok(build_node(&tree)?)
}

/// Converts an evalexpr AST node into an expression node.
///
/// # Supported operations
/// * Arithmetic: `+`, `-` (binary and unary), `*`, `/`
/// * Exponentiation: `f^n` for an integer constant `n`, `a^f` for a constant base `a`
/// * Constants: integer and floating point literals
/// * Functions: `sin`, `cos`, `ln`/`log`, `exp`
/// * A single variable of any name
///
/// # Errors
/// Returns `ConvertError::MultipleVariables` if more than one variable name occurs, and the
/// matching `ConvertError` variant for any unsupported operator, function or literal.
pub fn build_node(node: &EvalNode) -> Result<Node, ConvertError> {
    let variables = extract_symbols(node);
    if variables.len() > 1 {
        return Err(ConvertError::MultipleVariables(
            variables.iter().join(", "),
        ));
    }
    convert(node)
}

/// Collects the variable names read anywhere in the tree, sorted.
pub fn extract_symbols(node: &EvalNode) -> BTreeSet<String> {
    let mut symbols = BTreeSet::new();
    extract_symbols_from_node(node, &mut symbols);
    symbols
}

fn extract_symbols_from_node(node: &EvalNode, symbols: &mut BTreeSet<String>) {
    match node.operator() {
        Operator::VariableIdentifierRead { identifier } => {
            symbols.insert(identifier.to_string());
        }
        _ => {
            for child in node.children() {
                extract_symbols_from_node(child, symbols);
            }
        }
    }
}

fn convert(node: &EvalNode) -> Result<Node, ConvertError> {
    match node.operator() {
        // n-ary sums and products fold left into binary nodes
        Operator::Add => fold_operands(node, "+", |acc, next| acc + next),
        Operator::Mul => fold_operands(node, "*", |acc, next| acc * next),
        Operator::Sub => {
            let [left, right] = operands(node, "-")?;
            Ok(convert(left)? - convert(right)?)
        }
        Operator::Div => {
            let [left, right] = operands(node, "/")?;
            Ok(convert(left)? / convert(right)?)
        }
        Operator::Neg => {
            let [operand] = operands(node, "neg")?;
            Ok(-convert(operand)?)
        }
        Operator::Exp => {
            let [base, exponent] = operands(node, "^")?;
            convert_power(convert(base)?, convert(exponent)?)
        }
        Operator::Const { value } => match value {
            Value::Float(f) => Ok(Node::constant(*f)),
            Value::Int(i) => Ok(Node::constant(*i as f64)),
            _ => Err(ConvertError::ConstOperator(format!("{value:?}"))),
        },
        // Whatever its name, the single variable is X
        Operator::VariableIdentifierRead { .. } => Ok(Node::x()),
        Operator::FunctionIdentifier { identifier } => {
            let [argument] = operands(node, identifier)?;
            let argument = convert(argument)?;
            match identifier.as_str() {
                "sin" => Ok(Node::sin().rebuild(vec![argument])?),
                "cos" => Ok(Node::cos().rebuild(vec![argument])?),
                "ln" | "log" => Ok(Node::ln().rebuild(vec![argument])?),
                "exp" => Ok(Node::scalar_exp(std::f64::consts::E, argument)),
                _ => Err(ConvertError::UnsupportedFunction(identifier.to_string())),
            }
        }
        // Root node - should have exactly one child
        Operator::RootNode => {
            let children = node.children();
            if children.len() == 1 {
                convert(&children[0])
            } else {
                Err(ConvertError::RootNode(format!(
                    "expected a single child, got {}",
                    children.len()
                )))
            }
        }
        operator => Err(ConvertError::UnsupportedOperator(format!("{operator:?}"))),
    }
}

// An integer constant exponent gives `f ** n`; otherwise the base must be constant.
fn convert_power(base: Node, exponent: Node) -> Result<Node, ConvertError> {
    if let Some(n) = exponent.as_constant().and_then(integer_exponent) {
        return Ok(base.power(n));
    }
    if base.as_constant().is_some() {
        return Ok(base.power_of_exp(&exponent)?);
    }
    Err(ConvertError::ExpOperator(format!(
        "expected an integer exponent or a constant base, got {base} ^ {exponent}"
    )))
}

fn integer_exponent(value: f64) -> Option<i32> {
    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

fn operands<'a, const N: usize>(
    node: &'a EvalNode,
    operator: &str,
) -> Result<[&'a EvalNode; N], ConvertError> {
    let children = node.children();
    children
        .iter()
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| ConvertError::OperandCount {
            operator: operator.to_string(),
            expected: N,
            got: children.len(),
        })
}

fn fold_operands(
    node: &EvalNode,
    operator: &str,
    combine: impl Fn(Node, Node) -> Node,
) -> Result<Node, ConvertError> {
    let children = node.children();
    let (first, rest) = children
        .split_first()
        .ok_or_else(|| ConvertError::OperandCount {
            operator: operator.to_string(),
            expected: 2,
            got: 0,
        })?;
    rest.iter()
        .try_fold(
            convert(first)?,
            |acc, child| -> Result<Node, ConvertError> { Ok(combine(acc, convert(child)?)) },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(expression: &str) -> String {
        parse(expression)
            .unwrap()
            .description()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(describe("x + 1"), "X + 1.0");
        assert_eq!(describe("x - 2.5"), "X - 2.5");
        assert_eq!(describe("2 * x"), "2.0 * X");
        assert_eq!(describe("x / 4"), "X / 4.0");
        assert_eq!(describe("-x"), "-X");
        assert_eq!(describe("1 + x + x * x"), "(1.0 + X) + (X * X)");
    }

    #[test]
    fn test_powers() {
        assert_eq!(describe("x^3"), "X ** 3");
        assert_eq!(describe("x^(-2)"), "X ** -2");
        assert_eq!(describe("2^x"), "2.0 ** X");
        assert_eq!(describe("2^sin(x)"), "2.0 ** sin(X)");
        assert!(matches!(
            parse("x^x"),
            Err(GraphError::BuildNodeError(ConvertError::ExpOperator(_)))
        ));
        assert!(matches!(
            parse("x^0.5"),
            Err(GraphError::BuildNodeError(ConvertError::ExpOperator(_)))
        ));
    }

    #[test]
    fn test_functions() {
        assert_eq!(describe("sin(x)"), "sin(X)");
        assert!(Node::same(&parse("cos(y)").unwrap(), &Node::cos()));
        assert_eq!(describe("ln(x^2)"), "ln(X ** 2)");
        assert_eq!(describe("log(x + 1)"), "ln(X + 1.0)");
        let e = parse("exp(x)").unwrap();
        assert!((e.evaluate(1.0) - std::f64::consts::E).abs() < 1e-12);
        assert!(matches!(
            parse("sqrt(x)"),
            Err(GraphError::BuildNodeError(ConvertError::UnsupportedFunction(_)))
        ));
    }

    #[test]
    fn test_any_variable_name_is_x() {
        let f = parse("time * time").unwrap();
        assert_eq!(f.description().unwrap(), "X * X");
        assert_eq!(f.evaluate(3.0), 9.0);
        assert_eq!(parse("3 + 4").unwrap().evaluate(0.0), 7.0);
    }

    #[test]
    fn test_multiple_variables_rejected() {
        match parse("x + y") {
            Err(GraphError::BuildNodeError(ConvertError::MultipleVariables(names))) => {
                assert_eq!(names, "x, y");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_input() {
        assert!(matches!(
            parse("x % 2"),
            Err(GraphError::BuildNodeError(ConvertError::UnsupportedOperator(_)))
        ));
        assert!(matches!(
            parse("true"),
            Err(GraphError::BuildNodeError(ConvertError::ConstOperator(_)))
        ));
        assert!(matches!(
            parse("(x + 1"),
            Err(GraphError::BuildEvalexprError(_))
        ));
    }

    #[test]
    fn test_extract_symbols_sorted() {
        let tree: EvalNode = build_operator_tree("b * a + sin(b)").unwrap();
        let symbols: Vec<String> = extract_symbols(&tree).into_iter().collect();
        assert_eq!(symbols, ["a", "b"]);
    }
}
