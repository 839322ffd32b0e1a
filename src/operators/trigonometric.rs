//! Sine and cosine of the variable, arguments in radians.

use std::sync::OnceLock;

use super::compose;
use crate::errors::NodeError;
use crate::expr::{enclose, Node, Operator};

static SIN: OnceLock<Node> = OnceLock::new();
static COS: OnceLock<Node> = OnceLock::new();

/// The shared `sin(X)` node.
pub(crate) fn sin() -> Node {
    SIN.get_or_init(|| Node::new(Sine)).clone()
}

/// The shared `cos(X)` node.
pub(crate) fn cos() -> Node {
    COS.get_or_init(|| Node::new(Cosine)).clone()
}

pub(crate) struct Sine;

impl Operator for Sine {
    fn kind(&self) -> &'static str {
        "Sine"
    }

    fn evaluate(&self, x: f64) -> f64 {
        x.sin()
    }

    fn derivative(&self) -> Node {
        cos()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!("sin{}", enclose(inner)))
    }

    fn children(&self) -> Vec<Node> {
        vec![Node::x()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("Sin".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        compose::apply(sin(), self.kind(), children)
    }
}

pub(crate) struct Cosine;

impl Operator for Cosine {
    fn kind(&self) -> &'static str {
        "Cosine"
    }

    fn evaluate(&self, x: f64) -> f64 {
        x.cos()
    }

    fn derivative(&self) -> Node {
        -sin()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!("cos{}", enclose(inner)))
    }

    fn children(&self) -> Vec<Node> {
        vec![Node::x()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("Cos".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        compose::apply(cos(), self.kind(), children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivatives_cycle() {
        let sin = Node::sin();
        let d1 = sin.derivative();
        assert!(Node::same(&d1, &Node::cos()));
        let d2 = d1.derivative();
        assert_eq!(d2.description().unwrap(), "-sin(X)");
        let at = 0.4_f64;
        assert!((d2.derivative().evaluate(at) + at.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_labels_and_render() {
        assert_eq!(Node::cos().label().unwrap(), "Cos");
        assert_eq!(Node::cos().render("Y").unwrap(), "cos(Y)");
        assert_eq!(Node::sin().render("(Y ** 2)").unwrap(), "sin(Y ** 2)");
    }
}
