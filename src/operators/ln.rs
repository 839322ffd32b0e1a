//! The natural logarithm of the variable.

use std::sync::OnceLock;

use super::compose;
use crate::errors::NodeError;
use crate::expr::{enclose, Node, Operator};

static LN: OnceLock<Node> = OnceLock::new();

/// The shared `ln(X)` node.
pub(crate) fn ln() -> Node {
    LN.get_or_init(|| Node::new(Logarithm)).clone()
}

pub(crate) struct Logarithm;

impl Operator for Logarithm {
    fn kind(&self) -> &'static str {
        "Logarithm"
    }

    fn evaluate(&self, x: f64) -> f64 {
        x.ln()
    }

    // ln'(x) = 1 / x
    fn derivative(&self) -> Node {
        1.0 / Node::x()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!("ln{}", enclose(inner)))
    }

    fn children(&self) -> Vec<Node> {
        vec![Node::x()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("Ln".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        compose::apply(ln(), self.kind(), children)
    }
}
