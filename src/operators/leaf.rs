//! Leaf nodes: the variable and constants.

use crate::errors::NodeError;
use crate::expr::{Node, Operator};

/// The variable `X`. Only ever instantiated once, through [`Node::x`].
pub(crate) struct Variable;

impl Operator for Variable {
    fn kind(&self) -> &'static str {
        "Variable"
    }

    fn evaluate(&self, x: f64) -> f64 {
        x
    }

    fn derivative(&self) -> Node {
        Node::constant(1.0)
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(inner.to_string())
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("X".to_string())
    }

    fn rebuild(&self, _children: Vec<Node>) -> Result<Node, NodeError> {
        Ok(Node::x())
    }
}

/// A constant leaf.
pub(crate) struct Constant(pub(crate) f64);

impl Operator for Constant {
    fn kind(&self) -> &'static str {
        "Constant"
    }

    fn evaluate(&self, _x: f64) -> f64 {
        self.0
    }

    fn derivative(&self) -> Node {
        Node::constant(0.0)
    }

    fn render(&self, _inner: &str) -> Result<String, NodeError> {
        Ok(format!("{:?}", self.0))
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok(format!("{:?}", self.0))
    }

    fn rebuild(&self, _children: Vec<Node>) -> Result<Node, NodeError> {
        Ok(Node::constant(self.0))
    }

    fn as_constant(&self) -> Option<f64> {
        Some(self.0)
    }
}
