//! Nodes defined only by an evaluation and a derivative closure.

use crate::expr::{Node, Operator};
use crate::types::{DerivativeFunction, EvalFunction};

pub(crate) struct Custom {
    pub(crate) evaluate: EvalFunction,
    pub(crate) derivative: DerivativeFunction,
}

impl Operator for Custom {
    fn kind(&self) -> &'static str {
        "Custom"
    }

    fn evaluate(&self, x: f64) -> f64 {
        (self.evaluate)(x)
    }

    fn derivative(&self) -> Node {
        (self.derivative)()
    }
}
