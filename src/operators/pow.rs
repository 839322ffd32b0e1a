//! Integer powers `f ** n` and scalar exponentials `a ** f`.

use crate::errors::NodeError;
use crate::expr::{
    format_scalar, operand, take_children, Node, OpKind, Operator, StructuralInfo,
};

/// `f ** n` for an integer exponent `n`
pub(crate) struct Power {
    pub(crate) base: Node,
    pub(crate) exponent: i32,
}

impl Operator for Power {
    fn kind(&self) -> &'static str {
        "Power"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.base.evaluate(x).powi(self.exponent)
    }

    // (f ** n)' = n * (f ** (n - 1) * f')
    fn derivative(&self) -> Node {
        let n = self.exponent;
        (self.base.power(n.saturating_sub(1)) * self.base.derivative()).scalar_mul(f64::from(n))
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} ** {}",
            operand(&self.base, inner)?,
            self.exponent
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.base.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok(format!("** {}", self.exponent))
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [base] = take_children(self.kind(), children)?;
        Ok(base.power(self.exponent))
    }

    fn as_constant(&self) -> Option<f64> {
        if self.exponent == 0 {
            return Some(1.0);
        }
        self.base.as_constant().map(|c| c.powi(self.exponent))
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo {
            kind: OpKind::Power,
            left: Some(self.base.clone()),
            left_const: self.base.as_constant(),
            right: None,
            right_const: Some(f64::from(self.exponent)),
        })
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        match self.exponent {
            1 => Some(self.base.clone()),
            // f ** 2 -> f * f
            2 => Some(&self.base * &self.base),
            _ => None,
        }
    }
}

/// `a ** f` for a constant base `a`
pub(crate) struct ScalarExponential {
    pub(crate) base: f64,
    pub(crate) exponent: Node,
}

impl Operator for ScalarExponential {
    fn kind(&self) -> &'static str {
        "ScalarExponential"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.base.powf(self.exponent.evaluate(x))
    }

    // (a ** f)' = ln(a) * (a ** f * f')
    fn derivative(&self) -> Node {
        (Node::scalar_exp(self.base, self.exponent.clone()) * self.exponent.derivative())
            .scalar_mul(self.base.ln())
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} ** {}",
            format_scalar(self.base),
            operand(&self.exponent, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.exponent.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok(format!("{} **", format_scalar(self.base)))
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [exponent] = take_children(self.kind(), children)?;
        Ok(Node::scalar_exp(self.base, exponent))
    }

    fn as_constant(&self) -> Option<f64> {
        if self.base == 0.0 {
            return Some(0.0);
        }
        if self.base == 1.0 {
            return Some(1.0);
        }
        self.exponent.as_constant().map(|c| self.base.powf(c))
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::scalar(
            OpKind::ScalarExponential,
            self.base,
            &self.exponent,
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        self.as_constant().map(Node::constant)
    }
}
