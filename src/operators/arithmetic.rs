//! Binary arithmetic and the scalar forms of multiplication and division.
//!
//! Besides evaluation and differentiation, each operator carries the algebraic identities the
//! optimizer applies through `as_constant` and `local_rewrite`:
//!
//! - Constant folding of fully constant operands
//! - Additive identities: `0 + f → f`, `f + 0 → f`, `0 - f → -f`, `f - 0 → f`
//! - Re-association of a leading constant into a nested sum or difference,
//!   e.g. `a + (b + f) → (a + b) + f` and `a - (b - f) → (a - b) + f`
//! - Multiplicative identities: `0 * f → 0`, `1 * f → f`, `a * (b * f) → (a * b) * f`
//! - Canonicalization of `f * g` with one constant side into the scalar form `a * f`
//! - Division: `0 / f → 0`, `f / a → (1 / a) * f`, `a / f` into the scalar form
//!
//! Nested patterns are only recognised with the constant on the left of the outer operator.

use crate::errors::NodeError;
use crate::expr::{
    format_scalar, operand, take_children, Node, OpKind, Operator, StructuralInfo,
};

pub(crate) fn sum(left: Node, right: Node) -> Node {
    Node::new(Sum { left, right })
}

pub(crate) fn difference(left: Node, right: Node) -> Node {
    Node::new(Difference { left, right })
}

pub(crate) fn product(left: Node, right: Node) -> Node {
    Node::new(Product { left, right })
}

pub(crate) fn quotient(left: Node, right: Node) -> Node {
    Node::new(Quotient { left, right })
}

fn scalar_quotient(scalar: f64, operand: Node) -> Node {
    Node::new(ScalarQuotient { scalar, operand })
}

fn is_zero(value: Option<f64>) -> bool {
    value == Some(0.0)
}

fn is_one(value: Option<f64>) -> bool {
    value == Some(1.0)
}

/// `f + g`
pub(crate) struct Sum {
    pub(crate) left: Node,
    pub(crate) right: Node,
}

impl Operator for Sum {
    fn kind(&self) -> &'static str {
        "Sum"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.left.evaluate(x) + self.right.evaluate(x)
    }

    // (f + g)' = f' + g'
    fn derivative(&self) -> Node {
        sum(self.left.derivative(), self.right.derivative())
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} + {}",
            operand(&self.left, inner)?,
            operand(&self.right, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("+".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [left, right] = take_children(self.kind(), children)?;
        Ok(sum(left, right))
    }

    fn as_constant(&self) -> Option<f64> {
        Some(self.left.as_constant()? + self.right.as_constant()?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(
            OpKind::Sum,
            &self.left,
            Some(&self.right),
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        let (lc, rc) = (self.left.as_constant(), self.right.as_constant());
        if let (Some(a), Some(b)) = (lc, rc) {
            return Some(Node::constant(a + b));
        }
        if is_zero(lc) {
            return Some(self.right.clone());
        }
        if is_zero(rc) {
            return Some(self.left.clone());
        }

        let a = lc?;
        let info = self.right.structural_info()?;
        match info.kind {
            // a + (b + f) -> (a + b) + f,  a + (f + b) -> (a + b) + f
            OpKind::Sum => {
                if let Some((b, f)) = info.leading_constant() {
                    Some(sum(Node::constant(a + b), f))
                } else {
                    let (f, b) = info.trailing_constant()?;
                    Some(sum(Node::constant(a + b), f))
                }
            }
            // a + (b - f) -> (a + b) - f,  a + (f - b) -> (a - b) + f
            OpKind::Difference => {
                if let Some((b, f)) = info.leading_constant() {
                    Some(difference(Node::constant(a + b), f))
                } else {
                    let (f, b) = info.trailing_constant()?;
                    Some(sum(Node::constant(a - b), f))
                }
            }
            _ => None,
        }
    }
}

/// `f - g`
pub(crate) struct Difference {
    pub(crate) left: Node,
    pub(crate) right: Node,
}

impl Operator for Difference {
    fn kind(&self) -> &'static str {
        "Difference"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.left.evaluate(x) - self.right.evaluate(x)
    }

    // (f - g)' = f' - g'
    fn derivative(&self) -> Node {
        difference(self.left.derivative(), self.right.derivative())
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} - {}",
            operand(&self.left, inner)?,
            operand(&self.right, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("-".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [left, right] = take_children(self.kind(), children)?;
        Ok(difference(left, right))
    }

    fn as_constant(&self) -> Option<f64> {
        Some(self.left.as_constant()? - self.right.as_constant()?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(
            OpKind::Difference,
            &self.left,
            Some(&self.right),
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        let (lc, rc) = (self.left.as_constant(), self.right.as_constant());
        if let (Some(a), Some(b)) = (lc, rc) {
            return Some(Node::constant(a - b));
        }
        if is_zero(lc) {
            return Some(-self.right.clone());
        }
        if is_zero(rc) {
            return Some(self.left.clone());
        }

        let a = lc?;
        let info = self.right.structural_info()?;
        match info.kind {
            // a - (b - f) -> (a - b) + f,  a - (f - b) -> (a + b) - f
            OpKind::Difference => {
                if let Some((b, f)) = info.leading_constant() {
                    Some(sum(Node::constant(a - b), f))
                } else {
                    let (f, b) = info.trailing_constant()?;
                    Some(difference(Node::constant(a + b), f))
                }
            }
            // a - (b + f) -> (a - b) - f,  a - (f + b) -> (a - b) - f
            OpKind::Sum => {
                if let Some((b, f)) = info.leading_constant() {
                    Some(difference(Node::constant(a - b), f))
                } else {
                    let (f, b) = info.trailing_constant()?;
                    Some(difference(Node::constant(a - b), f))
                }
            }
            _ => None,
        }
    }
}

/// `a * f` for a scalar `a`
pub(crate) struct ScalarProduct {
    pub(crate) scalar: f64,
    pub(crate) operand: Node,
}

impl Operator for ScalarProduct {
    fn kind(&self) -> &'static str {
        "ScalarProduct"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.scalar * self.operand.evaluate(x)
    }

    // (a * f)' = a * f'
    fn derivative(&self) -> Node {
        self.operand.derivative().scalar_mul(self.scalar)
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} * {}",
            format_scalar(self.scalar),
            operand(&self.operand, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.operand.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok(format!("{} *", format_scalar(self.scalar)))
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [operand] = take_children(self.kind(), children)?;
        Ok(operand.scalar_mul(self.scalar))
    }

    fn as_constant(&self) -> Option<f64> {
        if self.scalar == 0.0 {
            return Some(0.0);
        }
        Some(self.scalar * self.operand.as_constant()?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::scalar(
            OpKind::ScalarProduct,
            self.scalar,
            &self.operand,
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        if self.scalar == 1.0 {
            return Some(self.operand.clone());
        }
        // a * (b * f) -> (a * b) * f
        let info = self.operand.structural_info()?;
        match info.kind {
            OpKind::ScalarProduct => {
                let (b, f) = info.leading_constant()?;
                Some(f.scalar_mul(self.scalar * b))
            }
            _ => None,
        }
    }
}

/// `f * g`
pub(crate) struct Product {
    pub(crate) left: Node,
    pub(crate) right: Node,
}

impl Operator for Product {
    fn kind(&self) -> &'static str {
        "Product"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.left.evaluate(x) * self.right.evaluate(x)
    }

    // (f * g)' = f' * g + f * g'
    fn derivative(&self) -> Node {
        sum(
            product(self.left.derivative(), self.right.clone()),
            product(self.left.clone(), self.right.derivative()),
        )
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} * {}",
            operand(&self.left, inner)?,
            operand(&self.right, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("*".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [left, right] = take_children(self.kind(), children)?;
        Ok(product(left, right))
    }

    fn as_constant(&self) -> Option<f64> {
        let (lc, rc) = (self.left.as_constant(), self.right.as_constant());
        if is_zero(lc) || is_zero(rc) {
            return Some(0.0);
        }
        Some(lc? * rc?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(
            OpKind::Product,
            &self.left,
            Some(&self.right),
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        let (lc, rc) = (self.left.as_constant(), self.right.as_constant());
        if is_one(lc) {
            return Some(self.right.clone());
        }
        if is_one(rc) {
            return Some(self.left.clone());
        }
        match (lc, rc) {
            (Some(a), None) => Some(self.right.scalar_mul(a)),
            (None, Some(b)) => Some(self.left.scalar_mul(b)),
            _ => None,
        }
    }
}

/// `a / f` for a scalar `a`
pub(crate) struct ScalarQuotient {
    pub(crate) scalar: f64,
    pub(crate) operand: Node,
}

impl Operator for ScalarQuotient {
    fn kind(&self) -> &'static str {
        "ScalarQuotient"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.scalar / self.operand.evaluate(x)
    }

    // (a / f)' = a * (1/u)'(f) * f' = (-a) * (f ** -2 * f')
    fn derivative(&self) -> Node {
        product(self.operand.power(-2), self.operand.derivative()).scalar_mul(-self.scalar)
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} / {}",
            format_scalar(self.scalar),
            operand(&self.operand, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.operand.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok(format!("{} /", format_scalar(self.scalar)))
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [operand] = take_children(self.kind(), children)?;
        Ok(scalar_quotient(self.scalar, operand))
    }

    fn as_constant(&self) -> Option<f64> {
        if self.scalar == 0.0 {
            return Some(0.0);
        }
        Some(self.scalar / self.operand.as_constant()?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::scalar(
            OpKind::ScalarQuotient,
            self.scalar,
            &self.operand,
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        self.as_constant().map(Node::constant)
    }
}

/// `f / g`
pub(crate) struct Quotient {
    pub(crate) left: Node,
    pub(crate) right: Node,
}

impl Operator for Quotient {
    fn kind(&self) -> &'static str {
        "Quotient"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.left.evaluate(x) / self.right.evaluate(x)
    }

    // (f / g)' = (f' * g - f * g') / g ** 2
    fn derivative(&self) -> Node {
        quotient(
            difference(
                product(self.left.derivative(), self.right.clone()),
                product(self.left.clone(), self.right.derivative()),
            ),
            self.right.power(2),
        )
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!(
            "{} / {}",
            operand(&self.left, inner)?,
            operand(&self.right, inner)?
        ))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("/".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [left, right] = take_children(self.kind(), children)?;
        Ok(quotient(left, right))
    }

    fn as_constant(&self) -> Option<f64> {
        let lc = self.left.as_constant();
        if is_zero(lc) {
            return Some(0.0);
        }
        Some(lc? / self.right.as_constant()?)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(
            OpKind::Quotient,
            &self.left,
            Some(&self.right),
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        match (self.left.as_constant(), self.right.as_constant()) {
            // f / a -> (1 / a) * f
            (None, Some(b)) => Some(self.left.scalar_mul(1.0 / b)),
            (Some(a), None) => Some(scalar_quotient(a, self.right.clone())),
            _ => None,
        }
    }
}
