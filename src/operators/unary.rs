//! Unary plus and negation.

use crate::errors::NodeError;
use crate::expr::{operand, take_children, Node, OpKind, Operator, StructuralInfo};

/// `+f`
pub(crate) struct UnaryPlus(pub(crate) Node);

impl Operator for UnaryPlus {
    fn kind(&self) -> &'static str {
        "UnaryPlus"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.0.evaluate(x)
    }

    fn derivative(&self) -> Node {
        self.0.derivative().pos()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!("+{}", operand(&self.0, inner)?))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.0.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("+".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [f] = take_children(self.kind(), children)?;
        Ok(f.pos())
    }

    fn as_constant(&self) -> Option<f64> {
        self.0.as_constant()
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(OpKind::UnaryPlus, &self.0, None))
    }

    // +f -> f
    fn local_rewrite(&self) -> Option<Node> {
        Some(self.0.clone())
    }
}

/// `-f`
pub(crate) struct Negation(pub(crate) Node);

impl Operator for Negation {
    fn kind(&self) -> &'static str {
        "Negation"
    }

    fn evaluate(&self, x: f64) -> f64 {
        -self.0.evaluate(x)
    }

    fn derivative(&self) -> Node {
        -self.0.derivative()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        Ok(format!("-{}", operand(&self.0, inner)?))
    }

    fn children(&self) -> Vec<Node> {
        vec![self.0.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("-".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [f] = take_children(self.kind(), children)?;
        Ok(-f)
    }

    fn as_constant(&self) -> Option<f64> {
        self.0.as_constant().map(|c| -c)
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(OpKind::Negation, &self.0, None))
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        // -(-f) -> f
        let info = self.0.structural_info()?;
        match info.kind {
            OpKind::Negation => info.left,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_plus_rewrites_to_operand() {
        let f = Node::sin();
        let plus = f.pos();
        assert!(Node::same(&plus.local_rewrite().unwrap(), &f));
        assert_eq!(Node::constant(2.0).pos().as_constant(), Some(2.0));
        assert_eq!(plus.description().unwrap(), "+sin(X)");
    }

    #[test]
    fn test_double_negation() {
        let f = Node::x().power(3);
        let double = -(-f.clone());
        assert!(Node::same(&double.local_rewrite().unwrap(), &f));
        assert!((-f.clone()).local_rewrite().is_none());
        assert_eq!(double.description().unwrap(), "-(-(X ** 3))");
    }

    #[test]
    fn test_negated_constant_folds() {
        let neg = -Node::constant(2.0);
        assert_eq!(neg.as_constant(), Some(-2.0));
        assert_eq!(neg.local_rewrite().unwrap().as_constant(), Some(-2.0));
    }

    #[test]
    fn test_negation_derivative() {
        let f = -Node::sin();
        assert!((f.derivative().evaluate(0.0) + 1.0).abs() < 1e-12);
    }
}
