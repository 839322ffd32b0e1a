//! Function composition `f ∘ g`.

use crate::errors::NodeError;
use crate::expr::{group, render_slot, take_children, Node, OpKind, Operator, StructuralInfo};

/// Rebuilds a function of the variable for a new argument.
///
/// The elementary functions (`ln`, `sin`, `cos`) are singletons of `X`; applying one to
/// anything other than `X` yields the composition `function ∘ argument`.
pub(crate) fn apply(
    function: Node,
    kind: &'static str,
    children: Vec<Node>,
) -> Result<Node, NodeError> {
    let [argument] = take_children(kind, children)?;
    if argument.is_variable() {
        Ok(function)
    } else {
        Ok(function.compose(&argument))
    }
}

/// `outer ∘ inner`, i.e. `outer(inner(x))`
pub(crate) struct Composition {
    pub(crate) outer: Node,
    pub(crate) inner: Node,
}

impl Operator for Composition {
    fn kind(&self) -> &'static str {
        "Composition"
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.outer.evaluate(self.inner.evaluate(x))
    }

    // (f ∘ g)' = (f' ∘ g) * g'
    fn derivative(&self) -> Node {
        self.outer.derivative().compose(&self.inner) * self.inner.derivative()
    }

    fn render(&self, inner: &str) -> Result<String, NodeError> {
        let argument = group(render_slot(&self.inner, inner)?);
        self.outer.render(&argument)
    }

    fn children(&self) -> Vec<Node> {
        vec![self.outer.clone(), self.inner.clone()]
    }

    fn label(&self) -> Result<String, NodeError> {
        Ok("∘".to_string())
    }

    fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let [outer, inner] = take_children(self.kind(), children)?;
        Ok(outer.compose(&inner))
    }

    fn as_constant(&self) -> Option<f64> {
        if let Some(c) = self.outer.as_constant() {
            return Some(c);
        }
        self.inner.as_constant().map(|c| self.outer.evaluate(c))
    }

    fn structural_info(&self) -> Option<StructuralInfo> {
        Some(StructuralInfo::nodes(
            OpKind::Composition,
            &self.outer,
            Some(&self.inner),
        ))
    }

    fn local_rewrite(&self) -> Option<Node> {
        if let Some(c) = self.as_constant() {
            return Some(Node::constant(c));
        }
        // X ∘ g -> g,  f ∘ X -> f
        if self.outer.is_variable() {
            return Some(self.inner.clone());
        }
        if self.inner.is_variable() {
            return Some(self.outer.clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_rule() {
        let f = Node::sin().compose(&Node::x().power(2));
        let at = 1.3_f64;
        let expected = (at * at).cos() * 2.0 * at;
        assert!((f.derivative().evaluate(at) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_nested_composition_renders_inside_out() {
        let f = Node::ln().compose(&Node::cos().compose(&(Node::x() + 1.0)));
        assert_eq!(f.description().unwrap(), "ln(cos(X + 1.0))");
    }

    #[test]
    fn test_identity_compositions_rewrite() {
        let g = Node::cos();
        assert!(Node::same(&Node::x().compose(&g).local_rewrite().unwrap(), &g));
        assert!(Node::same(&g.compose(&Node::x()).local_rewrite().unwrap(), &g));
        assert!(Node::sin().compose(&g).local_rewrite().is_none());
    }

    #[test]
    fn test_constant_composition_folds() {
        let f = Node::cos().compose(&Node::constant(0.0));
        assert_eq!(f.as_constant(), Some(1.0));
        let g = Node::constant(4.0).compose(&Node::sin());
        assert_eq!(g.local_rewrite().unwrap().as_constant(), Some(4.0));
    }

    #[test]
    fn test_apply_to_variable_returns_function() {
        let sin = Node::sin();
        let same = apply(sin.clone(), "Sine", vec![Node::x()]).unwrap();
        assert!(Node::same(&same, &sin));
        let composed = apply(sin, "Sine", vec![Node::cos()]).unwrap();
        assert_eq!(composed.description().unwrap(), "sin(cos(X))");
    }
}
