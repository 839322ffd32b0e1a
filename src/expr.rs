//! Expression module for representing mathematical expressions of one variable.
//!
//! This module defines the core expression types used to represent mathematical expressions
//! in a form that supports both symbolic differentiation and DAG optimization. The main types are:
//!
//! - `Node`: A shared, immutable handle to one expression node
//! - `Operator`: The capability contract every node kind implements
//! - `StructuralInfo`: Optional operand metadata used by algebraic rewrites
//!
//! Nodes are reference counted (`Arc`), so one subexpression may have many parents. After
//! optimization the derivative series is a DAG with a single physical instance per distinct
//! expression.
//!
//! Supported operations include:
//! - Basic arithmetic (+, -, *, /) between nodes and with scalars
//! - The variable `X` and constants
//! - Integer exponentiation and scalar exponentials (`a ** f`)
//! - Natural logarithm, sine and cosine of the variable
//! - Function composition (`f ∘ g`)
//! - Custom nodes built from an evaluation and a derivative closure
//!
//! # Node identity
//! Every node carries a process-unique `id` assigned at construction. Identity is only used
//! for debugging and by the optimizer to detect unchanged children; semantic equality and
//! hashing use the canonical `description` (the node rendered with `X` in the variable slot).
//!
//! # Symbolic Differentiation
//! `derivative` builds a new node by applying the rule of the node's operator:
//! - Sum and difference rules
//! - Product rule
//! - Quotient rule
//! - Power rule
//! - Chain rule (composition, reciprocal, scalar exponential)
//! - Special function derivatives (ln, sin, cos)
//!
//! # Evaluation cache
//! Each node remembers the last `(x, result)` pair it computed. Repeated evaluation at the same
//! point, as happens when a shared subexpression is visited from several parents, returns the
//! remembered value. Only one point is ever remembered.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::errors::NodeError;
use crate::operators::{
    arithmetic, compose::Composition, custom::Custom, leaf, ln, pow, trigonometric, unary,
};
use crate::types::{DerivativeFunction, EvalFunction};

/// Name substituted for the variable slot when computing a node's description.
pub const VARIABLE_NAME: &str = "X";

/// Global counter for node IDs
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The variable singleton, created on first use
static VARIABLE: OnceLock<Node> = OnceLock::new();

/// Operator tag exposed through [`StructuralInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    UnaryPlus,
    Negation,
    Sum,
    Difference,
    ScalarProduct,
    Product,
    ScalarQuotient,
    Quotient,
    Power,
    ScalarExponential,
    Composition,
}

/// Operand metadata for operators with one or two operands.
///
/// Node operands are given in `left`/`right` together with their constant value (if any);
/// scalar operands, such as the `a` of `a * f`, appear only as the matching `*_const` field.
#[derive(Debug, Clone)]
pub struct StructuralInfo {
    pub kind: OpKind,
    pub left: Option<Node>,
    pub left_const: Option<f64>,
    pub right: Option<Node>,
    pub right_const: Option<f64>,
}

impl StructuralInfo {
    /// Info for an operator whose operands are all nodes.
    pub fn nodes(kind: OpKind, left: &Node, right: Option<&Node>) -> Self {
        Self {
            kind,
            left: Some(left.clone()),
            left_const: left.as_constant(),
            right: right.cloned(),
            right_const: right.and_then(Node::as_constant),
        }
    }

    /// Info for an operator combining a scalar (on the left) with a node.
    pub fn scalar(kind: OpKind, scalar: f64, operand: &Node) -> Self {
        Self {
            kind,
            left: None,
            left_const: Some(scalar),
            right: Some(operand.clone()),
            right_const: operand.as_constant(),
        }
    }

    /// `(b, f)` when this is `b OP f` with a constant left operand.
    pub fn leading_constant(&self) -> Option<(f64, Node)> {
        Some((self.left_const?, self.right.clone()?))
    }

    /// `(f, b)` when this is `f OP b` with a constant right operand.
    pub fn trailing_constant(&self) -> Option<(Node, f64)> {
        Some((self.left.clone()?, self.right_const?))
    }
}

/// The capability contract of an expression node.
///
/// `evaluate` and `derivative` are mandatory. All other capabilities have defaults: the
/// rendering, labeling and rebuild hooks fail with [`NodeError::Unsupported`], the
/// optimization hooks report nothing to optimize. New node kinds are added by implementing
/// this trait and wrapping the value with [`Node::new`]; the optimizer only talks to nodes
/// through these methods.
pub trait Operator: Send + Sync {
    /// Short name of the operator, used in error messages
    fn kind(&self) -> &'static str;

    /// Value of the expression at `x`
    fn evaluate(&self, x: f64) -> f64;

    /// Symbolic derivative with respect to the variable
    fn derivative(&self) -> Node;

    /// Canonical textual form given the rendering of the variable slot
    fn render(&self, _inner: &str) -> Result<String, NodeError> {
        Err(NodeError::Unsupported {
            capability: "render",
            kind: self.kind(),
        })
    }

    /// Direct operands, in the order `rebuild` expects them
    fn children(&self) -> Vec<Node> {
        Vec::new()
    }

    /// Short tag for display
    fn label(&self) -> Result<String, NodeError> {
        Err(NodeError::Unsupported {
            capability: "label",
            kind: self.kind(),
        })
    }

    /// New node of the same operator with its operands replaced
    fn rebuild(&self, _children: Vec<Node>) -> Result<Node, NodeError> {
        Err(NodeError::Unsupported {
            capability: "rebuild",
            kind: self.kind(),
        })
    }

    /// Value of the expression when it does not depend on the variable
    fn as_constant(&self) -> Option<f64> {
        None
    }

    /// Operand metadata for pattern based rewrites
    fn structural_info(&self) -> Option<StructuralInfo> {
        None
    }

    /// An equivalent, simpler replacement for this node
    fn local_rewrite(&self) -> Option<Node> {
        None
    }
}

/// One-slot memo of the last evaluation.
///
/// Keyed by the bit pattern of `x`, so `0.0` and `-0.0` are distinct points; `NaN` inputs
/// never hit.
#[derive(Default)]
struct EvalCache {
    slot: Mutex<Option<(u64, f64)>>,
}

impl EvalCache {
    fn get(&self, x: f64) -> Option<f64> {
        if x.is_nan() {
            return None;
        }
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Some((bits, result)) if bits == x.to_bits() => Some(result),
            _ => None,
        }
    }

    fn store(&self, x: f64, result: f64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some((x.to_bits(), result));
    }
}

struct NodeData {
    id: u64,
    description: Result<String, NodeError>,
    cache: EvalCache,
    op: Box<dyn Operator>,
}

/// A shared handle to an immutable expression node.
///
/// Cloning a `Node` is cheap and yields the same physical node. Equality and hashing
/// compare descriptions; use [`Node::same`] to compare identity.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    /// Wraps an operator into a node, assigning its identity and description.
    pub fn new<O: Operator + 'static>(op: O) -> Self {
        let description = op.render(VARIABLE_NAME);
        Node(Arc::new(NodeData {
            id: next_id(),
            description,
            cache: EvalCache::default(),
            op: Box::new(op),
        }))
    }

    /// The variable `X`.
    pub fn x() -> Self {
        VARIABLE.get_or_init(|| Node::new(leaf::Variable)).clone()
    }

    /// A constant leaf.
    pub fn constant(value: f64) -> Self {
        Node::new(leaf::Constant(value))
    }

    /// The natural logarithm of the variable.
    pub fn ln() -> Self {
        ln::ln()
    }

    /// The sine of the variable.
    pub fn sin() -> Self {
        trigonometric::sin()
    }

    /// The cosine of the variable.
    pub fn cos() -> Self {
        trigonometric::cos()
    }

    /// The scalar exponential `a ** f`.
    pub fn scalar_exp(base: f64, exponent: Node) -> Self {
        Node::new(pow::ScalarExponential { base, exponent })
    }

    /// A node that only knows how to evaluate and differentiate itself.
    ///
    /// Rendering, labeling and rebuilding such a node fail with
    /// [`NodeError::Unsupported`], and so does optimizing a series containing it.
    ///
    /// # Example
    /// ```
    /// use symdiff::expr::Node;
    ///
    /// let cube = Node::custom(|x| x * x * x, || 3.0 * Node::x().power(2));
    /// assert_eq!(cube.evaluate(2.0), 8.0);
    /// assert_eq!(cube.derivative().evaluate(2.0), 12.0);
    /// assert!(cube.description().is_err());
    /// ```
    pub fn custom<E, D>(evaluate: E, derivative: D) -> Self
    where
        E: Fn(f64) -> f64 + Send + Sync + 'static,
        D: Fn() -> Node + Send + Sync + 'static,
    {
        let evaluate: EvalFunction = Arc::new(evaluate);
        let derivative: DerivativeFunction = Arc::new(derivative);
        Node::new(Custom {
            evaluate,
            derivative,
        })
    }

    /// Unary plus `+f`.
    pub fn pos(&self) -> Self {
        Node::new(unary::UnaryPlus(self.clone()))
    }

    /// Integer power `f ** n`.
    pub fn power(&self, exponent: i32) -> Self {
        Node::new(pow::Power {
            base: self.clone(),
            exponent,
        })
    }

    /// Scalar multiplication `a * f`.
    pub fn scalar_mul(&self, scalar: f64) -> Self {
        Node::new(arithmetic::ScalarProduct {
            scalar,
            operand: self.clone(),
        })
    }

    /// The scalar exponential `a ** exponent`, where `self` is the constant base `a`.
    ///
    /// # Errors
    /// Returns `NodeError::NotConstant` if `self` is not constant.
    pub fn power_of_exp(&self, exponent: &Node) -> Result<Self, NodeError> {
        let base = self
            .as_constant()
            .ok_or_else(|| NodeError::NotConstant(self.to_string()))?;
        Ok(Node::scalar_exp(base, exponent.clone()))
    }

    /// Composition `self ∘ inner`, i.e. `self(inner(x))`.
    pub fn compose(&self, inner: &Node) -> Self {
        Node::new(Composition {
            outer: self.clone(),
            inner: inner.clone(),
        })
    }

    /// Process-unique identity of this node.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Canonical description, `render("X")`, computed once at construction.
    pub fn description(&self) -> Result<&str, NodeError> {
        self.0.description.as_deref().map_err(Clone::clone)
    }

    /// Short display tag such as `"Sin"`, `"+"` or `"2.0 *"`.
    pub fn label(&self) -> Result<String, NodeError> {
        self.0.op.label()
    }

    /// Name of the operator, e.g. `"Sum"`.
    pub fn kind(&self) -> &'static str {
        self.0.op.kind()
    }

    /// Textual form with `inner` substituted for the variable.
    pub fn render(&self, inner: &str) -> Result<String, NodeError> {
        self.0.op.render(inner)
    }

    /// Direct operands in rebuild order.
    pub fn children(&self) -> Vec<Node> {
        self.0.op.children()
    }

    /// Symbolic derivative with respect to `X`.
    pub fn derivative(&self) -> Node {
        self.0.op.derivative()
    }

    /// Value of the node if it does not depend on `X`.
    pub fn as_constant(&self) -> Option<f64> {
        self.0.op.as_constant()
    }

    /// Operand metadata used by pattern rewrites.
    pub fn structural_info(&self) -> Option<StructuralInfo> {
        self.0.op.structural_info()
    }

    /// A simpler equivalent node, if the operator knows one.
    pub fn local_rewrite(&self) -> Option<Node> {
        self.0.op.local_rewrite()
    }

    /// Evaluates the expression at `x`, reusing the last result if `x` is unchanged.
    ///
    /// Division by zero and logarithms of non-positive numbers are not errors; they yield
    /// `inf` or `NaN` like the underlying `f64` operations.
    pub fn evaluate(&self, x: f64) -> f64 {
        if let Some(result) = self.0.cache.get(x) {
            return result;
        }
        let result = self.0.op.evaluate(x);
        self.0.cache.store(x, result);
        result
    }

    /// Rebuilds this node with new children.
    ///
    /// # Errors
    /// Returns `NodeError::ArityMismatch` if `children` does not have the operator's arity, or
    /// `NodeError::Unsupported` if the node cannot be rebuilt.
    pub fn rebuild(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(NodeError::ArityMismatch {
                kind: self.kind(),
                expected,
                got: children.len(),
            });
        }
        self.0.op.rebuild(children)
    }

    /// Rebuilds this node only if some candidate child differs by identity from the current one.
    ///
    /// Unchanged subtrees keep their identity, which is what lets the optimizer share them.
    pub fn rebuild_if_changed(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let current = self.children();
        if current.len() != children.len() {
            return Err(NodeError::ArityMismatch {
                kind: self.kind(),
                expected: current.len(),
                got: children.len(),
            });
        }
        if current.iter().zip(&children).all(|(a, b)| Node::same(a, b)) {
            return Ok(self.clone());
        }
        self.0.op.rebuild(children)
    }

    /// Identity comparison.
    pub fn same(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Whether this is the variable singleton.
    pub fn is_variable(&self) -> bool {
        VARIABLE.get().is_some_and(|x| Node::same(self, x))
    }

    /// Whether this node is a constant leaf (no children and a known value).
    pub fn is_constant_leaf(&self) -> bool {
        self.children().is_empty() && self.as_constant().is_some()
    }

    /// Approximates the integral over `[a, b]` with a right Riemann sum of `n` subintervals.
    ///
    /// # Errors
    /// Returns `NodeError::InvalidSampleCount` if `n` is zero.
    ///
    /// # Example
    /// ```
    /// use symdiff::expr::Node;
    ///
    /// let area = Node::x().integrate(0.0, 1.0, 1000).unwrap();
    /// assert!((area - 0.5).abs() < 1e-3);
    /// ```
    pub fn integrate(&self, a: f64, b: f64, n: usize) -> Result<f64, NodeError> {
        if n == 0 {
            return Err(NodeError::InvalidSampleCount(n));
        }
        let width = (b - a) / n as f64;
        let sum: f64 = (1..=n).map(|i| self.evaluate(a + i as f64 * width)).sum();
        Ok(sum * width)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0.description, &other.0.description) {
            (Ok(a), Ok(b)) => a == b,
            _ => Node::same(self, other),
        }
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0.description {
            Ok(description) => description.hash(state),
            Err(_) => self.0.id.hash(state),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id)
            .field("kind", &self.kind())
            .field("description", &self.0.description)
            .finish()
    }
}

/// Writes the description, or `<Kind #id>` for nodes that cannot render.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.description {
            Ok(description) => write!(f, "{description}"),
            Err(_) => write!(f, "<{} #{}>", self.kind(), self.0.id),
        }
    }
}

macro_rules! node_operator {
    ($trait:ident, $method:ident, $build:path) => {
        impl std::ops::$trait<Node> for Node {
            type Output = Node;
            fn $method(self, rhs: Node) -> Node {
                $build(self, rhs)
            }
        }

        impl std::ops::$trait<&Node> for &Node {
            type Output = Node;
            fn $method(self, rhs: &Node) -> Node {
                $build(self.clone(), rhs.clone())
            }
        }

        impl std::ops::$trait<f64> for Node {
            type Output = Node;
            fn $method(self, rhs: f64) -> Node {
                $build(self, Node::constant(rhs))
            }
        }
    };
}

node_operator!(Add, add, arithmetic::sum);
node_operator!(Sub, sub, arithmetic::difference);
node_operator!(Mul, mul, arithmetic::product);
node_operator!(Div, div, arithmetic::quotient);

impl std::ops::Add<Node> for f64 {
    type Output = Node;
    fn add(self, rhs: Node) -> Node {
        arithmetic::sum(Node::constant(self), rhs)
    }
}

impl std::ops::Sub<Node> for f64 {
    type Output = Node;
    fn sub(self, rhs: Node) -> Node {
        arithmetic::difference(Node::constant(self), rhs)
    }
}

/// `a * f` builds the scalar-multiplication node.
impl std::ops::Mul<Node> for f64 {
    type Output = Node;
    fn mul(self, rhs: Node) -> Node {
        rhs.scalar_mul(self)
    }
}

/// `a / f` builds the scalar-division node.
impl std::ops::Div<Node> for f64 {
    type Output = Node;
    fn div(self, rhs: Node) -> Node {
        Node::new(arithmetic::ScalarQuotient {
            scalar: self,
            operand: rhs,
        })
    }
}

impl std::ops::Neg for Node {
    type Output = Node;
    fn neg(self) -> Node {
        Node::new(unary::Negation(self))
    }
}

impl std::ops::Neg for &Node {
    type Output = Node;
    fn neg(self) -> Node {
        -self.clone()
    }
}

/// Destructures the children handed to `rebuild` into a fixed-size array.
pub(crate) fn take_children<const N: usize>(
    kind: &'static str,
    children: Vec<Node>,
) -> Result<[Node; N], NodeError> {
    children
        .try_into()
        .map_err(|children: Vec<Node>| NodeError::ArityMismatch {
            kind,
            expected: N,
            got: children.len(),
        })
}

/// Formats a scalar the way it appears as an operand.
pub(crate) fn format_scalar(value: f64) -> String {
    group(format!("{value:?}"))
}

/// Renders `node` as an operand of an infix or prefix operator.
pub(crate) fn operand(node: &Node, inner: &str) -> Result<String, NodeError> {
    render_slot(node, inner).map(group)
}

/// Renders `node` for `inner`, reusing the cached description when `inner` is the variable.
pub(crate) fn render_slot(node: &Node, inner: &str) -> Result<String, NodeError> {
    if inner == VARIABLE_NAME {
        node.description().map(str::to_string)
    } else {
        node.render(inner)
    }
}

/// Parenthesizes a rendering that would be ambiguous as an operand.
pub(crate) fn group(rendered: String) -> String {
    if needs_parens(&rendered) {
        format!("({rendered})")
    } else {
        rendered
    }
}

/// Wraps a function argument in parentheses unless it already is.
pub(crate) fn enclose(rendered: &str) -> String {
    if is_enclosed(rendered) {
        rendered.to_string()
    } else {
        format!("({rendered})")
    }
}

fn needs_parens(rendered: &str) -> bool {
    if rendered.starts_with('-') || rendered.starts_with('+') {
        return true;
    }
    let mut depth = 0usize;
    for c in rendered.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// True when the first character opens a parenthesis closed by the last character.
fn is_enclosed(rendered: &str) -> bool {
    if !rendered.starts_with('(') || !rendered.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in rendered.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == rendered.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_evaluate() {
        let x = Node::x();
        assert_eq!(x.evaluate(3.0), 3.0);
        assert_eq!(Node::constant(2.5).evaluate(100.0), 2.5);
        assert_eq!((x.clone() + 1.0).evaluate(2.0), 3.0);
        assert_eq!((x.clone() - 1.0).evaluate(2.0), 1.0);
        assert_eq!((3.0 * x.clone()).evaluate(2.0), 6.0);
        assert_eq!((x.clone() * x.clone()).evaluate(3.0), 9.0);
        assert_eq!((1.0 / x.clone()).evaluate(4.0), 0.25);
        assert_eq!((x.clone() / 4.0).evaluate(2.0), 0.5);
        assert_eq!(x.power(3).evaluate(2.0), 8.0);
        assert_eq!(x.power(-1).evaluate(2.0), 0.5);
        assert_eq!((-x.clone()).evaluate(2.0), -2.0);
        assert_eq!(x.pos().evaluate(-2.0), -2.0);
        assert!((Node::ln().evaluate(std::f64::consts::E) - 1.0).abs() < TOLERANCE);
        assert!((Node::cos().evaluate(0.0) - 1.0).abs() < TOLERANCE);
        assert!((Node::scalar_exp(2.0, x.clone()).evaluate(3.0) - 8.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_evaluate_composition() {
        let f = Node::sin().compose(&Node::x().power(2));
        assert!((f.evaluate(3.14159) - (-0.43028616647684903)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_power_of_zero_is_one() {
        assert_eq!(Node::x().power(0).evaluate(0.0), 1.0);
        assert_eq!(Node::x().power(0).evaluate(5.0), 1.0);
    }

    #[test]
    fn test_numeric_edge_cases_propagate() {
        let x = Node::x();
        assert_eq!((1.0 / x.clone()).evaluate(0.0), f64::INFINITY);
        assert_eq!((x.clone() / 0.0).evaluate(-1.0), f64::NEG_INFINITY);
        assert!((x.clone() / x.clone()).evaluate(0.0).is_nan());
        assert_eq!(Node::ln().evaluate(0.0), f64::NEG_INFINITY);
        assert!(Node::ln().evaluate(-1.0).is_nan());
    }

    #[test]
    fn test_descriptions() {
        let x = Node::x();
        assert_eq!(x.description().unwrap(), "X");
        assert_eq!(Node::constant(2.0).description().unwrap(), "2.0");
        assert_eq!(Node::constant(-2.0).description().unwrap(), "-2.0");
        assert_eq!((x.clone() + 1.0).description().unwrap(), "X + 1.0");
        assert_eq!(
            x.power(4).scalar_mul(5.0).description().unwrap(),
            "5.0 * (X ** 4)"
        );
        assert_eq!((-2.0 * x.clone()).description().unwrap(), "(-2.0) * X");
        assert_eq!(
            (Node::constant(-2.0) * x.clone()).description().unwrap(),
            "(-2.0) * X"
        );
        assert_eq!((-x.power(2)).description().unwrap(), "-(X ** 2)");
        assert_eq!((-x.clone()).power(2).description().unwrap(), "(-X) ** 2");
        assert_eq!(Node::sin().description().unwrap(), "sin(X)");
        assert_eq!(
            Node::sin().compose(&x.power(2)).description().unwrap(),
            "sin(X ** 2)"
        );
        assert_eq!(
            x.power(2).compose(&(x.clone() + 1.0)).description().unwrap(),
            "(X + 1.0) ** 2"
        );
        assert_eq!(
            Node::scalar_exp(2.0, Node::sin()).description().unwrap(),
            "2.0 ** sin(X)"
        );
        assert_eq!((1.0 / x.clone()).description().unwrap(), "1.0 / X");
    }

    #[test]
    fn test_render_with_inner() {
        let f = Node::x().power(2) + Node::cos();
        assert_eq!(f.render("Y").unwrap(), "(Y ** 2) + cos(Y)");
        assert_eq!(f.render("(Y + 1.0)").unwrap(), "((Y + 1.0) ** 2) + cos(Y + 1.0)");
    }

    #[test]
    fn test_labels() {
        let x = Node::x();
        assert_eq!(x.label().unwrap(), "X");
        assert_eq!(Node::sin().label().unwrap(), "Sin");
        assert_eq!((x.clone() + x.clone()).label().unwrap(), "+");
        assert_eq!(x.scalar_mul(2.0).label().unwrap(), "2.0 *");
        assert_eq!(x.power(3).label().unwrap(), "** 3");
    }

    #[test]
    fn test_children_order() {
        let x = Node::x();
        let one = Node::constant(1.0);
        let sub = x.clone() - one.clone();
        let children = sub.children();
        assert_eq!(children.len(), 2);
        assert!(Node::same(&children[0], &x));
        assert!(Node::same(&children[1], &one));
        assert!(Node::x().children().is_empty());
        assert!(Node::constant(1.0).children().is_empty());
        assert!(Node::constant(1.0).as_constant().is_some());
    }

    #[test]
    fn test_variable_is_singleton() {
        assert!(Node::same(&Node::x(), &Node::x()));
        assert!(Node::x().is_variable());
        assert!(!Node::constant(1.0).is_variable());
        assert!(Node::same(&Node::sin(), &Node::sin()));
    }

    #[test]
    fn test_identity_is_unique() {
        let a = Node::constant(1.0);
        let b = Node::constant(1.0);
        assert_ne!(a.id(), b.id());
        assert!(!Node::same(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_and_hash_use_description() {
        let a = Node::x() + 1.0;
        let b = Node::x() + 1.0;
        let c = Node::x() + 2.0;
        let set: HashSet<Node> = [a.clone(), b.clone(), c.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rebuild_with_same_children() {
        let x = Node::x();
        let nodes = vec![
            x.clone() + Node::cos(),
            x.clone() - 2.0,
            x.clone() * Node::sin(),
            x.clone() / (x.clone() + 3.0),
            2.0 / x.clone(),
            x.scalar_mul(1.5),
            x.power(3),
            Node::scalar_exp(3.0, x.clone()),
            -x.clone(),
            x.pos(),
            Node::ln(),
            Node::sin(),
            Node::cos(),
            Node::sin().compose(&x.power(2)),
        ];
        for node in nodes {
            let rebuilt = node.rebuild(node.children()).unwrap();
            assert_eq!(rebuilt.description().unwrap(), node.description().unwrap());
            for x in [-1.5, 0.3, 1.0, 2.7] {
                let (a, b) = (rebuilt.evaluate(x), node.evaluate(x));
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn test_rebuild_if_changed_keeps_identity() {
        let f = Node::x() + 1.0;
        let same = f.rebuild_if_changed(f.children()).unwrap();
        assert!(Node::same(&f, &same));

        let changed = f
            .rebuild_if_changed(vec![Node::x(), Node::constant(2.0)])
            .unwrap();
        assert!(!Node::same(&f, &changed));
        assert_eq!(changed.description().unwrap(), "X + 2.0");
    }

    #[test]
    fn test_rebuild_arity_mismatch() {
        let f = Node::x() + 1.0;
        assert_eq!(
            f.rebuild(vec![Node::x()]).unwrap_err(),
            NodeError::ArityMismatch {
                kind: "Sum",
                expected: 2,
                got: 1
            }
        );
        assert!(f.rebuild_if_changed(Vec::new()).is_err());
    }

    #[test]
    fn test_function_of_variable_rebuilds_as_composition() {
        let rebuilt = Node::sin().rebuild(vec![Node::x().power(2)]).unwrap();
        assert_eq!(rebuilt.description().unwrap(), "sin(X ** 2)");
        let same = Node::ln().rebuild(vec![Node::x()]).unwrap();
        assert!(Node::same(&same, &Node::ln()));
    }

    #[test]
    fn test_power_of_exp_requires_constant() {
        let f = Node::constant(2.0).power_of_exp(&Node::sin()).unwrap();
        assert_eq!(f.evaluate(0.0), 1.0);
        assert!(matches!(
            Node::x().power_of_exp(&Node::sin()),
            Err(NodeError::NotConstant(_))
        ));
    }

    #[test]
    fn test_evaluation_cache_single_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let node = Node::custom(
            move |x| {
                counter.fetch_add(1, Ordering::SeqCst);
                x * 2.0
            },
            || Node::constant(2.0),
        );

        assert_eq!(node.evaluate(1.0), 2.0);
        assert_eq!(node.evaluate(1.0), 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(node.evaluate(2.0), 4.0);
        assert_eq!(node.evaluate(1.0), 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert!(node.evaluate(f64::NAN).is_nan());
        assert!(node.evaluate(f64::NAN).is_nan());
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let _ = node.evaluate(0.0);
        let _ = node.evaluate(-0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_custom_node_unsupported_capabilities() {
        let node = Node::custom(|x| x.exp(), || Node::constant(0.0));
        let unsupported = |capability| NodeError::Unsupported {
            capability,
            kind: "Custom",
        };
        assert_eq!(node.description().unwrap_err(), unsupported("render"));
        assert_eq!(node.label().unwrap_err(), unsupported("label"));
        assert_eq!(node.rebuild(Vec::new()).unwrap_err(), unsupported("rebuild"));
        assert_eq!(node.evaluate(0.0), 1.0);
        assert_eq!(node.derivative().evaluate(5.0), 0.0);

        let wrapped = node.clone() + Node::x();
        assert_eq!(wrapped.description().unwrap_err(), unsupported("render"));
        assert_eq!(wrapped.evaluate(0.0), 1.0);
        assert!(format!("{node}").starts_with("<Custom #"));
    }

    #[test]
    fn test_custom_nodes_compare_by_identity() {
        let a = Node::custom(|x| x, || Node::constant(1.0));
        let b = Node::custom(|x| x, || Node::constant(1.0));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_integrate() {
        let x = Node::x();
        let area = x.power(2).integrate(0.0, 1.0, 10_000).unwrap();
        assert!((area - 1.0 / 3.0).abs() < 1e-3);

        // Right endpoints only: a single subinterval samples f(b).
        assert_eq!(x.integrate(0.0, 2.0, 1).unwrap(), 4.0);

        assert_eq!(
            x.integrate(0.0, 1.0, 0).unwrap_err(),
            NodeError::InvalidSampleCount(0)
        );
    }

    struct CountingLeaf(Arc<AtomicUsize>);

    impl Operator for CountingLeaf {
        fn kind(&self) -> &'static str {
            "CountingLeaf"
        }

        fn evaluate(&self, x: f64) -> f64 {
            x
        }

        fn derivative(&self) -> Node {
            Node::constant(1.0)
        }

        fn render(&self, inner: &str) -> Result<String, NodeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("leaf{}", enclose(inner)))
        }
    }

    #[test]
    fn test_parents_reuse_cached_descriptions() {
        let renders = Arc::new(AtomicUsize::new(0));
        let leaf = Node::new(CountingLeaf(Arc::clone(&renders)));
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        let f = ((leaf.clone() + 1.0) * leaf.power(3)).scalar_mul(2.0);
        let g = Node::sin().compose(&f);
        let h = leaf.compose(&Node::x()) - g.clone();
        assert_eq!(renders.load(Ordering::SeqCst), 2);
        assert_eq!(
            g.description().unwrap(),
            "sin(2.0 * ((leaf(X) + 1.0) * (leaf(X) ** 3)))"
        );
        assert_eq!(h.description().unwrap().split(" - ").next(), Some("leaf(X)"));

        // Rendering for another variable name still walks the tree.
        assert_eq!(f.render("Y").unwrap(), "2.0 * ((leaf(Y) + 1.0) * (leaf(Y) ** 3))");
        assert_eq!(renders.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_group_and_enclose() {
        assert_eq!(group("X".to_string()), "X");
        assert_eq!(group("X + 1.0".to_string()), "(X + 1.0)");
        assert_eq!(group("-X".to_string()), "(-X)");
        assert_eq!(group("sin(X + 1.0)".to_string()), "sin(X + 1.0)");
        assert_eq!(enclose("X"), "(X)");
        assert_eq!(enclose("(X + 1.0)"), "(X + 1.0)");
        assert_eq!(enclose("(X) + (Y)"), "((X) + (Y))");
    }
}
