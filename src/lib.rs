//! Symbolic differentiation of single-variable expressions with DAG optimization.
//!
//! This crate represents expressions of one variable as shared, immutable nodes that can be
//! evaluated, rendered and differentiated symbolically to any order. A derivative series is
//! then optimized in three phases, constant folding, algebraic rewriting and deduplication,
//! so that equal subexpressions exist only once across all orders. Expressions can be built
//! with Rust operators or parsed with the [evalexpr](https://github.com/ISibboI/evalexpr) crate.
//!
//! # Features
//!
//! - Symbolic differentiation to arbitrary order
//! - Constant folding and algebraic simplification
//! - Common subexpression elimination across a derivative series
//! - Custom evaluation-only nodes
//! - Parallel sampling of a series on a grid
//!
//! # Example
//!
//! ```rust
//! use symdiff::prelude::*;
//!
//! // sin(x^2) and its first two derivatives
//! let f = Node::sin().compose(&Node::x().power(2));
//! let graph = FunctionGraph::new(f, 2).optimize().unwrap();
//!
//! let values = graph.evaluate(1.0);
//! assert!((values[1] - 2.0 * 1.0_f64.cos()).abs() < 1e-12);
//! ```

pub use function_graph::FunctionGraph;

pub mod prelude {
    pub use crate::convert::parse;
    pub use crate::errors::{ConvertError, GraphError, NodeError};
    pub use crate::expr::{Node, OpKind, Operator, StructuralInfo};
    pub use crate::function_graph::{FunctionGraph, Samples};
    pub use crate::opt::Optimizer;
}

/// Conversion from parsed expressions to expression nodes
pub mod convert;
/// Error types for the various failure modes
pub mod errors;
/// Expression node representation and symbolic differentiation
pub mod expr;
/// Derivative series
pub mod function_graph;
/// Constant folding, rewriting and deduplication of derivative series
pub mod opt;
/// Closure types of custom nodes
pub mod types;
/// The built-in node operators
pub(crate) mod operators {
    pub(crate) mod arithmetic;
    pub(crate) mod compose;
    pub(crate) mod custom;
    pub(crate) mod leaf;
    pub(crate) mod ln;
    pub(crate) mod pow;
    pub(crate) mod trigonometric;
    pub(crate) mod unary;
}
