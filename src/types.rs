use std::sync::Arc;

use crate::expr::Node;

/// Type alias for the evaluation rule of a custom node.
///
/// This represents a function that:
/// - Takes the value of the variable
/// - Returns a single f64 result
/// - Is both Send and Sync so the node can be shared across threads
pub type EvalFunction = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Type alias for the derivative rule of a custom node.
///
/// Called lazily each time the derivative is requested, so a custom node may
/// refer to itself (or to a node that refers back to it) without building an
/// infinite structure up front.
pub type DerivativeFunction = Arc<dyn Fn() -> Node + Send + Sync>;
