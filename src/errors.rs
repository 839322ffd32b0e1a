//! Error types for the symdiff crate.
//!
//! This module defines the various error types that can occur while building,
//! optimizing and converting expressions. The main error types are:
//!
//! - `NodeError`: Capability and precondition failures on a single node
//! - `ConvertError`: Errors during conversion from evalexpr AST to expression nodes
//! - `GraphError`: High-level errors when working with derivative series
//!
//! Each error type implements the standard Error trait and provides detailed error messages.
//! Numeric edge cases (division by zero, logarithm of a negative number) are never
//! errors: they propagate as `inf`/`NaN` values.

use evalexpr::{DefaultNumericTypes, EvalexprError};
use thiserror::Error;

/// Errors raised by a single expression node.
///
/// `NodeError` is `Clone` because a node that cannot render keeps the failure as
/// its cached description and hands out copies of it on every request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// The node was built without the requested capability (e.g. a custom,
    /// evaluation-only node asked for its rendering)
    #[error("{kind} node does not support `{capability}`")]
    Unsupported {
        capability: &'static str,
        kind: &'static str,
    },
    /// `rebuild` received a different number of children than the operator takes
    #[error("{kind} expects {expected} children, got {got}")]
    ArityMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    /// Numeric integration needs at least one subinterval
    #[error("invalid sample count: {0} (must be positive)")]
    InvalidSampleCount(usize),
    /// An operation that requires a constant node (e.g. the base of `a ** f`)
    /// received a non-constant expression
    #[error("expected a constant expression, got {0}")]
    NotConstant(String),
}

/// Errors that can occur during conversion from evalexpr AST to expression nodes.
///
/// This enum represents various failure modes when converting the evalexpr expression tree
/// into our node representation that can be differentiated and optimized.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Error when trying to convert an exponent that is not a valid integer constant
    #[error("Could not convert exponent in Exp operator: {0}")]
    ExpOperator(String),
    /// Error when encountering an operator that is not supported by our implementation
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// Error when encountering a function that is not supported by our implementation
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),
    /// Error when the root node does not have exactly one child
    #[error("Expected single child for root node: {0}")]
    RootNode(String),
    /// Error when a constant value is not a number
    #[error("Expected numeric constant: {0}")]
    ConstOperator(String),
    /// Error when an operator has the wrong number of operands
    #[error("Expected {expected} operands for {operator}, got {got}")]
    OperandCount {
        operator: String,
        expected: usize,
        got: usize,
    },
    /// Error when the expression mentions more than one variable
    #[error("Expected a single variable, found: {0}")]
    MultipleVariables(String),
    /// Error raised by a node while assembling the converted expression
    #[error("Failed to build node")]
    Node(#[from] NodeError),
}

/// High-level errors that can occur when working with derivative series.
///
/// This enum represents the various ways that parsing, differentiation, optimization
/// and sampling of a series can fail. It wraps lower-level errors from the expression
/// conversion and node stages.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Error when parsing the initial expression string with evalexpr
    #[error("Failed to build Evalexpr AST")]
    BuildEvalexprError(#[from] EvalexprError<DefaultNumericTypes>),
    /// Error when converting from evalexpr AST to expression nodes
    #[error("Failed to build expression")]
    BuildNodeError(#[from] ConvertError),
    /// Error raised by a node of the series
    #[error("Node error")]
    NodeError(#[from] NodeError),
    /// Error when requesting a derivative order the series does not hold
    #[error("Derivative order {requested} out of range (series holds orders 0..={available})")]
    OrderOutOfRange { requested: usize, available: usize },
    /// Error when a sampling grid is empty or degenerate
    #[error("Invalid sampling grid: {0}")]
    InvalidGrid(String),
}
