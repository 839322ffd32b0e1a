//! Derivative series of a single-variable expression.
//!
//! A [`FunctionGraph`] holds `f, f', f'', ...` up to a fixed order. The derivatives are built
//! eagerly by repeated symbolic differentiation; [`FunctionGraph::optimize`] then produces a
//! new series in which equal subexpressions are shared across all orders.
//!
//! # Example
//! ```
//! use symdiff::FunctionGraph;
//!
//! let graph = FunctionGraph::parse("x^3", 3).unwrap().optimize().unwrap();
//! assert_eq!(graph.derivative(1).unwrap().description().unwrap(), "3.0 * (X * X)");
//! assert_eq!(graph.evaluate(2.0), vec![8.0, 12.0, 12.0, 6.0]);
//! ```

use std::fmt;

use colored::Colorize;
use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use crate::convert::parse;
use crate::errors::{GraphError, NodeError};
use crate::expr::Node;
use crate::opt::{count_distinct, Optimizer};

/// A function and its derivatives up to a fixed order.
#[derive(Clone)]
pub struct FunctionGraph {
    derivatives: Vec<Node>,
}

/// Every derivative of a series evaluated on a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    /// The abscissae, evenly spaced, bounds included
    pub xs: Vec<f64>,
    /// `values[k][i]` is the k-th derivative at `xs[i]`
    pub values: Vec<Vec<f64>>,
}

impl FunctionGraph {
    /// Builds the series `root, root', ..., root^(order)`.
    pub fn new(root: Node, order: usize) -> Self {
        let mut derivatives = Vec::with_capacity(order + 1);
        derivatives.push(root);
        for _ in 0..order {
            let next = derivatives[derivatives.len() - 1].derivative();
            derivatives.push(next);
        }
        Self { derivatives }
    }

    /// Parses `expression` and builds its derivative series.
    pub fn parse(expression: &str, order: usize) -> Result<Self, GraphError> {
        Ok(Self::new(parse(expression)?, order))
    }

    /// The k-th derivative, `k = 0` being the function itself.
    ///
    /// # Errors
    /// Returns `GraphError::OrderOutOfRange` if `k` exceeds the order of the series.
    pub fn derivative(&self, k: usize) -> Result<&Node, GraphError> {
        self.derivatives
            .get(k)
            .ok_or(GraphError::OrderOutOfRange {
                requested: k,
                available: self.order(),
            })
    }

    /// All entries, index `k` holding the k-th derivative.
    pub fn derivatives(&self) -> &[Node] {
        &self.derivatives
    }

    /// Number of entries, `order + 1`.
    pub fn len(&self) -> usize {
        self.derivatives.len()
    }

    /// Always false: a series holds at least the function itself.
    pub fn is_empty(&self) -> bool {
        self.derivatives.is_empty()
    }

    /// Highest derivative order held.
    pub fn order(&self) -> usize {
        self.derivatives.len() - 1
    }

    /// Optimizes the series with the default [`Optimizer`].
    pub fn optimize(&self) -> Result<Self, NodeError> {
        self.optimize_with(&Optimizer::default())
    }

    /// Optimizes the series with the given optimizer configuration.
    pub fn optimize_with(&self, optimizer: &Optimizer) -> Result<Self, NodeError> {
        let before = self.node_count();
        let derivatives = optimizer.optimize(&self.derivatives)?;
        let optimized = Self { derivatives };
        debug!(
            order = self.order(),
            before,
            after = optimized.node_count(),
            "optimized derivative series"
        );
        Ok(optimized)
    }

    /// Number of physically distinct nodes reachable from the series.
    pub fn node_count(&self) -> usize {
        count_distinct(&self.derivatives)
    }

    /// All derivatives evaluated at `x`, in order.
    pub fn evaluate(&self, x: f64) -> Vec<f64> {
        self.derivatives.iter().map(|d| d.evaluate(x)).collect()
    }

    /// Evaluates every derivative on `points` evenly spaced abscissae over `[a, b]`.
    ///
    /// The grid is split into chunks that are evaluated in parallel.
    ///
    /// # Errors
    /// Returns `GraphError::InvalidGrid` if `points < 2` or a bound is not finite.
    pub fn sample(&self, a: f64, b: f64, points: usize) -> Result<Samples, GraphError> {
        if points < 2 {
            return Err(GraphError::InvalidGrid(format!(
                "need at least 2 points, got {points}"
            )));
        }
        if !a.is_finite() || !b.is_finite() {
            return Err(GraphError::InvalidGrid(format!(
                "bounds must be finite, got [{a}, {b}]"
            )));
        }

        let step = (b - a) / (points - 1) as f64;
        let xs: Vec<f64> = (0..points)
            .map(|i| if i == points - 1 { b } else { a + i as f64 * step })
            .collect();

        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let chunk_size = (points / (num_threads * 4)).max(1);

        let rows: Vec<Vec<f64>> = xs
            .par_chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|&x| self.evaluate(x)).collect::<Vec<_>>())
            .flatten()
            .collect();

        let values = (0..self.len())
            .map(|k| rows.iter().map(|row| row[k]).collect())
            .collect();
        Ok(Samples { xs, values })
    }
}

impl fmt::Debug for FunctionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Order".cyan(), self.order())?;
        writeln!(f, "    {}: {}", "Nodes".cyan(), self.node_count())?;
        for (k, node) in self.derivatives.iter().enumerate() {
            writeln!(f, "    {}: {:?}", format!("f{k}").cyan(), node)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for FunctionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .derivatives
            .iter()
            .enumerate()
            .map(|(k, node)| format!("{} = {}", format!("f{k}").cyan(), node))
            .join("\n");
        write!(f, "{lines}")
    }
}
