//! Three-phase optimizer for derivative series.
//!
//! Pass pipeline
//! -------------
//!  1. **fold_constants** – replace every non-leaf node that evaluates to a constant by a
//!     constant leaf. Runs once.
//!  2. **rewrite**        – apply each operator's local rewrite bottom-up, repeating full
//!     passes until one leaves the whole series unchanged.
//!  3. **deduplicate**    – keep a single physical instance per description, shared across
//!     all derivatives of the series. Runs once.
//!
//! Every phase rebuilds a node only when one of its children changed, so untouched subtrees
//! keep their identity. Within one pass results are memoized by node id: a subtree shared by
//! several parents is processed once and stays shared.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::errors::NodeError;
use crate::expr::Node;

/// Pass limit of the rewrite phase unless configured otherwise.
pub const DEFAULT_MAX_PASSES: usize = 1000;

/// Configuration of the optimizer.
///
/// # Example
/// ```
/// use symdiff::expr::Node;
/// use symdiff::opt::Optimizer;
///
/// let f = Node::x() * 1.0 + 0.0;
/// let optimized = Optimizer::new().with_max_passes(10).optimize(&[f]).unwrap();
/// assert_eq!(optimized[0].description().unwrap(), "X");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Optimizer {
    max_passes: usize,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Optimizer {
    /// An optimizer with the default pass limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the number of rewrite passes.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// The configured rewrite pass limit.
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Optimizes a derivative series, returning a new series of the same length.
    ///
    /// # Errors
    /// Returns `NodeError::Unsupported` if the series contains a node that cannot be rebuilt
    /// or rendered, such as a custom node.
    pub fn optimize(&self, derivatives: &[Node]) -> Result<Vec<Node>, NodeError> {
        let folded = fold_constants(derivatives)?;
        debug!(derivatives = derivatives.len(), "constant folding done");

        let rewritten = self.rewrite(folded)?;

        let deduplicated = deduplicate(&rewritten)?;
        debug!(distinct = count_distinct(&deduplicated), "deduplication done");
        Ok(deduplicated)
    }

    fn rewrite(&self, mut current: Vec<Node>) -> Result<Vec<Node>, NodeError> {
        for pass in 1..=self.max_passes {
            let mut memo = HashMap::new();
            let next = current
                .iter()
                .map(|node| rewrite_node(node, &mut memo))
                .collect::<Result<Vec<_>, _>>()?;

            let unchanged = current.iter().zip(&next).all(|(a, b)| Node::same(a, b));
            trace!(pass, rewritten = memo.len(), unchanged, "rewrite pass");
            if unchanged {
                debug!(passes = pass, "rewrite fixpoint reached");
                return Ok(next);
            }
            current = next;
        }
        warn!(
            max_passes = self.max_passes,
            "rewrite pass limit reached before a fixpoint"
        );
        Ok(current)
    }
}

fn fold_constants(derivatives: &[Node]) -> Result<Vec<Node>, NodeError> {
    let mut memo = HashMap::new();
    derivatives
        .iter()
        .map(|node| fold_node(node, &mut memo))
        .collect()
}

fn fold_node(node: &Node, memo: &mut HashMap<u64, Node>) -> Result<Node, NodeError> {
    if let Some(done) = memo.get(&node.id()) {
        return Ok(done.clone());
    }
    let children = node
        .children()
        .iter()
        .map(|child| fold_node(child, memo))
        .collect::<Result<Vec<_>, _>>()?;
    let rebuilt = node.rebuild_if_changed(children)?;

    let result = match rebuilt.as_constant() {
        Some(value) if !rebuilt.is_constant_leaf() => Node::constant(value),
        _ => rebuilt,
    };
    memo.insert(node.id(), result.clone());
    Ok(result)
}

fn rewrite_node(node: &Node, memo: &mut HashMap<u64, Node>) -> Result<Node, NodeError> {
    if let Some(done) = memo.get(&node.id()) {
        return Ok(done.clone());
    }
    let children = node
        .children()
        .iter()
        .map(|child| rewrite_node(child, memo))
        .collect::<Result<Vec<_>, _>>()?;
    let rebuilt = node.rebuild_if_changed(children)?;

    let result = rebuilt.local_rewrite().unwrap_or(rebuilt);
    memo.insert(node.id(), result.clone());
    Ok(result)
}

fn deduplicate(derivatives: &[Node]) -> Result<Vec<Node>, NodeError> {
    let mut seen = HashMap::new();
    derivatives
        .iter()
        .map(|node| dedup_node(node, &mut seen))
        .collect()
}

fn dedup_node(node: &Node, seen: &mut HashMap<String, Node>) -> Result<Node, NodeError> {
    let description = node.description()?;
    if let Some(canonical) = seen.get(description) {
        return Ok(canonical.clone());
    }
    let children = node
        .children()
        .iter()
        .map(|child| dedup_node(child, seen))
        .collect::<Result<Vec<_>, _>>()?;
    let rebuilt = node.rebuild_if_changed(children)?;
    Ok(seen
        .entry(description.to_string())
        .or_insert(rebuilt)
        .clone())
}

/// Number of physically distinct nodes reachable from `roots`.
pub(crate) fn count_distinct(roots: &[Node]) -> usize {
    let mut visited = HashSet::new();
    let mut stack: Vec<Node> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if visited.insert(node.id()) {
            stack.extend(node.children());
        }
    }
    visited.len()
}
