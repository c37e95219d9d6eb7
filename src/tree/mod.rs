pub mod cart;
pub mod lineage;

use crate::data::Matrix;
use crate::error::Result;
use std::fmt;
use std::time::Instant;

/// Child index marking "no child" (leaf node)
pub const TREE_LEAF: i64 = -1;

/// Feature index stored on leaves
pub const TREE_UNDEFINED: i64 = -2;

/// Per-node count of training samples of each label
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassCounts(pub Vec<u64>);

impl ClassCounts {
    pub fn zeros(n_classes: usize) -> Self {
        Self(vec![0; n_classes])
    }

    /// Total number of samples at the node
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Codes of the labels with a nonzero count, in code order
    pub fn nonzero_labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(code, _)| code)
    }

    /// Gini impurity of the counts
    pub fn gini(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        1.0 - self
            .0
            .iter()
            .map(|&c| {
                let p = c as f64 / total;
                p * p
            })
            .sum::<f64>()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for ClassCounts {
    fn from(counts: Vec<u64>) -> Self {
        Self(counts)
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Fitted decision tree as parallel node arrays.
///
/// Node 0 is the root. A node is a leaf iff its left child is [`TREE_LEAF`];
/// `feature` and `threshold` are meaningless on leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FittedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<ClassCounts>,
}

impl FittedTree {
    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == TREE_LEAF
    }

    /// Indices of all leaves, in node order
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.node_count()).filter(|&n| self.is_leaf(n)).collect()
    }

    /// Depth of the deepest leaf (a root-only tree has depth 0)
    pub fn max_depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if node >= self.node_count() {
                continue;
            }
            max = max.max(depth);
            if !self.is_leaf(node) {
                for child in [self.children_left[node], self.children_right[node]] {
                    if child >= 0 {
                        stack.push((child as usize, depth + 1));
                    }
                }
            }
        }
        max
    }

    /// Append a node (initially childless) and return its index
    pub fn push_node(&mut self, feature: i64, threshold: f64, value: ClassCounts) -> usize {
        self.children_left.push(TREE_LEAF);
        self.children_right.push(TREE_LEAF);
        self.feature.push(feature);
        self.threshold.push(threshold);
        self.value.push(value);
        self.node_count() - 1
    }

    /// Attach two children to a split node
    pub fn set_children(&mut self, parent: usize, left: usize, right: usize) {
        self.children_left[parent] = left as i64;
        self.children_right[parent] = right as i64;
    }
}

/// Output of one tree fit
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub tree: FittedTree,
    /// Importance per feature, aligned with the input matrix columns
    pub importances: Vec<f64>,
}

/// Decision-tree classifier seam
pub trait TreeInducer {
    /// Fit a classifier on `x` with labels coded in `[0, n_classes)`.
    ///
    /// Implementations should give up with `InductionTimeout` once `deadline`
    /// has passed.
    fn fit(
        &self,
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        deadline: Option<Instant>,
    ) -> Result<FittedModel>;
}
