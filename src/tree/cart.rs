//! CART classifier with Gini impurity.
//!
//! Nodes are grown depth-first and numbered in pre-order (parent, left
//! subtree, right subtree). Every feature is scanned at every node and the
//! first best split in column order wins, so ties are broken by column
//! position.

use crate::data::Matrix;
use crate::error::{PipelineError, Result};
use crate::tree::{ClassCounts, FittedModel, FittedTree, TreeInducer, TREE_UNDEFINED};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Impurity decreases smaller than this do not beat the current best split
const MIN_IMPROVEMENT: f64 = 1e-12;

/// Threshold stored on leaf nodes
const LEAF_THRESHOLD: f64 = -2.0;

/// Stopping criteria for tree growth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Maximum tree depth (unlimited when unset)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required on each side of a split
    pub min_samples_leaf: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    /// Gini decrease weighted by the node's sample count
    weighted_decrease: f64,
}

struct Frame {
    samples: Vec<usize>,
    depth: usize,
    /// Parent node and whether this frame is its left child
    parent: Option<(usize, bool)>,
}

/// Decision-tree classifier used by the experiment runner
#[derive(Debug, Clone, Default)]
pub struct CartInducer {
    config: CartConfig,
}

impl CartInducer {
    pub fn new(config: CartConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    fn can_split(&self, counts: &ClassCounts, depth: usize) -> bool {
        let n = counts.total() as usize;
        n >= self.config.min_samples_split
            && n >= 2 * self.config.min_samples_leaf.max(1)
            && self.config.max_depth.map_or(true, |max| depth < max)
            && counts.gini() > 0.0
    }

    fn best_split(
        &self,
        x: &Matrix,
        y: &[usize],
        samples: &[usize],
        counts: &ClassCounts,
    ) -> Option<Split> {
        let n = samples.len();
        let n_f = n as f64;
        let parent_gini = counts.gini();
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<(f64, Split)> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature in 0..x.n_cols() {
            column.clear();
            column.extend(samples.iter().map(|&s| (x.get(s, feature), y[s])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = ClassCounts::zeros(counts.0.len());
            let mut right = counts.clone();

            for i in 0..n - 1 {
                let (value, label) = column[i];
                left.0[label] += 1;
                right.0[label] -= 1;

                let next = column[i + 1].0;
                if !value.is_finite() || !next.is_finite() || next <= value {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted =
                    (n_left as f64 * left.gini() + n_right as f64 * right.gini()) / n_f;
                let decrease = parent_gini - weighted;

                if best.map_or(true, |(d, _)| decrease > d + MIN_IMPROVEMENT) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some((
                        decrease,
                        Split {
                            feature,
                            threshold,
                            weighted_decrease: decrease * n_f,
                        },
                    ));
                }
            }
        }

        best.map(|(_, split)| split)
    }
}

fn class_counts(y: &[usize], samples: &[usize], n_classes: usize) -> ClassCounts {
    let mut counts = ClassCounts::zeros(n_classes);
    for &s in samples {
        counts.0[y[s]] += 1;
    }
    counts
}

impl TreeInducer for CartInducer {
    fn fit(
        &self,
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        deadline: Option<Instant>,
    ) -> Result<FittedModel> {
        if x.n_rows() == 0 {
            return Err(PipelineError::MalformedInput("cannot fit a tree on zero samples".into()));
        }
        if x.n_rows() != y.len() {
            return Err(PipelineError::MalformedInput(format!(
                "feature matrix has {} rows but {} labels were given",
                x.n_rows(),
                y.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(PipelineError::MalformedInput(format!(
                "label code {} outside [0, {})",
                bad, n_classes
            )));
        }

        let started = Instant::now();
        let mut tree = FittedTree::default();
        let mut importances = vec![0.0; x.n_cols()];

        let mut stack = vec![Frame {
            samples: (0..x.n_rows()).collect(),
            depth: 0,
            parent: None,
        }];

        while let Some(frame) = stack.pop() {
            if deadline.map_or(false, |d| Instant::now() >= d) {
                return Err(PipelineError::InductionTimeout(started.elapsed()));
            }

            let counts = class_counts(y, &frame.samples, n_classes);
            let split = if self.can_split(&counts, frame.depth) {
                self.best_split(x, y, &frame.samples, &counts)
            } else {
                None
            };

            let node = match split {
                Some(s) => tree.push_node(s.feature as i64, s.threshold, counts),
                None => tree.push_node(TREE_UNDEFINED, LEAF_THRESHOLD, counts),
            };
            if let Some((parent, is_left)) = frame.parent {
                if is_left {
                    tree.children_left[parent] = node as i64;
                } else {
                    tree.children_right[parent] = node as i64;
                }
            }

            if let Some(split) = split {
                importances[split.feature] += split.weighted_decrease;

                let (left, right): (Vec<usize>, Vec<usize>) = frame
                    .samples
                    .iter()
                    .copied()
                    .partition(|&s| x.get(s, split.feature) <= split.threshold);

                // right first so the left subtree is numbered next
                stack.push(Frame {
                    samples: right,
                    depth: frame.depth + 1,
                    parent: Some((node, false)),
                });
                stack.push(Frame {
                    samples: left,
                    depth: frame.depth + 1,
                    parent: Some((node, true)),
                });
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        debug!(
            "Fitted tree with {} nodes, depth {}, in {:?}",
            tree.node_count(),
            tree.max_depth(),
            started.elapsed()
        );

        Ok(FittedModel { tree, importances })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TREE_LEAF;

    /// Genes A, B, C; B separates healthy (0) from sick (1) at 1.5
    fn separable() -> (Matrix, Vec<usize>) {
        let x = Matrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![1.0, 1.0, 1.0],
            vec![1.0, 2.0, 0.0],
            vec![1.0, 2.0, 1.0],
        ]);
        (x, vec![0, 0, 1, 1])
    }

    #[test]
    fn test_single_split_on_separating_feature() {
        let (x, y) = separable();
        let model = CartInducer::default().fit(&x, &y, 2, None).unwrap();
        let tree = &model.tree;

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.feature[0], 1);
        assert_eq!(tree.threshold[0], 1.5);
        assert_eq!(tree.children_left[0], 1);
        assert_eq!(tree.children_right[0], 2);
        assert_eq!(tree.value[0], ClassCounts(vec![2, 2]));
        assert_eq!(tree.value[1], ClassCounts(vec![2, 0]));
        assert_eq!(tree.value[2], ClassCounts(vec![0, 2]));
        assert_eq!(tree.children_left[1], TREE_LEAF);

        assert_eq!(model.importances, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_pure_labels_give_root_only_tree() {
        let (x, _) = separable();
        let model = CartInducer::default().fit(&x, &[0, 0, 0, 0], 1, None).unwrap();

        assert_eq!(model.tree.node_count(), 1);
        assert!(model.tree.is_leaf(0));
        assert!(model.importances.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_preorder_numbering() {
        // x <= 1.5 -> {0, 1}, then 0 vs 1 on x <= 0.5; right side is pure
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let model = CartInducer::default().fit(&x, &[0, 1, 2, 2], 3, None).unwrap();
        let tree = &model.tree;

        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.children_left[0], 1);
        assert_eq!(tree.children_left[1], 2);
        assert_eq!(tree.children_right[1], 3);
        assert_eq!(tree.children_right[0], 4);
        assert_eq!(tree.leaves(), vec![2, 3, 4]);
    }

    #[test]
    fn test_max_depth() {
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let inducer = CartInducer::new(CartConfig {
            max_depth: Some(1),
            ..CartConfig::default()
        });
        let model = inducer.fit(&x, &[0, 1, 2, 2], 3, None).unwrap();
        assert_eq!(model.tree.max_depth(), 1);
    }

    #[test]
    fn test_nan_never_becomes_a_threshold() {
        let x = Matrix::from_rows(&[vec![1.0], vec![f64::NAN]]);
        let model = CartInducer::default().fit(&x, &[0, 1], 2, None).unwrap();
        assert_eq!(model.tree.node_count(), 1);

        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![f64::NAN]]);
        let model = CartInducer::default().fit(&x, &[0, 1, 1], 2, None).unwrap();
        assert_eq!(model.tree.node_count(), 3);
        assert_eq!(model.tree.threshold[0], 0.5);
        assert!(model.tree.threshold.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn test_expired_deadline() {
        let (x, y) = separable();
        let result = CartInducer::default().fit(&x, &y, 2, Some(Instant::now()));
        assert!(matches!(result, Err(PipelineError::InductionTimeout(_))));
    }

    #[test]
    fn test_label_out_of_range() {
        let (x, _) = separable();
        let result = CartInducer::default().fit(&x, &[0, 0, 1, 2], 2, None);
        assert!(matches!(result, Err(PipelineError::MalformedInput(_))));
    }
}
