//! Root-to-leaf lineages of a fitted tree.

use crate::error::{PipelineError, Result};
use crate::tree::{ClassCounts, FittedTree, TREE_LEAF};

/// Branch taken at an ancestor split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Left child, value <= threshold
    Low,
    /// Right child, value > threshold
    High,
}

/// One ancestor split on the way from the root to a leaf
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Index of the split node
    pub node: usize,
    pub branch: Branch,
    pub threshold: f64,
    /// Gene the node splits on
    pub gene: String,
    /// Class counts observed at the split node
    pub counts: ClassCounts,
}

/// The leaf that terminates a lineage
#[derive(Debug, Clone, PartialEq)]
pub struct LeafMarker {
    pub node: usize,
    pub counts: ClassCounts,
}

/// Root-to-leaf path through a fitted tree.
///
/// `edges[d]` is the split at depth `d`; a root-only tree produces a lineage
/// with no edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineage {
    pub edges: Vec<Edge>,
    pub leaf: LeafMarker,
}

impl Lineage {
    /// Number of entries, counting the leaf marker
    pub fn len(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn is_root_only(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of split nodes between root and leaf
    pub fn split_count(&self) -> usize {
        self.edges.len()
    }
}

/// Parent of each node, found once per tree
fn parent_table(tree: &FittedTree) -> Result<Vec<Option<(usize, Branch)>>> {
    let n = tree.node_count();
    let mut parents = vec![None; n];

    for node in 0..n {
        if tree.children_left[node] == TREE_LEAF {
            continue;
        }
        for (child, branch) in [
            (tree.children_left[node], Branch::Low),
            (tree.children_right[node], Branch::High),
        ] {
            if child <= 0 || child as usize >= n || child as usize == node {
                return Err(PipelineError::TreeStructure(format!(
                    "node {} has invalid child index {}",
                    node, child
                )));
            }
            let slot = &mut parents[child as usize];
            if slot.is_some() {
                return Err(PipelineError::TreeStructure(format!(
                    "node {} is referenced by more than one parent",
                    child
                )));
            }
            *slot = Some((node, branch));
        }
    }

    Ok(parents)
}

fn check_shape(tree: &FittedTree) -> Result<()> {
    let n = tree.node_count();
    if n == 0 {
        return Err(PipelineError::TreeStructure("tree has no nodes".into()));
    }
    if tree.children_right.len() != n
        || tree.feature.len() != n
        || tree.threshold.len() != n
        || tree.value.len() != n
    {
        return Err(PipelineError::TreeStructure(
            "node arrays have different lengths".into(),
        ));
    }
    Ok(())
}

/// Extract the lineage of every leaf, in leaf index order.
///
/// `feature_names[i]` names feature index `i` of the fitted tree.
pub fn extract_lineages(tree: &FittedTree, feature_names: &[String]) -> Result<Vec<Lineage>> {
    check_shape(tree)?;
    let parents = parent_table(tree)?;
    let n = tree.node_count();

    let mut lineages = Vec::new();
    for leaf in tree.leaves() {
        if tree.value[leaf].total() == 0 {
            return Err(PipelineError::TreeStructure(format!(
                "leaf {} holds no samples",
                leaf
            )));
        }
        let mut edges = Vec::new();
        let mut current = leaf;

        while current != 0 {
            let (parent, branch) = parents[current].ok_or_else(|| {
                PipelineError::TreeStructure(format!("node {} has no parent and is not the root", current))
            })?;

            let feature = tree.feature[parent];
            let gene = usize::try_from(feature)
                .ok()
                .and_then(|f| feature_names.get(f))
                .ok_or_else(|| {
                    PipelineError::TreeStructure(format!(
                        "node {} splits on unknown feature {}",
                        parent, feature
                    ))
                })?;

            edges.push(Edge {
                node: parent,
                branch,
                threshold: tree.threshold[parent],
                gene: gene.clone(),
                counts: tree.value[parent].clone(),
            });
            if edges.len() > n {
                return Err(PipelineError::TreeStructure(format!(
                    "cycle while walking up from leaf {}",
                    leaf
                )));
            }
            current = parent;
        }

        edges.reverse();
        lineages.push(Lineage {
            edges,
            leaf: LeafMarker {
                node: leaf,
                counts: tree.value[leaf].clone(),
            },
        });
    }

    Ok(lineages)
}
