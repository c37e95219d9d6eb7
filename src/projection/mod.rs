//! Projection of tree lineages onto the relational tables.
//!
//! One call writes everything derived from a single tree generation. Callers
//! run it inside the transaction that created the `tree` row so a failure
//! leaves no partial generation behind.

use crate::data::encoding::LabelEncoder;
use crate::error::{PipelineError, Result};
use crate::store::queries::{self, count_columns, CountColumns, GeneOccurrenceRow, ParentChildRow, TreeNodeRow};
use crate::tree::lineage::Lineage;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;
use std::ops::AddAssign;
use tracing::debug;

/// Rows written per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionReport {
    pub occurrences: usize,
    pub pairs: usize,
    pub paths: usize,
    pub genes_in_path: usize,
    pub genes_in_tree: usize,
    pub tree_nodes: usize,
}

impl ProjectionReport {
    pub fn total_rows(&self) -> usize {
        self.occurrences
            + self.pairs
            + self.paths
            + self.genes_in_path
            + self.genes_in_tree
            + self.tree_nodes
    }
}

impl AddAssign for ProjectionReport {
    fn add_assign(&mut self, other: Self) {
        self.occurrences += other.occurrences;
        self.pairs += other.pairs;
        self.paths += other.paths;
        self.genes_in_path += other.genes_in_path;
        self.genes_in_tree += other.genes_in_tree;
        self.tree_nodes += other.tree_nodes;
    }
}

/// Identity of a parent/child pair within one tree generation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey<'a> {
    child: &'a str,
    parent: &'a str,
    depth: usize,
    child_counts: CountColumns,
    parent_counts: CountColumns,
}

/// Target rows of one tree generation
#[derive(Debug, Clone, Copy)]
pub struct Generation {
    pub experiment_id: i64,
    pub tree_id: i64,
}

/// Write the projection of `lineages` for one tree generation.
pub fn project(
    conn: &Connection,
    generation: Generation,
    lineages: &[Lineage],
    labels: &LabelEncoder,
) -> Result<ProjectionReport> {
    let mut report = ProjectionReport::default();

    report.occurrences = write_occurrences(conn, generation, lineages)?;
    report.pairs = write_pairs(conn, generation, lineages)?;
    for lineage in lineages {
        let (paths, genes) = write_paths(conn, generation, lineage, labels)?;
        report.paths += paths;
        report.genes_in_path += genes;
    }
    for lineage in lineages {
        let (genes, nodes) = write_hierarchy(conn, generation, lineage)?;
        report.genes_in_tree += genes;
        report.tree_nodes += nodes;
    }

    debug!(tree_id = generation.tree_id, ?report, "projected lineages");
    Ok(report)
}

fn write_occurrences(conn: &Connection, generation: Generation, lineages: &[Lineage]) -> Result<usize> {
    let mut written = 0;
    for lineage in lineages {
        for (depth, edge) in lineage.edges.iter().enumerate() {
            queries::insert_gene_occurrence(
                conn,
                &GeneOccurrenceRow {
                    gene: &edge.gene,
                    tree_id: generation.tree_id,
                    experiment_id: generation.experiment_id,
                    depth,
                    counts: count_columns(&edge.counts)?,
                },
            )?;
            written += 1;
        }
    }
    Ok(written)
}

fn write_pairs(conn: &Connection, generation: Generation, lineages: &[Lineage]) -> Result<usize> {
    let mut seen: HashSet<PairKey<'_>> = HashSet::new();

    for lineage in lineages {
        for (depth, child) in lineage.edges.iter().enumerate() {
            // the root split is its own parent
            let parent = if depth == 0 { child } else { &lineage.edges[depth - 1] };
            let key = PairKey {
                child: &child.gene,
                parent: &parent.gene,
                depth,
                child_counts: count_columns(&child.counts)?,
                parent_counts: count_columns(&parent.counts)?,
            };
            if seen.contains(&key) {
                continue;
            }

            queries::insert_parent_child(
                conn,
                &ParentChildRow {
                    parent: key.parent,
                    child: key.child,
                    tree_id: generation.tree_id,
                    experiment_id: generation.experiment_id,
                    depth,
                    parent_counts: key.parent_counts,
                    child_counts: key.child_counts,
                    expression_value: child.threshold,
                },
            )?;
            seen.insert(key);
        }
    }

    Ok(seen.len())
}

/// Path rows for every label present at the leaf, then the lineage's genes
/// under the last of them. Returns (paths, genes_in_path) written.
fn write_paths(
    conn: &Connection,
    generation: Generation,
    lineage: &Lineage,
    labels: &LabelEncoder,
) -> Result<(usize, usize)> {
    let nodes = lineage.split_count();
    let mut last_path = None;
    let mut paths = 0;

    for code in lineage.leaf.counts.nonzero_labels() {
        let condition = labels.decode(code).ok_or_else(|| {
            PipelineError::TreeStructure(format!(
                "leaf {} counts samples of unknown label code {}",
                lineage.leaf.node, code
            ))
        })?;
        let id = queries::insert_path(
            conn,
            condition,
            nodes,
            generation.tree_id,
            generation.experiment_id,
        )?;
        last_path = Some(id);
        paths += 1;
    }

    let Some(path_id) = last_path else {
        return Err(PipelineError::TreeStructure(format!(
            "leaf {} holds no samples",
            lineage.leaf.node
        )));
    };

    for (depth, edge) in lineage.edges.iter().enumerate().rev() {
        queries::insert_gene_in_path(conn, &edge.gene, depth, path_id, generation.experiment_id)?;
    }

    Ok((paths, lineage.edges.len()))
}

/// `esta_em` markers and the `tree_node` chain of one lineage.
/// Returns (genes_in_tree, tree_nodes) written.
fn write_hierarchy(conn: &Connection, generation: Generation, lineage: &Lineage) -> Result<(usize, usize)> {
    let tree_id = generation.tree_id;
    let mut markers = 0;

    for (depth, edge) in lineage.edges.iter().enumerate() {
        if !queries::gene_in_tree_exists(conn, tree_id, &edge.gene)? {
            queries::insert_gene_in_tree(conn, tree_id, &edge.gene, generation.experiment_id)?;
            markers += 1;
        }

        let father = match depth {
            0 => None,
            _ => queries::latest_tree_node(conn, tree_id, &lineage.edges[depth - 1].gene)?,
        };
        queries::insert_tree_node(
            conn,
            &TreeNodeRow {
                depth,
                father,
                tree_id,
                gene: &edge.gene,
                experiment_id: generation.experiment_id,
            },
        )?;
    }

    Ok((markers, lineage.edges.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{queries::insert_tree, Store};
    use crate::tree::lineage::{Branch, Edge, LeafMarker};
    use crate::tree::ClassCounts;

    fn encoder() -> LabelEncoder {
        LabelEncoder::fit_transform(&["healthy", "sick"]).unwrap().0
    }

    fn edge(node: usize, gene: &str, branch: Branch, threshold: f64, counts: Vec<u64>) -> Edge {
        Edge {
            node,
            branch,
            threshold,
            gene: gene.to_string(),
            counts: ClassCounts(counts),
        }
    }

    fn lineage(edges: Vec<Edge>, leaf_node: usize, leaf: Vec<u64>) -> Lineage {
        Lineage {
            edges,
            leaf: LeafMarker {
                node: leaf_node,
                counts: ClassCounts(leaf),
            },
        }
    }

    fn generation(store: &mut Store) -> Generation {
        let labels = encoder().labels().to_vec();
        let experiment_id = store.create_experiment("projection", &labels).unwrap();
        let tree_id = insert_tree(store.connection(), experiment_id).unwrap();
        Generation { experiment_id, tree_id }
    }

    fn count(store: &Store, sql: &str) -> i64 {
        store.connection().query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_single_split() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation(&mut store);
        let lineages = vec![
            lineage(vec![edge(0, "B", Branch::Low, 1.5, vec![2, 2])], 1, vec![2, 0]),
            lineage(vec![edge(0, "B", Branch::High, 1.5, vec![2, 2])], 2, vec![0, 2]),
        ];

        let report = project(store.connection(), generation, &lineages, &encoder()).unwrap();
        assert_eq!(
            report,
            ProjectionReport {
                occurrences: 2,
                pairs: 1,
                paths: 2,
                genes_in_path: 2,
                genes_in_tree: 1,
                tree_nodes: 2,
            }
        );

        assert_eq!(count(&store, "SELECT COUNT(*) FROM place_of_genes_in_tree WHERE gene_name = 'B' AND depth = 0"), 2);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM path WHERE cond = 'healthy' AND nodes = 1"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM path WHERE cond = 'sick' AND nodes = 1"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM father_and_son_nodes WHERE depth >= 1"), 0);

        let (parent, child, value): (String, String, f64) = store
            .connection()
            .query_row(
                "SELECT gene_id_parent, gene_id_son, expression_value FROM father_and_son_nodes",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((parent.as_str(), child.as_str(), value), ("B", "B", 1.5));
    }

    #[test]
    fn test_root_only_lineage() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation(&mut store);
        let lineages = vec![lineage(vec![], 0, vec![4, 0])];

        let report = project(store.connection(), generation, &lineages, &encoder()).unwrap();
        assert_eq!(report.occurrences, 0);
        assert_eq!(report.pairs, 0);
        assert_eq!(report.paths, 1);
        assert_eq!(report.tree_nodes, 0);
        assert_eq!(count(&store, "SELECT nodes FROM path"), 0);
    }

    #[test]
    fn test_impure_leaf_genes_go_to_last_path() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation(&mut store);
        let lineages = vec![lineage(
            vec![
                edge(0, "A", Branch::Low, 0.5, vec![3, 3]),
                edge(1, "C", Branch::Low, 2.5, vec![2, 1]),
            ],
            2,
            vec![1, 1],
        )];

        let report = project(store.connection(), generation, &lineages, &encoder()).unwrap();
        assert_eq!(report.paths, 2);
        assert_eq!(report.genes_in_path, 2);

        let last_path = count(&store, "SELECT MAX(id) FROM path");
        assert_eq!(
            count(&store, &format!("SELECT COUNT(*) FROM genes_in_path WHERE path_id = {}", last_path)),
            2
        );
    }

    #[test]
    fn test_tree_node_chain_per_lineage() {
        // root A at depth 0, both children split on A again
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation(&mut store);
        let root = |b| edge(0, "A", b, 1.0, vec![2, 2]);
        let lineages = vec![
            lineage(vec![root(Branch::Low), edge(1, "A", Branch::Low, 0.5, vec![1, 1])], 2, vec![1, 0]),
            lineage(vec![root(Branch::Low), edge(1, "A", Branch::High, 0.5, vec![1, 1])], 3, vec![0, 1]),
            lineage(vec![root(Branch::High), edge(4, "A", Branch::Low, 1.5, vec![1, 1])], 5, vec![1, 0]),
            lineage(vec![root(Branch::High), edge(4, "A", Branch::High, 1.5, vec![1, 1])], 6, vec![0, 1]),
        ];

        let report = project(store.connection(), generation, &lineages, &encoder()).unwrap();
        assert_eq!(report.tree_nodes, 8);
        assert_eq!(report.genes_in_tree, 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM tree_node WHERE father_node_id IS NULL"), 4);

        // every child row points at the root row inserted just before it
        assert_eq!(
            count(
                &store,
                "SELECT COUNT(*) FROM tree_node c JOIN tree_node f
                 ON c.father_node_id = f.tree_node_id
                 WHERE c.depth = 1 AND f.depth = 0 AND f.tree_node_id = c.tree_node_id - 1"
            ),
            4
        );
    }

    #[test]
    fn test_pairs_deduplicated_per_generation() {
        let mut store = Store::open_in_memory().unwrap();
        let first = generation(&mut store);
        let shared = vec![
            edge(0, "A", Branch::Low, 1.0, vec![3, 3]),
            edge(1, "B", Branch::Low, 2.0, vec![3, 1]),
        ];
        let mut sibling = shared.clone();
        sibling[1].branch = Branch::High;
        let lineages = vec![
            lineage(shared, 2, vec![3, 0]),
            lineage(sibling, 3, vec![0, 1]),
        ];

        let a = project(store.connection(), first, &lineages, &encoder()).unwrap();
        let second = Generation {
            tree_id: insert_tree(store.connection(), first.experiment_id).unwrap(),
            ..first
        };
        let b = project(store.connection(), second, &lineages, &encoder()).unwrap();

        assert_eq!(a.pairs, 2);
        assert_eq!(b.pairs, a.pairs);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM father_and_son_nodes"), 4);
    }

    #[test]
    fn test_report_add_assign() {
        let mut total = ProjectionReport::default();
        total += ProjectionReport {
            occurrences: 2,
            pairs: 1,
            paths: 2,
            genes_in_path: 2,
            genes_in_tree: 1,
            tree_nodes: 2,
        };
        total += ProjectionReport {
            paths: 1,
            ..ProjectionReport::default()
        };
        assert_eq!(total.paths, 3);
        assert_eq!(total.total_rows(), 11);
    }
}
