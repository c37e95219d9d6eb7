//! Summary queries over the lineage tables of one experiment.

use crate::error::Result;
use crate::store::queries;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Experiment header with its tree generation count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentInfo {
    pub id: i64,
    pub description: String,
    pub created_at: String,
    pub trees: i64,
    pub labels: Vec<String>,
}

/// How often a gene appears as a split across lineages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneFrequency {
    pub gene: String,
    pub occurrences: i64,
    /// Distinct tree generations the gene splits in
    pub trees: i64,
    pub min_depth: i64,
    pub mean_depth: f64,
}

/// A deduplicated parent/child pair and the trees it appears in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFrequency {
    pub parent: String,
    pub child: String,
    pub depth: i64,
    pub occurrences: i64,
}

/// Path statistics for one condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionPaths {
    pub condition: String,
    pub paths: i64,
    pub mean_nodes: f64,
}

pub fn list_experiments(conn: &Connection) -> Result<Vec<ExperimentInfo>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM experiment ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut experiments = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(info) = experiment_info(conn, id)? {
            experiments.push(info);
        }
    }
    Ok(experiments)
}

pub fn experiment_info(conn: &Connection, experiment_id: i64) -> Result<Option<ExperimentInfo>> {
    let mut stmt = conn.prepare_cached(
        "SELECT e.description, e.created_at,
                (SELECT COUNT(*) FROM tree t WHERE t.experiment_id = e.id)
         FROM experiment e WHERE e.id = ?1",
    )?;
    let header = stmt
        .query_row(params![experiment_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
        })
        .optional()?;

    match header {
        Some((description, created_at, trees)) => Ok(Some(ExperimentInfo {
            id: experiment_id,
            description,
            created_at,
            trees,
            labels: queries::experiment_labels(conn, experiment_id)?,
        })),
        None => Ok(None),
    }
}

/// Genes ranked by split occurrences, ties broken by shallower depth
pub fn top_genes(conn: &Connection, experiment_id: i64, limit: usize) -> Result<Vec<GeneFrequency>> {
    let mut stmt = conn.prepare_cached(
        "SELECT gene_name, COUNT(*), COUNT(DISTINCT tree_generation),
                MIN(depth), AVG(depth)
         FROM place_of_genes_in_tree
         WHERE experiencia_id = ?1
         GROUP BY gene_name
         ORDER BY COUNT(*) DESC, AVG(depth) ASC, gene_name ASC
         LIMIT ?2",
    )?;
    let limit = queries::sql_int(limit)?;
    let rows = stmt.query_map(params![experiment_id, limit], |row| {
        Ok(GeneFrequency {
            gene: row.get(0)?,
            occurrences: row.get(1)?,
            trees: row.get(2)?,
            min_depth: row.get(3)?,
            mean_depth: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Parent/child gene pairs ranked by the number of tree generations holding them
pub fn top_pairs(conn: &Connection, experiment_id: i64, limit: usize) -> Result<Vec<PairFrequency>> {
    let mut stmt = conn.prepare_cached(
        "SELECT gene_id_parent, gene_id_son, depth, COUNT(*)
         FROM father_and_son_nodes
         WHERE experiencia_id = ?1
         GROUP BY gene_id_parent, gene_id_son, depth
         ORDER BY COUNT(*) DESC, depth ASC, gene_id_parent ASC, gene_id_son ASC
         LIMIT ?2",
    )?;
    let limit = queries::sql_int(limit)?;
    let rows = stmt.query_map(params![experiment_id, limit], |row| {
        Ok(PairFrequency {
            parent: row.get(0)?,
            child: row.get(1)?,
            depth: row.get(2)?,
            occurrences: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Path count and mean length per condition
pub fn paths_by_condition(conn: &Connection, experiment_id: i64) -> Result<Vec<ConditionPaths>> {
    let mut stmt = conn.prepare_cached(
        "SELECT cond, COUNT(*), AVG(nodes)
         FROM path
         WHERE experiencia_id = ?1
         GROUP BY cond
         ORDER BY cond",
    )?;
    let rows = stmt.query_map(params![experiment_id], |row| {
        Ok(ConditionPaths {
            condition: row.get(0)?,
            paths: row.get(1)?,
            mean_nodes: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Everything `mine` reports for an experiment
#[derive(Debug, Clone, Serialize)]
pub struct MiningReport {
    pub experiment: ExperimentInfo,
    pub top_genes: Vec<GeneFrequency>,
    pub top_pairs: Vec<PairFrequency>,
    pub paths: Vec<ConditionPaths>,
}

impl MiningReport {
    /// Build the report, or None when the experiment does not exist
    pub fn build(conn: &Connection, experiment_id: i64, limit: usize) -> Result<Option<Self>> {
        let Some(experiment) = experiment_info(conn, experiment_id)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            experiment,
            top_genes: top_genes(conn, experiment_id, limit)?,
            top_pairs: top_pairs(conn, experiment_id, limit)?,
            paths: paths_by_condition(conn, experiment_id)?,
        }))
    }

    pub fn print(&self) {
        println!("\n=== Experiment {} ===", self.experiment.id);
        println!("Description: {}", self.experiment.description);
        println!("Created: {}", self.experiment.created_at);
        println!("Tree generations: {}", self.experiment.trees);
        println!("Labels: {}", self.experiment.labels.join(", "));

        println!("\nTop genes:");
        for g in &self.top_genes {
            println!(
                "  {:<20} {:>6} splits in {:>5} trees, depth min {} mean {:.2}",
                g.gene, g.occurrences, g.trees, g.min_depth, g.mean_depth
            );
        }

        println!("\nTop parent/child pairs:");
        for p in &self.top_pairs {
            println!(
                "  {} -> {} (depth {}): {}",
                p.parent, p.child, p.depth, p.occurrences
            );
        }

        println!("\nPaths by condition:");
        for c in &self.paths {
            println!(
                "  {:<20} {:>6} paths, mean nodes {:.2}",
                c.condition, c.paths, c.mean_nodes
            );
        }
        println!("==========================\n");
    }
}
