//! Insert and lookup statements for the projection tables.
//!
//! Every function takes a `&Connection` so it can run on a plain connection or
//! inside a `Transaction` (which derefs to one).

use crate::error::{PipelineError, Result};
use crate::tree::ClassCounts;
use rusqlite::{params, Connection, OptionalExtension};

/// Number of class-count columns per count vector
pub const COUNT_COLUMNS: usize = 4;

/// A class-count vector laid out over the fixed count columns
pub type CountColumns = [i64; COUNT_COLUMNS];

/// Zero-pad `counts` to the fixed count columns.
pub fn count_columns(counts: &ClassCounts) -> Result<CountColumns> {
    let slice = counts.as_slice();
    if slice.len() > COUNT_COLUMNS {
        return Err(PipelineError::Encoding(format!(
            "{} classes do not fit in {} count columns",
            slice.len(),
            COUNT_COLUMNS
        )));
    }
    let mut columns = [0i64; COUNT_COLUMNS];
    for (slot, &count) in columns.iter_mut().zip(slice) {
        *slot = i64::try_from(count).map_err(|_| {
            PipelineError::Encoding(format!("class count {} overflows a column", count))
        })?;
    }
    Ok(columns)
}

/// Convert a count or depth to an SQLite integer.
pub(crate) fn sql_int(value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|e| PipelineError::StoreWrite(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

/// Row of `place_of_genes_in_tree`
#[derive(Debug, Clone, PartialEq)]
pub struct GeneOccurrenceRow<'a> {
    pub gene: &'a str,
    pub tree_id: i64,
    pub experiment_id: i64,
    pub depth: usize,
    pub counts: CountColumns,
}

/// Row of `father_and_son_nodes`
#[derive(Debug, Clone, PartialEq)]
pub struct ParentChildRow<'a> {
    pub parent: &'a str,
    pub child: &'a str,
    pub tree_id: i64,
    pub experiment_id: i64,
    pub depth: usize,
    pub parent_counts: CountColumns,
    pub child_counts: CountColumns,
    pub expression_value: f64,
}

/// Row of `tree_node`
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNodeRow<'a> {
    pub depth: usize,
    pub father: Option<i64>,
    pub tree_id: i64,
    pub gene: &'a str,
    pub experiment_id: i64,
}

// ─── Experiments and trees ──────────────────────────────────────────

pub fn insert_experiment(conn: &Connection, description: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO experiment (description) VALUES (?1)",
        params![description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_experiment_label(
    conn: &Connection,
    experiment_id: i64,
    code: usize,
    label: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO experiment_label (experiencia_id, code, label) VALUES (?1, ?2, ?3)",
        params![experiment_id, sql_int(code)?, label],
    )?;
    Ok(())
}

/// Labels of an experiment in code order
pub fn experiment_labels(conn: &Connection, experiment_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT label FROM experiment_label WHERE experiencia_id = ?1 ORDER BY code",
    )?;
    let rows = stmt.query_map(params![experiment_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
}

pub fn insert_tree(conn: &Connection, experiment_id: i64) -> Result<i64> {
    let mut stmt = conn.prepare_cached("INSERT INTO tree (experiment_id) VALUES (?1)")?;
    stmt.execute(params![experiment_id])?;
    Ok(conn.last_insert_rowid())
}

// ─── Projection rows ────────────────────────────────────────────────

pub fn insert_gene_occurrence(conn: &Connection, row: &GeneOccurrenceRow<'_>) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO place_of_genes_in_tree
            (gene_name, tree_generation, experiencia_id, depth,
             class_0, class_1, class_2, class_3)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let [c0, c1, c2, c3] = row.counts;
    stmt.execute(params![
        row.gene,
        row.tree_id,
        row.experiment_id,
        sql_int(row.depth)?,
        c0,
        c1,
        c2,
        c3
    ])?;
    Ok(())
}

pub fn insert_parent_child(conn: &Connection, row: &ParentChildRow<'_>) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO father_and_son_nodes
            (gene_id_parent, gene_id_son, tree_generation, experiencia_id, depth,
             class_0_father, class_1_father, class_2_father, class_3_father,
             class_0_son, class_1_son, class_2_son, class_3_son,
             expression_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    let [f0, f1, f2, f3] = row.parent_counts;
    let [s0, s1, s2, s3] = row.child_counts;
    stmt.execute(params![
        row.parent,
        row.child,
        row.tree_id,
        row.experiment_id,
        sql_int(row.depth)?,
        f0,
        f1,
        f2,
        f3,
        s0,
        s1,
        s2,
        s3,
        row.expression_value
    ])?;
    Ok(())
}

/// Insert a path row and return its id
pub fn insert_path(
    conn: &Connection,
    condition: &str,
    nodes: usize,
    tree_id: i64,
    experiment_id: i64,
) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO path (cond, nodes, tree_generation, experiencia_id)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    stmt.execute(params![condition, sql_int(nodes)?, tree_id, experiment_id])?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_gene_in_path(
    conn: &Connection,
    gene: &str,
    depth: usize,
    path_id: i64,
    experiment_id: i64,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO genes_in_path (gene_id, depth, path_id, experiencia_id)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    stmt.execute(params![gene, sql_int(depth)?, path_id, experiment_id])?;
    Ok(())
}

// ─── Gene-in-tree and node hierarchy ────────────────────────────────

pub fn gene_in_tree_exists(conn: &Connection, tree_id: i64, gene: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT 1 FROM esta_em WHERE tree_id = ?1 AND gene_id = ?2")?;
    Ok(stmt.exists(params![tree_id, gene])?)
}

pub fn insert_gene_in_tree(
    conn: &Connection,
    tree_id: i64,
    gene: &str,
    experiment_id: i64,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO esta_em (tree_id, gene_id, experiencia_id) VALUES (?1, ?2, ?3)",
    )?;
    stmt.execute(params![tree_id, gene, experiment_id])?;
    Ok(())
}

/// Most recently inserted `tree_node` for a gene in a tree generation
pub fn latest_tree_node(conn: &Connection, tree_id: i64, gene: &str) -> Result<Option<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT tree_node_id FROM tree_node
         WHERE tree_id = ?1 AND gene_id = ?2
         ORDER BY tree_node_id DESC LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![tree_id, gene], |row| row.get(0))
        .optional()?)
}

/// Insert a tree node and return its id
pub fn insert_tree_node(conn: &Connection, row: &TreeNodeRow<'_>) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO tree_node (depth, father_node_id, tree_id, gene_id, experiencia_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    stmt.execute(params![
        sql_int(row.depth)?,
        row.father,
        row.tree_id,
        row.gene,
        row.experiment_id
    ])?;
    Ok(conn.last_insert_rowid())
}
