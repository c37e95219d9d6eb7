//! Schema migrations using PRAGMA user_version.

use crate::error::Result;
use rusqlite::Connection;
use tracing::info;

/// v1: experiments, tree generations and the lineage projection tables.
pub const V1_SQL: &str = "
CREATE TABLE IF NOT EXISTS experiment (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS experiment_label (
    experiencia_id INTEGER NOT NULL REFERENCES experiment(id),
    code           INTEGER NOT NULL CHECK (code >= 0),
    label          TEXT NOT NULL,
    PRIMARY KEY (experiencia_id, code),
    UNIQUE (experiencia_id, label)
);

CREATE TABLE IF NOT EXISTS tree (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    experiment_id INTEGER NOT NULL REFERENCES experiment(id)
);

CREATE INDEX IF NOT EXISTS idx_tree_experiment ON tree(experiment_id);

CREATE TABLE IF NOT EXISTS place_of_genes_in_tree (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    gene_name       TEXT NOT NULL,
    tree_generation INTEGER NOT NULL REFERENCES tree(id),
    experiencia_id  INTEGER NOT NULL REFERENCES experiment(id),
    depth           INTEGER NOT NULL CHECK (depth >= 0),
    class_0         INTEGER NOT NULL,
    class_1         INTEGER NOT NULL,
    class_2         INTEGER NOT NULL,
    class_3         INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_place_experiment_gene ON place_of_genes_in_tree(experiencia_id, gene_name);
CREATE INDEX IF NOT EXISTS idx_place_tree ON place_of_genes_in_tree(tree_generation);

CREATE TABLE IF NOT EXISTS father_and_son_nodes (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    gene_id_parent   TEXT NOT NULL,
    gene_id_son      TEXT NOT NULL,
    tree_generation  INTEGER NOT NULL REFERENCES tree(id),
    experiencia_id   INTEGER NOT NULL REFERENCES experiment(id),
    depth            INTEGER NOT NULL CHECK (depth >= 0),
    class_0_father   INTEGER NOT NULL,
    class_1_father   INTEGER NOT NULL,
    class_2_father   INTEGER NOT NULL,
    class_3_father   INTEGER NOT NULL,
    class_0_son      INTEGER NOT NULL,
    class_1_son      INTEGER NOT NULL,
    class_2_son      INTEGER NOT NULL,
    class_3_son      INTEGER NOT NULL,
    expression_value REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_father_son_experiment ON father_and_son_nodes(experiencia_id);
CREATE INDEX IF NOT EXISTS idx_father_son_tree ON father_and_son_nodes(tree_generation);

CREATE TABLE IF NOT EXISTS path (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    cond            TEXT NOT NULL,
    nodes           INTEGER NOT NULL CHECK (nodes >= 0),
    tree_generation INTEGER NOT NULL REFERENCES tree(id),
    experiencia_id  INTEGER NOT NULL REFERENCES experiment(id)
);

CREATE INDEX IF NOT EXISTS idx_path_experiment ON path(experiencia_id, cond);
CREATE INDEX IF NOT EXISTS idx_path_tree ON path(tree_generation);

CREATE TABLE IF NOT EXISTS genes_in_path (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    gene_id        TEXT NOT NULL,
    depth          INTEGER NOT NULL CHECK (depth >= 0),
    path_id        INTEGER NOT NULL REFERENCES path(id),
    experiencia_id INTEGER NOT NULL REFERENCES experiment(id)
);

CREATE INDEX IF NOT EXISTS idx_genes_in_path_path ON genes_in_path(path_id);

CREATE TABLE IF NOT EXISTS esta_em (
    tree_id        INTEGER NOT NULL REFERENCES tree(id),
    gene_id        TEXT NOT NULL,
    experiencia_id INTEGER NOT NULL REFERENCES experiment(id),
    PRIMARY KEY (tree_id, gene_id)
);

CREATE TABLE IF NOT EXISTS tree_node (
    tree_node_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    depth          INTEGER NOT NULL CHECK (depth >= 0),
    father_node_id INTEGER REFERENCES tree_node(tree_node_id),
    tree_id        INTEGER NOT NULL REFERENCES tree(id),
    gene_id        TEXT NOT NULL,
    experiencia_id INTEGER NOT NULL REFERENCES experiment(id)
);

CREATE INDEX IF NOT EXISTS idx_tree_node_gene ON tree_node(tree_id, gene_id);
";

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = current_version(conn)?;
    let migrations: &[(&str, u32)] = &[(V1_SQL, 1)];

    for &(sql, version) in migrations {
        if current < version {
            conn.execute_batch(sql)?;
            conn.pragma_update(None, "user_version", version)?;
            info!(version, "applied migration");
        }
    }

    Ok(())
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
