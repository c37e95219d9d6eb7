//! SQLite persistence for experiments and projected tree lineages.

pub mod mining;
pub mod queries;
pub mod schema;

use crate::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Single-connection store; every tree generation is written in one transaction
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open a database at the given path, apply pragmas, run migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        schema::run_migrations(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Read access to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Database file path (None for in-memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` succeeds; any error drops the transaction, which rolls
    /// back every statement `f` executed.
    pub fn with_transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Create an experiment together with the label order of its count columns
    pub fn create_experiment(&mut self, description: &str, labels: &[String]) -> Result<i64> {
        let id = self.with_transaction(|tx| {
            let id = queries::insert_experiment(tx, description)?;
            for (code, label) in labels.iter().enumerate() {
                queries::insert_experiment_label(tx, id, code, label)?;
            }
            Ok(id)
        })?;
        debug!(experiment_id = id, labels = labels.len(), "created experiment");
        Ok(id)
    }
}
