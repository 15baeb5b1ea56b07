// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `StateDb` (§4.1): one embedded SQLite file, one connection per thread.

use std::collections::HashMap;
use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;
use sy_core::ProductInstance;
use thiserror::Error;
use tracing::warn;

use crate::migration;

#[derive(Debug, Error)]
pub enum StateDbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("set_loaded({0}) called twice: the instance is already marked loaded")]
    AlreadyLoaded(String),
}

/// A row of `pending_productinstances()`: the id to process and whether any
/// contributing enqueue requested a forced reload (§4.1/§3 invariants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProductInstance {
    pub productinstance_id: String,
    pub force: bool,
}

/// Durable store of pending work and loaded-history, and the reporter's
/// last-seen-per-(model,stage) table.
///
/// Each caller is expected to hold its own `StateDb` handle (they share the
/// underlying pool cheaply via `Clone`); rusqlite serializes writers at the
/// file level, matching the embedded store's default serializable isolation.
#[derive(Clone)]
pub struct StateDb {
    pool: Pool<SqliteConnectionManager>,
}

impl StateDb {
    /// Open (creating if missing) the state database at `path`, applying any
    /// outstanding schema migrations (§3 Lifecycle).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateDbError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::new(manager)?;
        {
            let mut conn = pool.get()?;
            migration::run(&mut conn)?;
        }
        Ok(Self { pool })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn open_in_memory() -> Result<Self, StateDbError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        {
            let mut conn = pool.get()?;
            migration::run(&mut conn)?;
        }
        Ok(Self { pool })
    }

    pub fn is_loaded(&self, productinstance_id: &str) -> Result<bool, StateDbError> {
        let conn = self.pool.get()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM loaded_data WHERE productinstance_id = ?1",
                [productinstance_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Mark `productinstance_id` loaded, then prune rows older than 24 hours
    /// (§4.1). A duplicate insert is caller misuse and is surfaced as an error.
    pub fn set_loaded(&self, productinstance_id: &str) -> Result<(), StateDbError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO loaded_data (productinstance_id, load_time) \
                 VALUES (?1, datetime('now'))",
                [productinstance_id],
            )?;
        if inserted == 0 {
            return Err(StateDbError::AlreadyLoaded(productinstance_id.to_string()));
        }
        tx.execute(
            "DELETE FROM loaded_data WHERE load_time < datetime('now', '-24 hours')",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Enqueue `pi` as pending work. Duplicates are permitted; the aggregation
    /// in [`StateDb::pending_productinstances`] guarantees latest-wins
    /// semantics (§3 invariants).
    pub fn add_productinstance_to_be_processed(
        &self,
        pi: &ProductInstance,
        force: bool,
        even_if_previously_loaded: bool,
    ) -> Result<(), StateDbError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        if even_if_previously_loaded {
            tx.execute(
                "DELETE FROM loaded_data WHERE productinstance_id = ?1",
                [&pi.id],
            )?;
        }
        tx.execute(
            "INSERT INTO pending_jobs (product_id, reference_time, version, productinstance_id, force) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                pi.product_id,
                pi.reference_time.to_rfc3339(),
                pi.version,
                pi.id,
                force as i64,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// For each distinct `product_id`, the id with the greatest
    /// `(reference_time, version)` and the disjunction of `force` across all
    /// rows for that product (§3/§4.1 invariants).
    pub fn pending_productinstances(
        &self,
    ) -> Result<HashMap<String, PendingProductInstance>, StateDbError> {
        let conn = self.pool.get()?;
        let mut product_ids_stmt =
            conn.prepare("SELECT DISTINCT product_id FROM pending_jobs")?;
        let product_ids = product_ids_stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut latest_stmt = conn.prepare(
            "SELECT productinstance_id FROM pending_jobs WHERE product_id = ?1 \
             ORDER BY reference_time DESC, version DESC LIMIT 1",
        )?;
        let mut force_stmt =
            conn.prepare("SELECT MAX(force) FROM pending_jobs WHERE product_id = ?1")?;

        let mut result = HashMap::with_capacity(product_ids.len());
        for product_id in product_ids {
            let productinstance_id: String =
                latest_stmt.query_row([&product_id], |row| row.get(0))?;
            let force: i64 = force_stmt.query_row([&product_id], |row| row.get(0))?;
            result.insert(
                product_id,
                PendingProductInstance { productinstance_id, force: force != 0 },
            );
        }
        Ok(result)
    }

    /// Delete all pending rows for `pi.product_id` — crossing a newer
    /// enqueued instance is intentional (§3 invariants).
    pub fn done(&self, pi: &ProductInstance) -> Result<(), StateDbError> {
        let conn = self.pool.get()?;
        let deleted =
            conn.execute("DELETE FROM pending_jobs WHERE product_id = ?1", [&pi.product_id])?;
        if deleted == 0 {
            warn!(product_id = %pi.product_id, "done() found no pending rows to clear");
        }
        Ok(())
    }

    /// Upsert the reporter's last-seen-per-(model,stage) row (§4.7).
    pub fn set_last_incoming(
        &self,
        model: &str,
        stage: &str,
        datainstance_id: &str,
        reference_time: &str,
    ) -> Result<(), StateDbError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO last_data (model, type, datainstance_id, reference_time, time_done) \
             VALUES (?1, ?2, ?3, ?4, datetime('now')) \
             ON CONFLICT(model, type) DO UPDATE SET \
                datainstance_id = excluded.datainstance_id, \
                reference_time = excluded.reference_time, \
                time_done = excluded.time_done",
            rusqlite::params![model, stage, datainstance_id, reference_time],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for StateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDb").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
