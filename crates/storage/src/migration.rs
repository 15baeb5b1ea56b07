// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migrations applied inside a single transaction on every start (§3 Lifecycle).

use rusqlite::{Connection, Transaction};

/// One numbered schema step. `version` is the value left in the `version`
/// table's log after this migration is applied.
pub struct Migration {
    pub version: i64,
    pub apply: fn(&Transaction) -> rusqlite::Result<()>,
}

pub const MIGRATIONS: &[Migration] = &[Migration { version: 1, apply: apply_v1 }];

fn apply_v1(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "
        CREATE TABLE loaded_data (
            productinstance_id TEXT PRIMARY KEY,
            load_time          TEXT NOT NULL
        );
        CREATE TABLE pending_jobs (
            product_id         TEXT NOT NULL,
            reference_time     TEXT NOT NULL,
            version             INTEGER NOT NULL,
            productinstance_id  TEXT NOT NULL,
            force               INTEGER NOT NULL
        );
        CREATE INDEX pending_jobs_product_id ON pending_jobs(product_id);
        CREATE TABLE last_data (
            model           TEXT NOT NULL,
            type            TEXT NOT NULL,
            datainstance_id TEXT NOT NULL,
            reference_time  TEXT NOT NULL,
            time_done       TEXT NOT NULL,
            PRIMARY KEY (model, type)
        );
        ",
    )
}

/// Apply any migrations not yet recorded in `version`, inside a single transaction.
pub fn run(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS version (version INTEGER NOT NULL, applied_at TEXT NOT NULL);",
    )?;
    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM version", [], |row| row.get(0))?;

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version > current {
            (migration.apply)(&tx)?;
            tx.execute(
                "INSERT INTO version (version, applied_at) VALUES (?1, datetime('now'))",
                [migration.version],
            )?;
        }
    }
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();
        let version: i64 =
            conn.query_row("SELECT MAX(version) FROM version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, 1);
    }
}
