// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sy_adapters::{Wdb2TsError, WdbError};
use sy_core::{BusError, CatalogError};
use sy_storage::StateDbError;
use thiserror::Error;

/// Errors surfaced by the `Listener` and `DataLoader` run loops (§7).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state database error: {0}")]
    StateDb(#[from] StateDbError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("event bus error: {0}")]
    Bus(#[from] BusError),
    #[error(transparent)]
    Wdb(#[from] WdbError),
    #[error(transparent)]
    Wdb2Ts(#[from] Wdb2TsError),
}
