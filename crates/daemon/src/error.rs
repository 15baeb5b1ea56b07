// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sy_config::ConfigError;
use sy_core::CatalogError;
use sy_engine::EngineError;
use thiserror::Error;

/// Top-level failures the run loop can return, each mapped to one of the
/// process exit codes in §7.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not reach the product-status catalog at startup: {0}")]
    ConnectProductstatus(CatalogError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("could not install a signal handler: {0}")]
    Signal(#[from] std::io::Error),
}
