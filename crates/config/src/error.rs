// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sy_core::ModelConfigError;
use thiserror::Error;

/// Configuration errors abort startup with exit code 1 (§7).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("configuration is missing section '{section}' option '{key}'")]
    MissingKey { section: String, key: String },
    #[error("configuration section '{section}' has an invalid value for '{key}'")]
    InvalidValue { section: String, key: String },
    #[error(transparent)]
    Model(#[from] ModelConfigError),
}
