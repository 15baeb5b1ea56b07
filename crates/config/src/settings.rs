// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed views over the non-model sections of the configuration (§6).

/// The `[syncer]` section.
#[derive(Debug, Clone)]
pub struct SyncerSettings {
    pub models: Vec<String>,
    pub state_database_file: String,
}

/// The `[productstatus]` section.
#[derive(Debug, Clone)]
pub struct ProductstatusSettings {
    pub url: String,
    pub verify_ssl: bool,
    /// Minutes; `0` disables heartbeat-staleness reconnection.
    pub max_heartbeat_delay: i64,
}

/// The `[wdb]` section.
#[derive(Debug, Clone)]
pub struct WdbSettings {
    pub host: String,
    pub user: String,
}

/// The `[wdb2ts]` section.
#[derive(Debug, Clone)]
pub struct Wdb2TsSettings {
    pub base_url: String,
    pub services: Vec<String>,
}
