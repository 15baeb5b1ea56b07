// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! INI-style configuration parsing (§6).
//!
//! The original's "dynamic attribute splatting" of a `configparser` section
//! onto an object is re-architected as explicit typed settings structs plus
//! `ModelConfig::from_fields`, which enforces the mandatory key set
//! (Design Note §9).

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{ProductstatusSettings, SyncerSettings, Wdb2TsSettings, WdbSettings};

use std::collections::HashMap;
use std::path::Path;

use configparser::ini::Ini;
use sy_core::{ModelConfig, ModelRegistry};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/syncer.ini";

/// A parsed configuration file, giving typed access to each recognized
/// section (§6) plus the derived [`ModelRegistry`].
pub struct Config {
    ini: Ini,
}

impl Config {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|reason| ConfigError::Read { path: path.display().to_string(), reason })?;
        Ok(Self { ini })
    }

    fn section_fields(&self, section: &str) -> HashMap<String, String> {
        self.ini
            .get_map_ref()
            .get(section)
            .map(|props| {
                props.iter().filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone()))).collect()
            })
            .unwrap_or_default()
    }

    fn get(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.ini
            .get(section, key)
            .ok_or_else(|| ConfigError::MissingKey { section: section.to_string(), key: key.to_string() })
    }

    fn get_or(&self, section: &str, key: &str, default: &str) -> String {
        self.ini.get(section, key).unwrap_or_else(|| default.to_string())
    }

    /// The `[syncer]` section: which models to load and where to keep state.
    pub fn syncer(&self) -> Result<SyncerSettings, ConfigError> {
        let models = self
            .get("syncer", "models")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(SyncerSettings { models, state_database_file: self.get("syncer", "state_database_file")? })
    }

    /// The `[productstatus]` section: the catalog's base URL and connection policy.
    pub fn productstatus(&self) -> Result<ProductstatusSettings, ConfigError> {
        let verify_ssl = self.get_or("productstatus", "verify_ssl", "1") != "0";
        let max_heartbeat_delay = self
            .get_or("productstatus", "max_heartbeat_delay", "0")
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValue {
                section: "productstatus".to_string(),
                key: "max_heartbeat_delay".to_string(),
            })?;
        Ok(ProductstatusSettings {
            url: self.get("productstatus", "url")?,
            verify_ssl,
            max_heartbeat_delay,
        })
    }

    /// The `[wdb]` section: the database host `WDBDriver` runs commands against.
    pub fn wdb(&self) -> Result<WdbSettings, ConfigError> {
        Ok(WdbSettings { host: self.get("wdb", "host")?, user: self.get("wdb", "user")? })
    }

    /// The `[wdb2ts]` section: the time-series service's base URL and service names.
    pub fn wdb2ts(&self) -> Result<Wdb2TsSettings, ConfigError> {
        let services = self
            .get("wdb2ts", "services")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Wdb2TsSettings { base_url: self.get("wdb2ts", "base_url")?, services })
    }

    /// Build the [`ModelRegistry`] from `[syncer] models` and the matching
    /// `[model_<key>]` sections (§4.6).
    pub fn model_registry(&self) -> Result<ModelRegistry, ConfigError> {
        let mut registry = ModelRegistry::new();
        for model_name in self.syncer()?.models {
            let section = format!("model_{model_name}");
            let fields = self.section_fields(&section);
            let model = ModelConfig::from_fields(&model_name, &fields)?;
            registry.insert(model);
        }
        Ok(registry)
    }
}
