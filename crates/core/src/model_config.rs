// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ModelConfig` and `ModelRegistry` (§4.6).
//!
//! The "dynamic attribute splatting" of the original's `configparser`
//! section is re-architected here as an explicit struct plus a
//! `from_fields` factory that enforces the mandatory key set, per Design
//! Note §9. Mutating access to the backend list is serialized behind a
//! mutex since the loader may rotate it while the listener reads it from
//! another thread (§4.6, §9).

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::model::{Product, ServiceBackend};

const MANDATORY_KEYS: &[&str] =
    &["product", "servicebackend", "data_provider", "load_program", "model_run_age_warning"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelConfigError {
    #[error("model section '{section}' is missing required option '{key}'")]
    MissingKey { section: String, key: String },
    #[error("model section '{section}' has an invalid value for '{key}': {value}")]
    InvalidValue { section: String, key: String, value: String },
}

/// Configuration and runtime state for a single configured model.
///
/// `servicebackend` is an ordered, mutex-protected circular list: the head
/// is the preferred backend, and [`ModelConfig::rotate_servicebackend`]
/// moves a failed head to the tail.
#[derive(Debug)]
pub struct ModelConfig {
    pub model: String,
    pub product: String,
    servicebackend: Mutex<Vec<String>>,
    pub data_provider: String,
    pub load_program: String,
    pub load_config: Option<String>,
    pub model_run_age_warning: i64,
    pub model_run_age_critical: Option<i64>,
}

impl ModelConfig {
    /// Build a `ModelConfig` from a parsed INI section's key/value map,
    /// rejecting a section missing any mandatory key (§4.6).
    pub fn from_fields(
        model_name: &str,
        fields: &HashMap<String, String>,
    ) -> Result<Self, ModelConfigError> {
        let section = format!("model_{model_name}");
        for key in MANDATORY_KEYS {
            if !fields.contains_key(*key) {
                return Err(ModelConfigError::MissingKey {
                    section: section.clone(),
                    key: (*key).to_string(),
                });
            }
        }

        let parse_int = |key: &str, value: &str| -> Result<i64, ModelConfigError> {
            value.trim().parse::<i64>().map_err(|_| ModelConfigError::InvalidValue {
                section: section.clone(),
                key: key.to_string(),
                value: value.to_string(),
            })
        };

        let servicebackend: Vec<String> =
            fields["servicebackend"].split(',').map(|s| s.trim().to_string()).collect();

        Ok(ModelConfig {
            model: model_name.to_string(),
            product: fields["product"].clone(),
            servicebackend: Mutex::new(servicebackend),
            data_provider: fields["data_provider"].clone(),
            load_program: fields["load_program"].clone(),
            load_config: fields.get("load_config").cloned(),
            model_run_age_warning: parse_int("model_run_age_warning", &fields["model_run_age_warning"])?,
            model_run_age_critical: fields
                .get("model_run_age_critical")
                .map(|v| parse_int("model_run_age_critical", v))
                .transpose()?,
        })
    }

    /// Snapshot the current backend order (head = preferred).
    pub fn servicebackends(&self) -> Vec<String> {
        self.servicebackend.lock().clone()
    }

    /// The currently preferred backend (head of the list).
    pub fn preferred_servicebackend(&self) -> Option<String> {
        self.servicebackend.lock().first().cloned()
    }

    /// Move the current head of the backend list to the tail.
    pub fn rotate_servicebackend(&self) {
        let mut backends = self.servicebackend.lock();
        if backends.len() > 1 {
            let head = backends.remove(0);
            backends.push(head);
        }
    }

    pub fn matches_product(&self, product: &Product) -> bool {
        self.product == product.slug || self.product == product.id
    }

    pub fn matches_servicebackend(&self, backend: &ServiceBackend) -> bool {
        self.servicebackend.lock().iter().any(|configured| backend.matches(configured))
    }
}

/// In-memory set of configured models, keyed by model name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelConfig>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: ModelConfig) {
        self.models.insert(model.model.clone(), model);
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// All models whose product matches and whose configured backends
    /// contain the given service backend (§4.2.2b).
    pub fn models_matching(
        &self,
        product: &Product,
        backend: &ServiceBackend,
    ) -> Vec<&ModelConfig> {
        self.models
            .values()
            .filter(|m| m.matches_product(product) && m.matches_servicebackend(backend))
            .collect()
    }
}
