// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The entity shapes consumed from the product-status catalog (§3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kind of model output, e.g. a numerical weather forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
}

/// One concrete run of a [`Product`], keyed by `(product, reference_time, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInstance {
    pub id: String,
    pub product_id: String,
    pub reference_time: DateTime<Utc>,
    pub version: i64,
    /// `complete[servicebackend_uri][dataformat_uri]`
    #[serde(default)]
    pub complete: HashMap<String, HashMap<String, bool>>,
}

impl ProductInstance {
    /// Coerce the completeness map to a boolean, treating missing keys as false (§4.3).
    pub fn is_complete(&self, servicebackend_uri: &str, dataformat_uri: &str) -> bool {
        self.complete
            .get(servicebackend_uri)
            .and_then(|by_format| by_format.get(dataformat_uri))
            .copied()
            .unwrap_or(false)
    }
}

/// A logical data record belonging to a [`ProductInstance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub id: String,
    pub productinstance_id: String,
}

/// A concrete file at a URL, bound to a service backend and data format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInstance {
    pub id: String,
    pub data_id: String,
    pub url: String,
    pub servicebackend: ServiceBackend,
    pub format: DataFormat,
    /// Fed to `WDBDriver::load_model_file`'s `--dataversion`, when present (§4.4).
    pub version: Option<i64>,
}

/// A storage location that may hold copies of the same logical data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBackend {
    pub id: String,
    pub slug: String,
    pub uri: String,
}

impl ServiceBackend {
    /// Whether this backend matches a model's configured backend, which may
    /// name either the slug or the id (§4.3 / original `servicebackend in
    /// (i.servicebackend.slug, i.servicebackend.id)`).
    pub fn matches(&self, configured: &str) -> bool {
        self.slug == configured || self.id == configured
    }
}

/// Identifies the encoding/layout of a [`DataInstance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFormat {
    pub id: String,
    pub slug: String,
    pub uri: String,
}

pub const NETCDF_FORMAT_SLUG: &str = "netcdf";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pi_with_completeness(uri: &str, format_uri: &str, value: bool) -> ProductInstance {
        let mut by_format = HashMap::new();
        by_format.insert(format_uri.to_string(), value);
        let mut complete = HashMap::new();
        complete.insert(uri.to_string(), by_format);
        ProductInstance {
            id: "pi1".into(),
            product_id: "p1".into(),
            reference_time: Utc::now(),
            version: 1,
            complete,
        }
    }

    #[test]
    fn is_complete_true_for_matching_entry() {
        let pi = pi_with_completeness("disk1", "netcdf", true);
        assert!(pi.is_complete("disk1", "netcdf"));
    }

    #[test]
    fn is_complete_false_for_missing_backend() {
        let pi = pi_with_completeness("disk1", "netcdf", true);
        assert!(!pi.is_complete("disk2", "netcdf"));
    }

    #[test]
    fn is_complete_false_for_missing_format() {
        let pi = pi_with_completeness("disk1", "netcdf", true);
        assert!(!pi.is_complete("disk1", "grib"));
    }

    #[test]
    fn servicebackend_matches_slug_or_id() {
        let sb = ServiceBackend { id: "sb-id".into(), slug: "disk1".into(), uri: "u".into() };
        assert!(sb.matches("disk1"));
        assert!(sb.matches("sb-id"));
        assert!(!sb.matches("disk2"));
    }
}
