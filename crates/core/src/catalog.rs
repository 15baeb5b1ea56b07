// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interface to the product-status catalog.
//!
//! The catalog itself (its REST/Kafka transport) is an external
//! collaborator per §1/§6 of the specification — this crate only defines
//! the shape the daemon depends on, so that `sy-engine` can be tested
//! against a fake without a running service.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DataInstance, Product, ProductInstance};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("transport error contacting catalog: {0}")]
    Transport(String),
    #[error("catalog returned a client error ({status}): {message}")]
    Client { status: u16, message: String },
    #[error("catalog returned a server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("could not decode catalog response: {0}")]
    Decode(String),
    #[error("resource not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    /// Server-side and transport errors are retried; client errors are not (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Transport(_) | CatalogError::Server { .. })
    }
}

/// Read access to the product-status catalog needed by the listener and loader.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn product(&self, id: &str) -> Result<Product, CatalogError>;
    async fn productinstance(&self, id: &str) -> Result<ProductInstance, CatalogError>;
    async fn datainstance(&self, id: &str) -> Result<DataInstance, CatalogError>;

    /// All data instances belonging to the data records of `productinstance_id` (§4.3.1).
    async fn datainstances_for_productinstance(
        &self,
        productinstance_id: &str,
    ) -> Result<Vec<DataInstance>, CatalogError>;

    /// The most recent `limit` product instances of `product_id`, ordered by
    /// reference time descending (used by `populate_database_with_latest_events_from_server`, §4.3).
    async fn latest_productinstances(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductInstance>, CatalogError>;

    /// Walk `datainstance.data.productinstance` to find the owning product
    /// instance of a data instance (§4.2.2b).
    async fn productinstance_for_datainstance(
        &self,
        datainstance_id: &str,
    ) -> Result<ProductInstance, CatalogError>;
}
