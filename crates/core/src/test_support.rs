// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for the external catalog and event bus, used by downstream crates'
//! tests (mirrors `syncer/tests/fake_productstatus.py`).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::catalog::{CatalogClient, CatalogError};
use crate::event::{BusError, BusEvent, EventBus};
use crate::model::{DataInstance, Product, ProductInstance};

/// An in-memory catalog, populated directly by tests.
#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<HashMap<String, Product>>,
    productinstances: Mutex<HashMap<String, ProductInstance>>,
    datainstances: Mutex<HashMap<String, DataInstance>>,
    /// productinstance_id -> datainstance ids, used to resolve "belonging to" queries
    data_by_productinstance: Mutex<HashMap<String, Vec<String>>>,
    /// datainstance_id -> owning productinstance_id, the reverse of the above
    productinstance_by_datainstance: Mutex<HashMap<String, String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, p: Product) {
        self.products.lock().insert(p.id.clone(), p);
    }

    pub fn add_productinstance(&self, pi: ProductInstance) {
        self.productinstances.lock().insert(pi.id.clone(), pi);
    }

    pub fn add_datainstance(&self, di: DataInstance) {
        self.datainstances.lock().insert(di.id.clone(), di);
    }

    /// Bind a data instance to a product instance id for the "belonging to" lookup.
    pub fn bind_datainstance_to_productinstance(&self, di_id: &str, pi_id: &str) {
        self.data_by_productinstance.lock().entry(pi_id.to_string()).or_default().push(di_id.to_string());
        self.productinstance_by_datainstance.lock().insert(di_id.to_string(), pi_id.to_string());
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn product(&self, id: &str) -> Result<Product, CatalogError> {
        self.products.lock().get(id).cloned().ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn productinstance(&self, id: &str) -> Result<ProductInstance, CatalogError> {
        self.productinstances.lock().get(id).cloned().ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn datainstance(&self, id: &str) -> Result<DataInstance, CatalogError> {
        self.datainstances.lock().get(id).cloned().ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn datainstances_for_productinstance(
        &self,
        productinstance_id: &str,
    ) -> Result<Vec<DataInstance>, CatalogError> {
        let ids = self.data_by_productinstance.lock().get(productinstance_id).cloned().unwrap_or_default();
        let store = self.datainstances.lock();
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn latest_productinstances(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductInstance>, CatalogError> {
        let mut matches: Vec<ProductInstance> = self
            .productinstances
            .lock()
            .values()
            .filter(|pi| pi.product_id == product_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.reference_time.cmp(&a.reference_time).then(b.version.cmp(&a.version)));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn productinstance_for_datainstance(
        &self,
        datainstance_id: &str,
    ) -> Result<ProductInstance, CatalogError> {
        let pi_id = self
            .productinstance_by_datainstance
            .lock()
            .get(datainstance_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(datainstance_id.to_string()))?;
        self.productinstance(&pi_id).await
    }
}

/// A scripted event bus: a queue of events to hand out, then `None` forever.
pub struct FakeEventBus {
    events: VecDeque<BusEvent>,
    reconnect_count: usize,
}

impl FakeEventBus {
    pub fn new(events: Vec<BusEvent>) -> Self {
        Self { events: events.into(), reconnect_count: 0 }
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnect_count
    }
}

#[async_trait]
impl EventBus for FakeEventBus {
    async fn poll(&mut self, _timeout: Duration) -> Result<Option<BusEvent>, BusError> {
        Ok(self.events.pop_front())
    }

    async fn ack(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), BusError> {
        self.reconnect_count += 1;
        Ok(())
    }
}
