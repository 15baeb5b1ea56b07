// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Listener`: the bus-consumption loop (§4.2, §5, §9).
//!
//! Synchronization with `DataLoader` is a single binary "new-data" signal
//! (a [`tokio::sync::Notify`]) plus the persistent `pending_jobs` queue in
//! `StateDB` — the condition only wakes the consumer, it never carries a
//! work payload itself (Design Note §9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sy_core::{BusEvent, CatalogClient, Clock, EventBus, ModelRegistry};
use sy_storage::StateDb;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::reporter::{Reporter, DATA_AVAILABLE};

/// Minimum age a resource event must have before its `DataInstance` is
/// fetched, tolerating the catalog becoming consistent after publish (§4.2.1a).
pub const MIN_EVENT_AGE: Duration = Duration::from_millis(2500);

const POLL_TIMEOUT: Duration = Duration::from_secs(10);
const INITIAL_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

/// The kind name the listener reacts to; other resource kinds are ignored (§4.2.2).
const DATAINSTANCE_RESOURCE: &str = "datainstance";

/// The duration to sleep before fetching a just-announced resource, or
/// `None` if the event is already old enough (§4.2.1a).
pub fn min_event_age_wait(now: DateTime<Utc>, message_timestamp: DateTime<Utc>) -> Option<Duration> {
    let age = now.signed_duration_since(message_timestamp);
    let min_age = chrono::Duration::from_std(MIN_EVENT_AGE).unwrap_or(chrono::Duration::zero());
    if age < min_age {
        (min_age - age).to_std().ok()
    } else {
        None
    }
}

/// Long-running consumer of the product-status event bus.
pub struct Listener<B, C, K> {
    bus: B,
    catalog: Arc<C>,
    state_db: StateDb,
    registry: Arc<ModelRegistry>,
    reporter: Arc<Reporter>,
    clock: K,
    new_data: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    max_heartbeat_delay: Option<Duration>,
}

impl<B, C, K> Listener<B, C, K>
where
    B: EventBus,
    C: CatalogClient,
    K: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: B,
        catalog: Arc<C>,
        state_db: StateDb,
        registry: Arc<ModelRegistry>,
        reporter: Arc<Reporter>,
        clock: K,
        new_data: Arc<Notify>,
        stopping: Arc<AtomicBool>,
        max_heartbeat_delay: Option<Duration>,
    ) -> Self {
        Self { bus, catalog, state_db, registry, reporter, clock, new_data, stopping, max_heartbeat_delay }
    }

    /// Run the consumption loop until `stopping` is set (§4.2, §5).
    pub async fn run(&mut self) -> Result<(), EngineError> {
        let consumer_group = Uuid::new_v4();
        info!(%consumer_group, "listener starting with a fresh consumer group");
        self.bus.reconnect().await?;

        let mut last_heartbeat = self.clock.now();
        let mut backoff = INITIAL_RECONNECT_BACKOFF;

        loop {
            if self.stopping.load(Ordering::SeqCst) {
                info!("listener stopping");
                self.new_data.notify_waiters();
                return Ok(());
            }

            match self.bus.poll(POLL_TIMEOUT).await {
                Ok(Some(event)) => {
                    backoff = INITIAL_RECONNECT_BACKOFF;
                    self.handle_event(event, &mut last_heartbeat).await?;
                    self.bus.ack().await?;
                }
                Ok(None) => {
                    self.check_heartbeat_staleness(last_heartbeat).await?;
                }
                Err(e) if e.is_retriable() => {
                    warn!(error = %e, backoff_secs = backoff.as_secs(), "bus error, reconnecting");
                    tokio::time::sleep(backoff).await;
                    self.bus.reconnect().await?;
                    backoff = (backoff * 2).min(MAX_RECONNECT_BACKOFF);
                }
                Err(e) => {
                    error!(error = %e, "unrecoverable bus error");
                    return Err(EngineError::Bus(e));
                }
            }
        }
    }

    async fn check_heartbeat_staleness(&mut self, last_heartbeat: DateTime<Utc>) -> Result<(), EngineError> {
        let Some(max_delay) = self.max_heartbeat_delay else { return Ok(()) };
        let stale_since = self.clock.now().signed_duration_since(last_heartbeat);
        if stale_since > chrono::Duration::from_std(max_delay).unwrap_or(chrono::Duration::zero()) {
            warn!(minutes = max_delay.as_secs() / 60, "no heartbeat received, rebuilding bus connection");
            self.bus.reconnect().await?;
        }
        Ok(())
    }

    async fn handle_event(
        &mut self,
        event: BusEvent,
        last_heartbeat: &mut DateTime<Utc>,
    ) -> Result<(), EngineError> {
        match event {
            BusEvent::Heartbeat { message_timestamp } => {
                *last_heartbeat = message_timestamp;
                Ok(())
            }
            BusEvent::Resource { resource, id, message_timestamp } => {
                if resource != DATAINSTANCE_RESOURCE {
                    return Ok(());
                }
                if let Some(wait) = min_event_age_wait(self.clock.now(), message_timestamp) {
                    tokio::time::sleep(wait).await;
                }
                self.process_datainstance(&id).await
            }
        }
    }

    /// Fetch a newly-announced data instance, enqueue pending work for every
    /// configured model it matches, and wake the loader (§4.2.2b-c).
    async fn process_datainstance(&self, datainstance_id: &str) -> Result<(), EngineError> {
        let di = self.catalog.datainstance(datainstance_id).await?;
        let pi = self.catalog.productinstance_for_datainstance(datainstance_id).await?;
        let product = self.catalog.product(&pi.product_id).await?;

        let matching = self.registry.models_matching(&product, &di.servicebackend);
        if matching.is_empty() {
            return Ok(());
        }

        for model in matching {
            self.reporter.report_data_event(&model.model, DATA_AVAILABLE, datainstance_id, pi.reference_time)?;
            self.state_db.add_productinstance_to_be_processed(&pi, false, false)?;
        }
        self.new_data.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
