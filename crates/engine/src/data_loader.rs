// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DataLoader`: drains `pending_jobs` and drives a product instance through
//! WDB and WDB2TS (§4.3).
//!
//! For each pending product instance, every configured model whose product
//! matches is processed — not just the first one that loads successfully —
//! since several models may share a product (§9 Open Questions). Within a
//! single model, backend-alternatives are walked in preferred order; a
//! `WDBLoadFailed` rotates to the next configured backend and retries the
//! next alternative, while a cache or WDB2TS failure is logged and backed
//! off without rotating, matching the closed retry taxonomy in §7.

use std::sync::Arc;
use std::time::Duration;

use sy_adapters::{Wdb2TsBackend, Wdb2TsError, WdbBackend, WdbError};
use sy_core::{CatalogClient, DataInstance, ModelConfig, ProductInstance, NETCDF_FORMAT_SLUG};
use sy_storage::{StateDb, StateDbError};
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::reporter::{Reporter, DATA_OK, DATA_WDB2TS_OK, DATA_WDB_OK, LOAD_FAILED};

/// Backoff applied after a load, cache, or WDB2TS failure before the next
/// alternative or model is attempted (§7).
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// How many of a product's most recent instances to seed on startup (§4.1/§8).
const STARTUP_BACKFILL_LIMIT: usize = 2;

enum LoadSequenceError {
    Wdb(WdbError),
    Wdb2Ts(Wdb2TsError),
    StateDb(StateDbError),
}

impl From<StateDbError> for LoadSequenceError {
    fn from(e: StateDbError) -> Self {
        LoadSequenceError::StateDb(e)
    }
}

/// Drains pending work enqueued by the `Listener` and drives it through the
/// WDB/WDB2TS pipeline.
pub struct DataLoader<W, T, C> {
    state_db: StateDb,
    catalog: Arc<C>,
    registry: Arc<sy_core::ModelRegistry>,
    reporter: Arc<Reporter>,
    wdb: W,
    wdb2ts: T,
    error_backoff: Duration,
}

impl<W, T, C> DataLoader<W, T, C>
where
    W: WdbBackend,
    T: Wdb2TsBackend,
    C: CatalogClient,
{
    pub fn new(
        state_db: StateDb,
        catalog: Arc<C>,
        registry: Arc<sy_core::ModelRegistry>,
        reporter: Arc<Reporter>,
        wdb: W,
        wdb2ts: T,
    ) -> Self {
        Self { state_db, catalog, registry, reporter, wdb, wdb2ts, error_backoff: ERROR_BACKOFF }
    }

    /// Override the backoff applied after a load/cache/wdb2ts failure (tests
    /// use this to avoid paying the production backoff in wall-clock time).
    #[cfg(any(test, feature = "test-support"))]
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Seed `pending_jobs` from each configured model's product on startup,
    /// so that work announced before this process started is not lost. Only
    /// the two most recent instances per model are considered, and only
    /// those complete for the model's preferred backend and format `netcdf`
    /// are enqueued; an instance without a usable data instance for that
    /// backend yet is skipped silently (§4.1/§8).
    pub async fn populate_database_with_latest_events_from_server(&self) -> Result<(), EngineError> {
        for model in self.registry.iter() {
            let Some(preferred) = model.preferred_servicebackend() else {
                continue;
            };
            let product = match self.catalog.product(&model.product).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(model = %model.model, error = %e, "could not resolve model's product on startup");
                    continue;
                }
            };
            let instances =
                self.catalog.latest_productinstances(&product.id, STARTUP_BACKFILL_LIMIT).await?;
            for pi in instances {
                let datainstances = self.catalog.datainstances_for_productinstance(&pi.id).await?;
                let backend_uri = datainstances
                    .iter()
                    .find(|di| di.servicebackend.matches(&preferred))
                    .map(|di| di.servicebackend.uri.clone());
                let Some(backend_uri) = backend_uri else {
                    debug!(model = %model.model, productinstance_id = %pi.id, "no usable data instance for preferred backend yet");
                    continue;
                };
                if !pi.is_complete(&backend_uri, NETCDF_FORMAT_SLUG) {
                    debug!(model = %model.model, productinstance_id = %pi.id, "not complete for preferred backend yet");
                    continue;
                }
                self.state_db.add_productinstance_to_be_processed(&pi, false, false)?;
            }
        }
        Ok(())
    }

    /// Drain every pending product instance once (§4.3 step 1).
    pub async fn process(&self) -> Result<(), EngineError> {
        let pending = self.state_db.pending_productinstances()?;
        for pending_pi in pending.into_values() {
            let pi = self.catalog.productinstance(&pending_pi.productinstance_id).await?;
            if self.state_db.is_loaded(&pi.id)? && !pending_pi.force {
                self.state_db.done(&pi)?;
                continue;
            }
            self.process_productinstance(&pi, pending_pi.force).await?;
        }
        Ok(())
    }

    /// Walk every configured model whose product matches this instance's
    /// data, trying each one's backend-alternatives in order (§4.3 steps 2-3).
    async fn process_productinstance(
        &self,
        pi: &ProductInstance,
        force: bool,
    ) -> Result<(), EngineError> {
        let instances = self.catalog.datainstances_for_productinstance(&pi.id).await?;

        let mapping: Vec<(&ModelConfig, Vec<Vec<&DataInstance>>)> = self
            .registry
            .iter()
            .filter_map(|model| {
                let alternatives = backend_alternatives(model, &instances);
                if alternatives.is_empty() {
                    None
                } else {
                    Some((model, alternatives))
                }
            })
            .collect();

        if mapping.is_empty() {
            if force {
                error!(productinstance_id = %pi.id, "forced load requested but no configured model matches any available data instance");
            } else {
                info!(productinstance_id = %pi.id, "no matching data available yet, leaving pending");
            }
            return Ok(());
        }

        let mut already_persisted = false;
        for (model, alternatives) in mapping {
            'alternatives: for alternative in alternatives {
                let backend_uri = &alternative[0].servicebackend.uri;
                let format_uri = &alternative[0].format.uri;
                let complete = pi.is_complete(backend_uri, format_uri);
                if !(force || complete) {
                    debug!(model = %model.model, productinstance_id = %pi.id, "product instance not marked complete for this backend, skipping");
                    continue;
                }

                match self.load_sequence(pi, model, &alternative).await {
                    Ok(()) => {
                        info!(model = %model.model, productinstance_id = %pi.id, "load complete");
                        if !already_persisted {
                            self.state_db.set_loaded(&pi.id)?;
                            self.state_db.done(pi)?;
                            already_persisted = true;
                        }
                        break 'alternatives;
                    }
                    Err(LoadSequenceError::Wdb(WdbError::LoadFailed { exit_code })) => {
                        warn!(model = %model.model, exit_code, "wdb load failed, rotating to next backend");
                        self.reporter.incr(LOAD_FAILED);
                        tokio::time::sleep(self.error_backoff).await;
                        model.rotate_servicebackend();
                    }
                    Err(LoadSequenceError::Wdb(e)) => {
                        error!(model = %model.model, error = %e, "wdb cache update failed, not retried against another backend");
                        self.reporter.incr(LOAD_FAILED);
                        tokio::time::sleep(self.error_backoff).await;
                    }
                    Err(LoadSequenceError::Wdb2Ts(e)) => {
                        error!(model = %model.model, error = %e, "wdb2ts update failed, not retried against another backend");
                        self.reporter.incr(LOAD_FAILED);
                        tokio::time::sleep(self.error_backoff).await;
                    }
                    Err(LoadSequenceError::StateDb(e)) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    /// Load every data instance in `alternative` into WDB, refresh its cache,
    /// then notify WDB2TS (§4.4/§4.5).
    async fn load_sequence(
        &self,
        pi: &ProductInstance,
        model: &ModelConfig,
        alternative: &[&DataInstance],
    ) -> Result<(), LoadSequenceError> {
        let mut timer = self.reporter.time_reporter();
        for di in alternative {
            self.wdb.load_model_file(di, model).await.map_err(LoadSequenceError::Wdb)?;
        }
        self.reporter.report_data_event(&model.model, DATA_WDB_OK, &alternative[0].id, pi.reference_time)?;
        timer.report("wdb load");

        self.wdb.cache_model_run(pi, model).await.map_err(LoadSequenceError::Wdb)?;
        timer.report("wdb cache");

        self.wdb2ts.update(pi, model).await.map_err(LoadSequenceError::Wdb2Ts)?;
        self.reporter.report_data_event(&model.model, DATA_WDB2TS_OK, &alternative[0].id, pi.reference_time)?;
        timer.report("wdb2ts update");

        self.reporter.incr(DATA_OK);
        self.reporter.report_data_event(&model.model, DATA_OK, &alternative[0].id, pi.reference_time)?;
        timer.report_total("productinstance time to complete");
        Ok(())
    }
}

/// Group `instances` by which of `model`'s configured backends they satisfy,
/// in the model's preferred order; backends with no matching instance are
/// omitted (§4.3 step 2, original `_get_datainstances`).
fn backend_alternatives<'a>(
    model: &ModelConfig,
    instances: &'a [DataInstance],
) -> Vec<Vec<&'a DataInstance>> {
    model
        .servicebackends()
        .iter()
        .filter_map(|backend| {
            let matching: Vec<&DataInstance> =
                instances.iter().filter(|di| di.servicebackend.matches(backend)).collect();
            if matching.is_empty() {
                None
            } else {
                Some(matching)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "data_loader_tests.rs"]
mod tests;
