// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for the WDB/WDB2TS drivers, used by `sy-engine`'s `DataLoader` tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use sy_core::{DataInstance, ModelConfig, ProductInstance};

use crate::error::{Wdb2TsError, WdbError};

/// A scripted WDB driver: each configured service backend slug maps to a
/// canned outcome for `load_model_file`, so tests can simulate a failing
/// preferred backend and a working alternative (§8 scenario 2).
#[derive(Default)]
pub struct FakeWdbDriver {
    load_failures: Mutex<Vec<String>>,
    cache_should_fail: Mutex<bool>,
    load_calls: Mutex<Vec<(String, Option<i64>)>>,
    cache_calls: AtomicUsize,
}

impl FakeWdbDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `load_model_file` fails for data instances served from `backend_slug`.
    pub fn fail_backend(&self, backend_slug: &str) {
        self.load_failures.lock().push(backend_slug.to_string());
    }

    pub fn fail_cache(&self) {
        *self.cache_should_fail.lock() = true;
    }

    pub fn load_calls(&self) -> Vec<(String, Option<i64>)> {
        self.load_calls.lock().clone()
    }

    pub fn cache_calls(&self) -> usize {
        self.cache_calls.load(Ordering::SeqCst)
    }

    pub async fn load_model_file(&self, di: &DataInstance, _model: &ModelConfig) -> Result<(), WdbError> {
        self.load_calls.lock().push((di.url.clone(), di.version));
        if self.load_failures.lock().contains(&di.servicebackend.slug) {
            return Err(WdbError::LoadFailed { exit_code: 1 });
        }
        Ok(())
    }

    pub async fn cache_model_run(&self, _pi: &ProductInstance, _model: &ModelConfig) -> Result<(), WdbError> {
        self.cache_calls.fetch_add(1, Ordering::SeqCst);
        if *self.cache_should_fail.lock() {
            return Err(WdbError::CacheFailed { exit_code: 1 });
        }
        Ok(())
    }
}

/// A scripted WDB2TS driver: `update` either succeeds or returns a canned error.
#[derive(Default)]
pub struct FakeWdb2TsDriver {
    update_error: Mutex<Option<FakeWdb2TsOutcome>>,
    update_calls: Mutex<Vec<String>>,
}

#[derive(Clone)]
enum FakeWdb2TsOutcome {
    ClientError,
    ServerError,
}

impl FakeWdb2TsDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with_client_error(&self) {
        *self.update_error.lock() = Some(FakeWdb2TsOutcome::ClientError);
    }

    pub fn fail_with_server_error(&self) {
        *self.update_error.lock() = Some(FakeWdb2TsOutcome::ServerError);
    }

    pub fn update_calls(&self) -> Vec<String> {
        self.update_calls.lock().clone()
    }

    pub async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError> {
        self.update_calls.lock().push(format!("{}/{}", model.data_provider, pi.id));
        match self.update_error.lock().clone() {
            Some(FakeWdb2TsOutcome::ClientError) => {
                Err(Wdb2TsError::ClientUpdateFailure("simulated client error".to_string()))
            }
            Some(FakeWdb2TsOutcome::ServerError) => {
                Err(Wdb2TsError::ServerUpdateFailure("simulated server error".to_string()))
            }
            None => Ok(()),
        }
    }
}
