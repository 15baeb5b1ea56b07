// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seams letting `sy-engine` drive either the real drivers or their fakes.

use async_trait::async_trait;
use sy_core::{DataInstance, ModelConfig, ProductInstance};

use crate::error::{Wdb2TsError, WdbError};

#[async_trait]
pub trait WdbBackend: Send + Sync {
    async fn load_model_file(&self, di: &DataInstance, model: &ModelConfig) -> Result<(), WdbError>;
    async fn cache_model_run(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), WdbError>;
}

#[async_trait]
pub trait Wdb2TsBackend: Send + Sync {
    async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError>;
}

#[async_trait]
impl WdbBackend for crate::wdb::WdbDriver {
    async fn load_model_file(&self, di: &DataInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::wdb::WdbDriver::load_model_file(self, di, model).await
    }

    async fn cache_model_run(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::wdb::WdbDriver::cache_model_run(self, pi, model).await
    }
}

#[async_trait]
impl Wdb2TsBackend for crate::wdb2ts::Wdb2TsDriver {
    async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError> {
        crate::wdb2ts::Wdb2TsDriver::update(self, pi, model).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl WdbBackend for crate::test_support::FakeWdbDriver {
    async fn load_model_file(&self, di: &DataInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::test_support::FakeWdbDriver::load_model_file(self, di, model).await
    }

    async fn cache_model_run(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::test_support::FakeWdbDriver::cache_model_run(self, pi, model).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Wdb2TsBackend for crate::test_support::FakeWdb2TsDriver {
    async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError> {
        crate::test_support::FakeWdb2TsDriver::update(self, pi, model).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl WdbBackend for std::sync::Arc<crate::test_support::FakeWdbDriver> {
    async fn load_model_file(&self, di: &DataInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::test_support::FakeWdbDriver::load_model_file(self, di, model).await
    }

    async fn cache_model_run(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), WdbError> {
        crate::test_support::FakeWdbDriver::cache_model_run(self, pi, model).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Wdb2TsBackend for std::sync::Arc<crate::test_support::FakeWdb2TsDriver> {
    async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError> {
        crate::test_support::FakeWdb2TsDriver::update(self, pi, model).await
    }
}
