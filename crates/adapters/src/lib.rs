// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Drivers for the two downstream consumers: WDB and WDB2TS (§4.4/§4.5).

mod bus;
mod catalog;
mod error;
mod traits;
mod wdb;
mod wdb2ts;

pub use bus::PollingEventBus;
pub use catalog::HttpCatalogClient;
pub use error::{Wdb2TsError, WdbError};
pub use traits::{Wdb2TsBackend, WdbBackend};
pub use wdb::WdbDriver;
pub use wdb2ts::Wdb2TsDriver;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
