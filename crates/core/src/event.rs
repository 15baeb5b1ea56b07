// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external product-status event bus (§4.2).
//!
//! The bus transport (Kafka, in the original) is an external collaborator;
//! this crate defines the shape the listener depends on so it can be
//! driven against a fake bus in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// An event observed on the product-status bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Resource { resource: String, id: String, message_timestamp: DateTime<Utc> },
    Heartbeat { message_timestamp: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unrecoverable bus error: {0}")]
    Fatal(String),
}

impl BusError {
    /// Transient transport errors retry forever with back-off; unrecoverable
    /// errors terminate the process (§4.2 Failure model).
    pub fn is_retriable(&self) -> bool {
        matches!(self, BusError::Transport(_))
    }
}

/// A consumer handle on the product-status bus.
///
/// `poll` blocks up to `timeout` waiting for the next event, returning
/// `Ok(None)` on a timeout so the caller can check heartbeat staleness.
/// The caller commits the read position by calling `ack` only after the
/// event has been fully handled, so a crash mid-processing re-delivers it.
#[async_trait]
pub trait EventBus: Send {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<BusEvent>, BusError>;
    async fn ack(&mut self) -> Result<(), BusError>;
    /// Tear down and rebuild the underlying connection (§4.2.1/§4.2.3).
    async fn reconnect(&mut self) -> Result<(), BusError>;
}
