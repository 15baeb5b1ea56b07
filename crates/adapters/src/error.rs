// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from `WDBDriver` (§4.4/§6). Retryable against the next configured
/// backend (`Load`) or only on the next loop iteration (`Cache`) — never both.
#[derive(Debug, Error)]
pub enum WdbError {
    #[error("failed to spawn WDB load command: {0}")]
    Spawn(std::io::Error),
    #[error("WDB load failed with exit code {exit_code}")]
    LoadFailed { exit_code: i32 },
    #[error("WDB cache update failed with exit code {exit_code}")]
    CacheFailed { exit_code: i32 },
}

/// Errors from `WDB2TSDriver` (§4.5/§7). Server-side and transport failures
/// are retried on the next loop iteration; client errors indicate a
/// configuration mismatch and are logged without retry.
#[derive(Debug, Error)]
pub enum Wdb2TsError {
    #[error("could not connect to WDB2TS: {0}")]
    ConnectionFailure(String),
    #[error("WDB2TS status response is missing its /status element: {0}")]
    MissingContent(String),
    #[error("WDB2TS service unavailable (HTTP {status}): {url}")]
    ServiceUnavailable { status: u16, url: String },
    #[error("WDB2TS client error (HTTP {status}): {url}")]
    ServiceClientError { status: u16, url: String },
    #[error("WDB2TS update failed because of a server error: {0}")]
    ServerUpdateFailure(String),
    #[error("WDB2TS update failed because the request was malformed: {0}")]
    ClientUpdateFailure(String),
}

impl Wdb2TsError {
    /// Server-side failures (including transport) are retried next
    /// iteration; client failures are not (§7).
    pub fn is_server(&self) -> bool {
        matches!(
            self,
            Wdb2TsError::ConnectionFailure(_)
                | Wdb2TsError::MissingContent(_)
                | Wdb2TsError::ServiceUnavailable { .. }
                | Wdb2TsError::ServerUpdateFailure(_)
        )
    }
}
