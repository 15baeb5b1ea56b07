// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Reporter`: the only path by which the daemon externally signals progress (§4.7).
//!
//! Grounded on the original's `reporting.py` (`StoringStatsClient`,
//! `TimeReporter`): counters/gauges/timings plus a `last_data` upsert into
//! the state database. The original's statsd wire protocol is not part of
//! this workspace's stack, so counters/gauges/timings are emitted as
//! structured `tracing` events instead of over UDP — the same ambient
//! observability concern, carried the way the rest of this workspace
//! carries logging.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sy_storage::{StateDb, StateDbError};
use tracing::info;

/// Event types recorded by the load pipeline form a closed set (§4.7).
pub const DATA_AVAILABLE: &str = "data available";
pub const DATA_WDB_OK: &str = "data wdb ok";
pub const DATA_WDB2TS_OK: &str = "data wdb2ts ok";
pub const DATA_OK: &str = "data ok";
pub const LOAD_FAILED: &str = "load failed";

/// Facade over a counter/gauge/timing sink and the state database's
/// last-seen-per-(model,stage) table.
pub struct Reporter {
    state_db: StateDb,
    counters: Mutex<HashMap<&'static str, u64>>,
}

impl Reporter {
    pub fn new(state_db: StateDb) -> Self {
        Self { state_db, counters: Mutex::new(HashMap::new()) }
    }

    /// Increment a named counter from the closed event-type set.
    pub fn incr(&self, event: &'static str) {
        *self.counters.lock().entry(event).or_insert(0) += 1;
        info!(event, "reporter event");
    }

    /// Current counter values, for diagnostics and tests.
    pub fn counts(&self) -> HashMap<&'static str, u64> {
        self.counters.lock().clone()
    }

    /// Record an incoming data event: persists the last-seen row and emits a
    /// gauge of the reference time (§4.7, original's `report_data_event`).
    pub fn report_data_event(
        &self,
        model: &str,
        stage: &str,
        datainstance_id: &str,
        reference_time: DateTime<Utc>,
    ) -> Result<(), StateDbError> {
        self.state_db.set_last_incoming(model, stage, datainstance_id, &reference_time.to_rfc3339())?;
        info!(model, stage, datainstance_id, %reference_time, "data event");
        Ok(())
    }

    /// Start a new interval timer rooted at this reporter.
    pub fn time_reporter(&self) -> TimeReporter<'_> {
        TimeReporter::new(self)
    }
}

/// Reports elapsed time since the last checkpoint, and since the timer
/// started, as named timings (§4.7, original's `TimeReporter`).
///
/// Borrows its owning [`Reporter`] so a `TimeReporter` can never outlive the
/// sink it reports into.
pub struct TimeReporter<'a> {
    _reporter: &'a Reporter,
    first: Instant,
    last: Instant,
}

impl<'a> TimeReporter<'a> {
    fn new(reporter: &'a Reporter) -> Self {
        let now = Instant::now();
        Self { _reporter: reporter, first: now, last: now }
    }

    /// Report elapsed time since the previous `report`/`report_total` call.
    pub fn report(&mut self, name: &str) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last).as_millis();
        info!(timing = name, elapsed_ms, "timing");
        self.last = now;
    }

    /// Report elapsed time since this `TimeReporter` was created.
    pub fn report_total(&mut self, name: &str) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.first).as_millis();
        info!(timing = name, elapsed_ms, "timing total");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_accumulates_per_event() {
        let reporter = Reporter::new(StateDb::open_in_memory().unwrap());
        reporter.incr(DATA_AVAILABLE);
        reporter.incr(DATA_AVAILABLE);
        reporter.incr(DATA_WDB_OK);
        let counts = reporter.counts();
        assert_eq!(counts[DATA_AVAILABLE], 2);
        assert_eq!(counts[DATA_WDB_OK], 1);
    }

    #[test]
    fn report_data_event_persists_last_incoming() {
        let reporter = Reporter::new(StateDb::open_in_memory().unwrap());
        reporter.report_data_event("ec", DATA_AVAILABLE, "di-1", Utc::now()).unwrap();
    }

    #[test]
    fn time_reporter_does_not_panic_across_checkpoints() {
        let reporter = Reporter::new(StateDb::open_in_memory().unwrap());
        let mut timer = reporter.time_reporter();
        timer.report("wdb load");
        timer.report("wdb cache");
        timer.report_total("productinstance time to complete");
    }
}
