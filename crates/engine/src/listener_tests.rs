// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sy_core::test_support::{FakeCatalog, FakeEventBus};
use sy_core::{DataFormat, DataInstance, FakeClock, Product, ProductInstance, ServiceBackend};
use sy_storage::StateDb;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2015-01-19T16:04:45Z").unwrap().with_timezone(&Utc)
}

#[test]
fn min_event_age_wait_is_none_for_an_old_event() {
    let message_timestamp = now() - chrono::Duration::seconds(10);
    assert_eq!(min_event_age_wait(now(), message_timestamp), None);
}

#[test]
fn min_event_age_wait_is_some_for_a_fresh_event() {
    let message_timestamp = now();
    let wait = min_event_age_wait(now(), message_timestamp).unwrap();
    assert_eq!(wait, Duration::from_secs_f64(2.5));
}

#[test]
fn min_event_age_wait_is_the_remaining_difference() {
    let message_timestamp = now() - chrono::Duration::milliseconds(1000);
    let wait = min_event_age_wait(now(), message_timestamp).unwrap();
    assert_eq!(wait, Duration::from_secs_f64(1.5));
}

fn setup() -> Listener<FakeEventBus, FakeCatalog, FakeClock> {
    let catalog = Arc::new(FakeCatalog::new());
    let state_db = StateDb::open_in_memory().unwrap();
    let reporter = Arc::new(Reporter::new(state_db.clone()));
    let registry = Arc::new(ModelRegistry::new());
    let bus = FakeEventBus::new(vec![]);
    let clock = FakeClock::new(now());
    let new_data = Arc::new(Notify::new());
    let stopping = Arc::new(AtomicBool::new(true));

    Listener::new(bus, catalog, state_db, registry, reporter, clock, new_data, stopping, None)
}

#[tokio::test]
async fn run_returns_immediately_when_already_stopping() {
    let mut listener = setup();
    listener.run().await.unwrap();
}

#[tokio::test]
async fn process_datainstance_enqueues_pending_work_for_matching_models() {
    let catalog = Arc::new(FakeCatalog::new());
    let state_db = StateDb::open_in_memory().unwrap();
    let reporter = Arc::new(Reporter::new(state_db.clone()));

    let mut fields = std::collections::HashMap::new();
    fields.insert("product".to_string(), "nordic-ec".to_string());
    fields.insert("servicebackend".to_string(), "disk1".to_string());
    fields.insert("data_provider".to_string(), "nordic_ec".to_string());
    fields.insert("load_program".to_string(), "/usr/bin/wdb_load".to_string());
    fields.insert("model_run_age_warning".to_string(), "120".to_string());
    let mut registry = ModelRegistry::new();
    registry.insert(sy_core::ModelConfig::from_fields("ec", &fields).unwrap());
    let registry = Arc::new(registry);

    let product = Product { id: "p-1".into(), slug: "nordic-ec".into() };
    catalog.add_product(product.clone());
    let pi = ProductInstance {
        id: "pi-1".into(),
        product_id: "p-1".into(),
        reference_time: now(),
        version: 1,
        complete: std::collections::HashMap::new(),
    };
    catalog.add_productinstance(pi.clone());
    let di = DataInstance {
        id: "di-1".into(),
        data_id: "data-1".into(),
        url: "file:///data/foo.nc".into(),
        servicebackend: ServiceBackend { id: "sb-1".into(), slug: "disk1".into(), uri: "disk1".into() },
        format: DataFormat { id: "f-1".into(), slug: "netcdf".into(), uri: "netcdf".into() },
        version: Some(1),
    };
    catalog.add_datainstance(di);
    catalog.bind_datainstance_to_productinstance("di-1", "pi-1");

    let bus = FakeEventBus::new(vec![]);
    let clock = FakeClock::new(now());
    let new_data = Arc::new(Notify::new());
    let stopping = Arc::new(AtomicBool::new(false));
    let listener = Listener::new(
        bus,
        catalog,
        state_db.clone(),
        registry,
        reporter,
        clock,
        new_data,
        stopping,
        None,
    );

    listener.process_datainstance("di-1").await.unwrap();

    let pending = state_db.pending_productinstances().unwrap();
    assert_eq!(pending["p-1"].productinstance_id, "pi-1");
}

#[tokio::test]
async fn process_datainstance_ignores_unmatched_backend() {
    let catalog = Arc::new(FakeCatalog::new());
    let state_db = StateDb::open_in_memory().unwrap();
    let reporter = Arc::new(Reporter::new(state_db.clone()));
    let registry = Arc::new(ModelRegistry::new());

    let product = Product { id: "p-1".into(), slug: "nordic-ec".into() };
    catalog.add_product(product);
    let pi = ProductInstance {
        id: "pi-1".into(),
        product_id: "p-1".into(),
        reference_time: now(),
        version: 1,
        complete: std::collections::HashMap::new(),
    };
    catalog.add_productinstance(pi);
    let di = DataInstance {
        id: "di-1".into(),
        data_id: "data-1".into(),
        url: "file:///data/foo.nc".into(),
        servicebackend: ServiceBackend { id: "sb-1".into(), slug: "disk1".into(), uri: "disk1".into() },
        format: DataFormat { id: "f-1".into(), slug: "netcdf".into(), uri: "netcdf".into() },
        version: Some(1),
    };
    catalog.add_datainstance(di);
    catalog.bind_datainstance_to_productinstance("di-1", "pi-1");

    let bus = FakeEventBus::new(vec![]);
    let clock = FakeClock::new(now());
    let new_data = Arc::new(Notify::new());
    let stopping = Arc::new(AtomicBool::new(false));
    let listener = Listener::new(
        bus,
        catalog,
        state_db.clone(),
        registry,
        reporter,
        clock,
        new_data,
        stopping,
        None,
    );

    listener.process_datainstance("di-1").await.unwrap();
    assert!(state_db.pending_productinstances().unwrap().is_empty());
}
