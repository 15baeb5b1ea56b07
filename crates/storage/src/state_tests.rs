// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::DateTime;
use std::collections::HashMap;

fn pi(id: &str, product_id: &str, reference_time: &str, version: i64) -> ProductInstance {
    ProductInstance {
        id: id.to_string(),
        product_id: product_id.to_string(),
        reference_time: DateTime::parse_from_rfc3339(reference_time).unwrap().with_timezone(&chrono::Utc),
        version,
        complete: HashMap::new(),
    }
}

#[test]
fn fresh_instance_is_not_loaded() {
    let db = StateDb::open_in_memory().unwrap();
    assert!(!db.is_loaded("pi-1").unwrap());
}

#[test]
fn set_loaded_marks_is_loaded_true() {
    let db = StateDb::open_in_memory().unwrap();
    db.set_loaded("pi-1").unwrap();
    assert!(db.is_loaded("pi-1").unwrap());
}

#[test]
fn set_loaded_twice_is_an_error() {
    let db = StateDb::open_in_memory().unwrap();
    db.set_loaded("pi-1").unwrap();
    let err = db.set_loaded("pi-1").unwrap_err();
    assert!(matches!(err, StateDbError::AlreadyLoaded(id) if id == "pi-1"));
}

#[test]
fn pending_productinstances_picks_latest_reference_time_and_version() {
    let db = StateDb::open_in_memory().unwrap();
    let older = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    let newer = pi("pi-2", "nordic-ec", "2015-01-19T18:04:40Z", 1);
    db.add_productinstance_to_be_processed(&older, false, false).unwrap();
    db.add_productinstance_to_be_processed(&newer, false, false).unwrap();

    let pending = db.pending_productinstances().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending["nordic-ec"].productinstance_id, "pi-2");
}

#[test]
fn pending_productinstances_picks_latest_version_when_reference_time_ties() {
    let db = StateDb::open_in_memory().unwrap();
    let v1 = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    let v2 = pi("pi-2", "nordic-ec", "2015-01-19T16:04:40Z", 2);
    db.add_productinstance_to_be_processed(&v1, false, false).unwrap();
    db.add_productinstance_to_be_processed(&v2, false, false).unwrap();

    let pending = db.pending_productinstances().unwrap();
    assert_eq!(pending["nordic-ec"].productinstance_id, "pi-2");
}

#[test]
fn pending_productinstances_force_is_or_over_all_rows() {
    let db = StateDb::open_in_memory().unwrap();
    let instance = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    db.add_productinstance_to_be_processed(&instance, false, false).unwrap();
    db.add_productinstance_to_be_processed(&instance, true, false).unwrap();

    let pending = db.pending_productinstances().unwrap();
    assert!(pending["nordic-ec"].force);
}

#[test]
fn done_clears_all_pending_rows_for_the_product() {
    let db = StateDb::open_in_memory().unwrap();
    let v1 = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    let v2 = pi("pi-2", "nordic-ec", "2015-01-19T18:04:40Z", 2);
    db.add_productinstance_to_be_processed(&v1, false, false).unwrap();
    db.done(&v2).unwrap();

    assert!(db.pending_productinstances().unwrap().is_empty());
}

#[test]
fn done_only_clears_rows_for_its_own_product() {
    let db = StateDb::open_in_memory().unwrap();
    let ec = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    let arome = pi("pi-2", "arome-arctic", "2015-01-19T16:04:40Z", 1);
    db.add_productinstance_to_be_processed(&ec, false, false).unwrap();
    db.add_productinstance_to_be_processed(&arome, false, false).unwrap();

    db.done(&ec).unwrap();

    let pending = db.pending_productinstances().unwrap();
    assert!(!pending.contains_key("nordic-ec"));
    assert!(pending.contains_key("arome-arctic"));
}

#[test]
fn add_then_done_restores_pending_productinstances() {
    let db = StateDb::open_in_memory().unwrap();
    let before = db.pending_productinstances().unwrap();

    let instance = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    db.add_productinstance_to_be_processed(&instance, false, false).unwrap();
    db.done(&instance).unwrap();

    let after = db.pending_productinstances().unwrap();
    assert_eq!(before, after);
}

#[test]
fn even_if_previously_loaded_clears_the_loaded_row() {
    let db = StateDb::open_in_memory().unwrap();
    db.set_loaded("pi-1").unwrap();
    assert!(db.is_loaded("pi-1").unwrap());

    let instance = pi("pi-1", "nordic-ec", "2015-01-19T16:04:40Z", 1);
    db.add_productinstance_to_be_processed(&instance, false, true).unwrap();

    assert!(!db.is_loaded("pi-1").unwrap());
}

#[test]
fn set_last_incoming_upserts_by_model_and_type() {
    let db = StateDb::open_in_memory().unwrap();
    db.set_last_incoming("ec", "data available", "di-1", "2015-01-19T16:04:40Z").unwrap();
    db.set_last_incoming("ec", "data available", "di-2", "2015-01-19T18:04:40Z").unwrap();

    let conn = db.pool.get().unwrap();
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM last_data", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 1);
    let datainstance_id: String = conn
        .query_row("SELECT datainstance_id FROM last_data", [], |row| row.get(0))
        .unwrap();
    assert_eq!(datainstance_id, "di-2");
}
