// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use sy_core::{DataFormat, ModelConfig, ServiceBackend};

fn model() -> ModelConfig {
    let mut fields = HashMap::new();
    fields.insert("product".to_string(), "nordic-ec".to_string());
    fields.insert("servicebackend".to_string(), "disk1".to_string());
    fields.insert("data_provider".to_string(), "nordic_ec".to_string());
    fields.insert("load_program".to_string(), "/usr/bin/wdb_load".to_string());
    fields.insert("model_run_age_warning".to_string(), "120".to_string());
    ModelConfig::from_fields("ec", &fields).unwrap()
}

fn datainstance(url: &str, version: Option<i64>) -> DataInstance {
    DataInstance {
        id: "di-1".to_string(),
        data_id: "data-1".to_string(),
        url: url.to_string(),
        servicebackend: ServiceBackend { id: "sb-1".into(), slug: "disk1".into(), uri: "disk1".into() },
        format: DataFormat { id: "f-1".into(), slug: "netcdf".into(), uri: "netcdf".into() },
        version,
    }
}

#[test]
fn clean_url_strips_file_scheme() {
    assert_eq!(WdbDriver::clean_url("file:///data/foo.nc"), "/data/foo.nc");
}

#[test]
fn clean_url_rewrites_opdata_scheme() {
    assert_eq!(WdbDriver::clean_url("opdata:///foo/bar.nc"), "/opdata/foo/bar.nc");
}

#[test]
fn clean_url_is_identity_otherwise() {
    assert_eq!(WdbDriver::clean_url("http://example.com/foo.nc"), "http://example.com/foo.nc");
}

#[test]
fn load_argv_includes_optional_fields_when_present() {
    let driver = WdbDriver::new("localhost", "wdb");
    let di = datainstance("file:///data/foo.nc", Some(1));
    let argv = driver.load_argv(&di, &model());
    assert_eq!(
        argv,
        vec![
            "/usr/bin/wdb_load",
            "--loadPlaceDefinition",
            "--dataprovider",
            "nordic_ec",
            "--user",
            "wdb",
            "--dataversion",
            "1",
            "/data/foo.nc",
        ]
    );
}

#[test]
fn load_argv_omits_dataversion_when_absent() {
    let driver = WdbDriver::new("localhost", "wdb");
    let di = datainstance("file:///data/foo.nc", None);
    let argv = driver.load_argv(&di, &model());
    assert!(!argv.contains(&"--dataversion".to_string()));
}

#[test]
fn quote_for_remote_shell_quotes_only_whitespace_elements() {
    let argv = vec!["psql".to_string(), "-c".to_string(), "select 1".to_string()];
    assert_eq!(WdbDriver::quote_for_remote_shell(&argv), "psql -c 'select 1'");
}

#[test]
fn quote_for_remote_shell_escapes_embedded_single_quotes() {
    let argv = vec!["it's a test".to_string()];
    assert_eq!(WdbDriver::quote_for_remote_shell(&argv), "'it\\'s a test'");
}

#[test]
fn is_local_recognizes_localhost_and_loopback() {
    assert!(WdbDriver::new("localhost", "wdb").is_local());
    assert!(WdbDriver::new("127.0.0.1", "wdb").is_local());
    assert!(!WdbDriver::new("db.example.com", "wdb").is_local());
}

#[test]
fn cache_sql_embeds_data_provider_and_reference_time() {
    let driver = WdbDriver::new("localhost", "wdb");
    let pi = sy_core::ProductInstance {
        id: "pi-1".into(),
        product_id: "p-1".into(),
        reference_time: chrono::DateTime::parse_from_rfc3339("2015-01-19T16:04:40Z")
            .unwrap()
            .with_timezone(&chrono::Utc),
        version: 1,
        complete: HashMap::new(),
    };
    let sql = driver.cache_sql(&model(), &pi);
    assert!(sql.contains("array['nordic_ec']"));
    assert!(sql.contains("exact 2015-01-19T16:04:40+00:00"));
    assert!(sql.contains("ANALYZE"));
}

#[tokio::test]
async fn load_model_file_succeeds_when_command_exits_zero() {
    let driver = WdbDriver::new("localhost", "true");
    let model = {
        let mut fields = HashMap::new();
        fields.insert("product".to_string(), "nordic-ec".to_string());
        fields.insert("servicebackend".to_string(), "disk1".to_string());
        fields.insert("data_provider".to_string(), "nordic_ec".to_string());
        fields.insert("load_program".to_string(), "/bin/true".to_string());
        fields.insert("model_run_age_warning".to_string(), "120".to_string());
        ModelConfig::from_fields("ec", &fields).unwrap()
    };
    let di = datainstance("/data/foo.nc", Some(1));
    driver.load_model_file(&di, &model).await.unwrap();
}

#[tokio::test]
async fn load_model_file_raises_on_unexpected_exit_code() {
    let driver = WdbDriver::new("localhost", "false");
    let model = {
        let mut fields = HashMap::new();
        fields.insert("product".to_string(), "nordic-ec".to_string());
        fields.insert("servicebackend".to_string(), "disk1".to_string());
        fields.insert("data_provider".to_string(), "nordic_ec".to_string());
        fields.insert("load_program".to_string(), "/bin/false".to_string());
        fields.insert("model_run_age_warning".to_string(), "120".to_string());
        ModelConfig::from_fields("ec", &fields).unwrap()
    };
    let di = datainstance("/data/foo.nc", Some(1));
    let err = driver.load_model_file(&di, &model).await.unwrap_err();
    assert!(matches!(err, WdbError::LoadFailed { exit_code: 1 }));
}
