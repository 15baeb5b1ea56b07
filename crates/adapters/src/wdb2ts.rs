// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WDB2TSDriver`: HTTP client to the time-series service (§4.5).

use std::collections::HashMap;

use parking_lot::Mutex;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use sy_core::{ModelConfig, ProductInstance};
use tracing::{debug, info, warn};

use crate::error::Wdb2TsError;

/// Owns an HTTP session to a base URL and a fixed list of service names,
/// caching each service's known data providers in memory.
pub struct Wdb2TsDriver {
    base_url: String,
    services: Vec<String>,
    client: Client,
    status: Mutex<HashMap<String, Vec<String>>>,
}

impl Wdb2TsDriver {
    pub fn new(base_url: impl Into<String>, services: Vec<String>) -> Self {
        Self { base_url: base_url.into(), services, client: Client::new(), status: Mutex::new(HashMap::new()) }
    }

    async fn get(&self, url: &str) -> Result<String, Wdb2TsError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Wdb2TsError::ConnectionFailure(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 500 {
            return Err(Wdb2TsError::ServiceUnavailable { status: status.as_u16(), url: url.to_string() });
        }
        if status.as_u16() >= 400 {
            return Err(Wdb2TsError::ServiceClientError { status: status.as_u16(), url: url.to_string() });
        }
        response.text().await.map_err(|e| Wdb2TsError::ConnectionFailure(e.to_string()))
    }

    /// Extract `/status/defined_dataproviders/dataprovider/name` text,
    /// erroring if the `/status` root element is absent (§4.5).
    fn data_providers_from_status(xml: &str) -> Result<Vec<String>, Wdb2TsError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut saw_status_root = false;
        let mut in_name = false;
        let mut providers = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(tag)) => {
                    let local = tag.name();
                    let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                    if name == "status" {
                        saw_status_root = true;
                    } else if name == "name" {
                        in_name = true;
                    }
                }
                Ok(Event::End(tag)) if tag.name().as_ref() == b"name" => {
                    in_name = false;
                }
                Ok(Event::Text(text)) if in_name => {
                    providers.push(text.unescape().unwrap_or_default().into_owned());
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Wdb2TsError::MissingContent(format!(
                        "could not parse status XML: {e}"
                    )))
                }
            }
            buf.clear();
        }

        if !saw_status_root {
            return Err(Wdb2TsError::MissingContent(
                "response is missing its /status element".to_string(),
            ));
        }
        Ok(providers)
    }

    /// Refresh the in-memory data-provider cache for every configured service (§4.5).
    pub async fn load_status(&self) -> Result<(), Wdb2TsError> {
        let mut next_status = HashMap::with_capacity(self.services.len());
        for service in &self.services {
            let url = format!("{}/{}?status", self.base_url, service);
            info!(%service, %url, "loading WDB2TS status");
            let xml = self.get(&url).await?;
            let providers = Self::data_providers_from_status(&xml)?;
            if providers.is_empty() {
                warn!(%service, "WDB2TS data providers set to empty list");
            }
            debug!(%service, ?providers, "data providers loaded");
            next_status.insert(service.clone(), providers);
        }
        *self.status.lock() = next_status;
        Ok(())
    }

    fn update_url(&self, service: &str, model: &ModelConfig, pi: &ProductInstance) -> String {
        format!(
            "{}/{}update?{}={},{}",
            self.base_url,
            service,
            model.data_provider,
            pi.reference_time.format("%Y-%m-%dT%H:%M:%SZ"),
            pi.version,
        )
    }

    async fn request_update(&self, url: &str) -> Result<(), Wdb2TsError> {
        let body = self.get(url).await.map_err(|e| {
            if e.is_server() {
                Wdb2TsError::ServerUpdateFailure(e.to_string())
            } else {
                Wdb2TsError::ClientUpdateFailure(e.to_string())
            }
        })?;

        if body.contains("NoNewDataRefTime") {
            info!(%url, "WDB2TS already up to date");
        } else if body.contains("Updated") {
            info!(%url, "WDB2TS updated successfully");
        } else {
            info!(%url, %body, "unrecognized response from WDB2TS");
        }
        Ok(())
    }

    /// Refresh status, then update every service whose cached data providers
    /// include `model.data_provider` (§4.5).
    pub async fn update(&self, pi: &ProductInstance, model: &ModelConfig) -> Result<(), Wdb2TsError> {
        self.load_status().await?;

        let matching_services: Vec<String> = self
            .status
            .lock()
            .iter()
            .filter(|(_, providers)| providers.contains(&model.data_provider))
            .map(|(service, _)| service.clone())
            .collect();

        for service in matching_services {
            let url = self.update_url(&service, model, pi);
            info!(%url, "requesting WDB2TS update");
            self.request_update(&url).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "wdb2ts_tests.rs"]
mod tests;
