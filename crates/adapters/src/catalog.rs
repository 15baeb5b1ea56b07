// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HttpCatalogClient`: REST client for the product-status catalog (§6).
//!
//! The catalog's wire format is not part of the specification (only the
//! shapes in `sy_core::model` are), so this targets a conventional
//! resource-per-path REST API: `GET <base>/api/v1/<resource>/<id>/` for a
//! single object and `GET <base>/api/v1/<resource>/?<filter>` for a list
//! wrapped as `{"objects": [...]}`, mirroring the real product-status
//! service this crate stands in for.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sy_core::{CatalogClient, CatalogError, Data, DataInstance, Product, ProductInstance};
use tracing::debug;

#[derive(Deserialize)]
struct ListResponse<T> {
    objects: Vec<T>,
}

/// HTTP session to a base URL exposing the catalog's REST surface.
pub struct HttpCatalogClient {
    base_url: String,
    client: Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, verify_ssl: bool) -> Result<Self, CatalogError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        debug!(%url, "fetching from product-status catalog");
        let response =
            self.client.get(url).send().await.map_err(|e| CatalogError::Transport(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.to_string()));
        }
        if status.is_server_error() {
            return Err(CatalogError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        if status.is_client_error() {
            return Err(CatalogError::Client {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        response.json::<T>().await.map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn product(&self, id: &str) -> Result<Product, CatalogError> {
        self.get_json(&format!("{}/api/v1/product/{id}/", self.base_url)).await
    }

    async fn productinstance(&self, id: &str) -> Result<ProductInstance, CatalogError> {
        self.get_json(&format!("{}/api/v1/productinstance/{id}/", self.base_url)).await
    }

    async fn datainstance(&self, id: &str) -> Result<DataInstance, CatalogError> {
        self.get_json(&format!("{}/api/v1/datainstance/{id}/", self.base_url)).await
    }

    async fn datainstances_for_productinstance(
        &self,
        productinstance_id: &str,
    ) -> Result<Vec<DataInstance>, CatalogError> {
        let url = format!(
            "{}/api/v1/datainstance/?data__productinstance={productinstance_id}",
            self.base_url
        );
        Ok(self.get_json::<ListResponse<DataInstance>>(&url).await?.objects)
    }

    async fn latest_productinstances(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductInstance>, CatalogError> {
        let url = format!(
            "{}/api/v1/productinstance/?product={product_id}&order_by=-reference_time&limit={limit}",
            self.base_url
        );
        Ok(self.get_json::<ListResponse<ProductInstance>>(&url).await?.objects)
    }

    async fn productinstance_for_datainstance(
        &self,
        datainstance_id: &str,
    ) -> Result<ProductInstance, CatalogError> {
        let di = self.datainstance(datainstance_id).await?;
        let data: Data =
            self.get_json(&format!("{}/api/v1/data/{}/", self.base_url, di.data_id)).await?;
        self.productinstance(&data.productinstance_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_on_base_url_is_trimmed() {
        let client = HttpCatalogClient::new("http://productstatus.example.com/", true).unwrap();
        assert_eq!(client.base_url, "http://productstatus.example.com");
    }

    #[test]
    fn list_response_deserializes_the_objects_array() {
        let json = r#"{"objects": [{"id": "p-1", "slug": "nordic-ec"}]}"#;
        let parsed: ListResponse<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.objects, vec![Product { id: "p-1".into(), slug: "nordic-ec".into() }]);
    }
}
