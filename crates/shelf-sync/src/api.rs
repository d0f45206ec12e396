//! # CRUD API Client
//!
//! The REST contract the sync layer depends on:
//!
//! | Operation | Method | Path                 | Success            |
//! |-----------|--------|----------------------|--------------------|
//! | List      | GET    | `/api/products`      | JSON array         |
//! | Create    | POST   | `/api/products`      | created Product    |
//! | Update    | PUT    | `/api/products/{id}` | updated Product    |
//! | Delete    | DELETE | `/api/products/{id}` | empty (204)        |
//!
//! Failure bodies: HTTP 400 carries a JSON map of field -> message
//! (validation), other failures carry `{ "error": "..." }`.
//!
//! [`ProductApi`] is the seam: the controller only sees the trait, so
//! tests substitute a scripted implementation and the HTTP client stays
//! a thin translation layer.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use shelf_core::{Product, ProductDraft, ProductId};

use crate::config::SyncConfig;
use crate::error::{ApiError, ApiResult, SyncError, SyncResult};

// =============================================================================
// API Trait
// =============================================================================

/// The CRUD operations the sync controller performs.
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// Fetches the full catalog.
    async fn list(&self) -> ApiResult<Vec<Product>>;

    /// Creates a product; the server assigns the id.
    async fn create(&self, draft: &ProductDraft) -> ApiResult<Product>;

    /// Replaces the product with the given id.
    async fn update(&self, id: ProductId, draft: &ProductDraft) -> ApiResult<Product>;

    /// Deletes the product with the given id.
    async fn delete(&self, id: ProductId) -> ApiResult<()>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// `ProductApi` over HTTP via reqwest.
#[derive(Debug, Clone)]
pub struct HttpProductApi {
    client: reqwest::Client,
    products_url: Url,
}

impl HttpProductApi {
    /// Builds a client against the configured API base.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SyncError::HttpClient(e.to_string()))?;

        Ok(HttpProductApi {
            client,
            products_url: config.products_url()?,
        })
    }

    fn item_url(&self, id: ProductId) -> Url {
        let mut url = self.products_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&id.to_string());
        }
        url
    }

    /// Maps a non-success response to a typed [`ApiError`].
    async fn check(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "API request failed");
        Err(map_failure(status.as_u16(), &body))
    }
}

#[async_trait]
impl ProductApi for HttpProductApi {
    async fn list(&self) -> ApiResult<Vec<Product>> {
        let response = self.client.get(self.products_url.clone()).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, draft: &ProductDraft) -> ApiResult<Product> {
        let response = self
            .client
            .post(self.products_url.clone())
            .json(draft)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, id: ProductId, draft: &ProductDraft) -> ApiResult<Product> {
        let response = self.client.put(self.item_url(id)).json(draft).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: ProductId) -> ApiResult<()> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

// =============================================================================
// Failure Mapping
// =============================================================================

/// Translates a failure status + body into a typed error.
fn map_failure(status: u16, body: &str) -> ApiError {
    match status {
        400 => {
            let errors: HashMap<String, String> = serde_json::from_str(body).unwrap_or_default();
            ApiError::Validation(errors)
        }
        404 => ApiError::NotFound(error_message(body).unwrap_or_else(|| "Not found".to_string())),
        code => ApiError::Server {
            status: code,
            message: error_message(body).unwrap_or_else(|| body.to_string()),
        },
    }
}

/// Pulls the `error` field out of a `{ "error": "..." }` body.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(String::from)
}
