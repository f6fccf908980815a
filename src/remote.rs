//! Remote Store & Connectivity
//!
//! Trait abstractions over the backend, enabling test mocking, plus the
//! reqwest-backed implementations used by the binary. Writes are idempotent
//! by contract: retried creates and updates overwrite by id, and a delete
//! for an id the remote never saw is treated as success (a compacted
//! create-then-delete drains cleanly).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::errors::{RemoteError, Result};
use crate::model::{InventoryItem, SavedRecipe, ShoppingList};

/// Entity-keyed CRUD against the authoritative backend, one set of calls per
/// entity kind. All writes are assumed idempotent (same id overwrites).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_item(&self, item: &InventoryItem) -> Result<()>;
    async fn update_item(&self, item: &InventoryItem) -> Result<()>;
    async fn delete_item(&self, id: &str) -> Result<()>;
    async fn list_items(&self, user_id: &str) -> Result<Vec<InventoryItem>>;

    async fn create_list(&self, list: &ShoppingList) -> Result<()>;
    async fn update_list(&self, list: &ShoppingList) -> Result<()>;
    async fn delete_list(&self, id: &str) -> Result<()>;
    async fn list_lists(&self, user_id: &str) -> Result<Vec<ShoppingList>>;

    async fn create_recipe(&self, recipe: &SavedRecipe) -> Result<()>;
    async fn update_recipe(&self, recipe: &SavedRecipe) -> Result<()>;
    async fn delete_recipe(&self, id: &str) -> Result<()>;
    async fn list_recipes(&self, user_id: &str) -> Result<Vec<SavedRecipe>>;
}

/// Connectivity oracle: a single polled query, no subscription.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

const REQUEST_TIMEOUT_SECS: u64 = 15;
const PROBE_TIMEOUT_SECS: u64 = 3;

/// HTTP client for the backend. Creates and updates both map to idempotent
/// PUTs keyed by entity id.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn put_json<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.url(path)))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        // Deleting an id the remote never saw is fine: compaction can queue
        // a delete for an entity whose create was never pushed.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "delete target not found on remote, treating as success");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()).into())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> crate::errors::LarderError {
    if e.is_timeout() {
        RemoteError::Timeout.into()
    } else {
        RemoteError::Network(e.to_string()).into()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::HttpStatus {
        status: status.as_u16(),
        message,
    }
    .into())
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn create_item(&self, item: &InventoryItem) -> Result<()> {
        self.put_json(&format!("/v1/inventory/{}", item.id), item)
            .await
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<()> {
        self.put_json(&format!("/v1/inventory/{}", item.id), item)
            .await
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.delete(&format!("/v1/inventory/{}", id)).await
    }

    async fn list_items(&self, user_id: &str) -> Result<Vec<InventoryItem>> {
        self.get_json(&format!("/v1/users/{}/inventory", user_id))
            .await
    }

    async fn create_list(&self, list: &ShoppingList) -> Result<()> {
        self.put_json(&format!("/v1/shopping-lists/{}", list.id), list)
            .await
    }

    async fn update_list(&self, list: &ShoppingList) -> Result<()> {
        self.put_json(&format!("/v1/shopping-lists/{}", list.id), list)
            .await
    }

    async fn delete_list(&self, id: &str) -> Result<()> {
        self.delete(&format!("/v1/shopping-lists/{}", id)).await
    }

    async fn list_lists(&self, user_id: &str) -> Result<Vec<ShoppingList>> {
        self.get_json(&format!("/v1/users/{}/shopping-lists", user_id))
            .await
    }

    async fn create_recipe(&self, recipe: &SavedRecipe) -> Result<()> {
        self.put_json(&format!("/v1/saved-recipes/{}", recipe.id), recipe)
            .await
    }

    async fn update_recipe(&self, recipe: &SavedRecipe) -> Result<()> {
        self.put_json(&format!("/v1/saved-recipes/{}", recipe.id), recipe)
            .await
    }

    async fn delete_recipe(&self, id: &str) -> Result<()> {
        self.delete(&format!("/v1/saved-recipes/{}", id)).await
    }

    async fn list_recipes(&self, user_id: &str) -> Result<Vec<SavedRecipe>> {
        self.get_json(&format!("/v1/users/{}/saved-recipes", user_id))
            .await
    }
}

/// Probes the backend health endpoint with a short timeout. Any failure is
/// read as offline, never as an error.
pub struct HttpConnectivity {
    client: Client,
    health_url: String,
}

impl HttpConnectivity {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            health_url: format!("{}/health", base_url.into().trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Connectivity for HttpConnectivity {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "connectivity probe failed, assuming offline");
                false
            }
        }
    }
}
