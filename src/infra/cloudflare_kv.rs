//! Workers KV namespace accessed through the Cloudflare REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::{CacheKey, KvStore, StoreError};
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct CloudflareKvStore {
    client: Client,
    values_url: Url,
    api_token: String,
}

impl CloudflareKvStore {
    pub fn new(
        api_base: &Url,
        account_id: &str,
        namespace_id: &str,
        api_token: impl Into<String>,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("kvedge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Self::with_client(client, api_base, account_id, namespace_id, api_token)
    }

    pub fn with_client(
        client: Client,
        api_base: &Url,
        account_id: &str,
        namespace_id: &str,
        api_token: impl Into<String>,
    ) -> Result<Self, InfraError> {
        let mut values_url = api_base.clone();
        values_url.set_query(None);
        {
            let mut segments = values_url.path_segments_mut().map_err(|_| {
                InfraError::configuration(format!("kv api base `{api_base}` cannot carry a path"))
            })?;
            segments.pop_if_empty().extend([
                "accounts",
                account_id,
                "storage",
                "kv",
                "namespaces",
                namespace_id,
                "values",
            ]);
        }

        Ok(Self {
            client,
            values_url,
            api_token: api_token.into(),
        })
    }

    /// Endpoint for a single key. The key is one path segment, so `/` inside
    /// it is percent-encoded.
    pub fn value_url(&self, key: &CacheKey) -> Url {
        let mut url = self.values_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(key.as_str());
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(StoreError::transport)
    }
}

#[derive(Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

async fn backend_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiEnvelope>(&body)
        .ok()
        .map(|envelope| {
            envelope
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or(body);
    StoreError::Backend { status, message }
}

#[async_trait]
impl KvStore for CloudflareKvStore {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError> {
        let response = self.send(self.client.get(self.value_url(key))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.text().await.map(Some).map_err(StoreError::transport)
            }
            _ => Err(backend_error(response).await),
        }
    }

    #[instrument(skip(self, key, value), fields(key = %key))]
    async fn put(&self, key: &CacheKey, value: String) -> Result<(), StoreError> {
        let request = self
            .client
            .put(self.value_url(key))
            .header(CONTENT_TYPE, "text/plain")
            .body(value);
        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(backend_error(response).await)
        }
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        let response = self.send(self.client.delete(self.value_url(key))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(backend_error(response).await),
        }
    }
}
