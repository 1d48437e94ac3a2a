//! PostgREST-style origin over HTTP.
//!
//! Talks to `{url}{rest_path}/{table}` with the service credential sent both
//! as `apikey` and as a bearer token, the way hosted PostgREST gateways
//! expect it.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use crate::application::repos::{ArticlesRepo, CreateArticleParams, RepoError};
use crate::domain::{Article, ArticleId};
use crate::infra::error::InfraError;
use crate::infra::telemetry::record_origin_latency;

const BACKEND: &str = "rest";

// Postgres SQLSTATE for a value that cannot be parsed as the column type.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Clone)]
pub struct RestOrigin {
    client: Client,
    table_url: Url,
    api_key: String,
}

impl RestOrigin {
    pub fn new(
        base: &Url,
        rest_path: &str,
        table: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Self::with_client(client, base, rest_path, table, api_key)
    }

    pub fn with_client(
        client: Client,
        base: &Url,
        rest_path: &str,
        table: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, InfraError> {
        let mut table_url = base.clone();
        table_url.set_query(None);
        {
            let mut segments = table_url.path_segments_mut().map_err(|_| {
                InfraError::configuration(format!("origin url `{base}` cannot carry a path"))
            })?;
            segments
                .pop_if_empty()
                .extend(rest_path.split('/').filter(|segment| !segment.is_empty()))
                .push(table);
        }

        Ok(Self {
            client,
            table_url,
            api_key: api_key.into(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("kvedge/", env!("CARGO_PKG_VERSION"))
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn url_with(&self, query: &[(&str, &str)]) -> Url {
        let mut url = self.table_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<T>, RepoError> {
        self.send_rows(request).await?.map_err(RepoError::from)
    }

    /// Transport and decode failures are the outer error; a non-success
    /// gateway answer is the inner one so callers can inspect it.
    async fn send_rows<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Result<Vec<T>, GatewayError>, RepoError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(RepoError::unavailable)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(RepoError::unavailable)?;

        if !status.is_success() {
            return Ok(Err(GatewayError::parse(status, &bytes)));
        }
        serde_json::from_slice(&bytes)
            .map(Ok)
            .map_err(RepoError::decode)
    }
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Non-success answer from the gateway, with the Postgres error code when
/// the body carries one.
#[derive(Debug)]
struct GatewayError {
    status: StatusCode,
    code: Option<String>,
    message: String,
}

impl GatewayError {
    fn parse(status: StatusCode, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<GatewayErrorBody>(body).ok();
        let code = parsed.as_ref().and_then(|parsed| parsed.code.clone());
        let message = parsed
            .and_then(|parsed| parsed.message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
        Self {
            status,
            code,
            message,
        }
    }

    /// The filter value cannot be cast to the id column's type, so no row
    /// can match it.
    fn is_uncastable_filter(&self) -> bool {
        self.status.is_client_error()
            && self.code.as_deref() == Some(INVALID_TEXT_REPRESENTATION)
    }
}

impl From<GatewayError> for RepoError {
    fn from(err: GatewayError) -> Self {
        if err.status.is_client_error() {
            RepoError::Rejected {
                status: err.status.as_u16(),
                message: err.message,
            }
        } else {
            RepoError::Unavailable(format!("status {}: {}", err.status, err.message))
        }
    }
}

#[async_trait]
impl ArticlesRepo for RestOrigin {
    #[instrument(skip(self))]
    async fn list_articles(&self) -> Result<Vec<Article>, RepoError> {
        let started = Instant::now();
        let url = self.url_with(&[("select", "*"), ("order", "id.asc")]);
        let result = self.fetch_rows(self.client.get(url)).await;
        record_origin_latency(BACKEND, "list", started);
        result
    }

    #[instrument(skip(self, id), fields(id = %id))]
    async fn find_article(&self, id: &ArticleId) -> Result<Option<Article>, RepoError> {
        let started = Instant::now();
        let filter = format!("eq.{id}");
        let url = self.url_with(&[("select", "*"), ("id", filter.as_str())]);
        let result = self.send_rows::<Article>(self.client.get(url)).await;
        record_origin_latency(BACKEND, "find", started);

        match result? {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(rejection) if rejection.is_uncastable_filter() => {
                debug!(message = %rejection.message, "id does not fit the id column");
                Ok(None)
            }
            Err(rejection) => Err(rejection.into()),
        }
    }

    #[instrument(skip(self, params))]
    async fn create_article(&self, params: CreateArticleParams) -> Result<Article, RepoError> {
        let started = Instant::now();
        let request = self
            .client
            .post(self.table_url.clone())
            .header("Prefer", "return=representation")
            .json(&json!({ "title": params.title, "content": params.content }));
        let result = self.fetch_rows::<Article>(request).await;
        record_origin_latency(BACKEND, "create", started);

        result?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::decode("insert returned no representation"))
    }
}
