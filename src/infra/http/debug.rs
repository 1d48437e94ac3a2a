//! Cache inspection routes, mounted only when `server.debug_routes` is set.

use axum::{Json, extract::State};
use serde_json::Value;

use crate::cache::{CacheKey, Lookup};
use crate::domain::Article;

use super::{HttpState, error::ApiError};

/// Raw `/articles` entry, or `null` when nothing is cached.
pub(super) async fn read_kv(State(state): State<HttpState>) -> Result<Json<Value>, ApiError> {
    let value = match state.cache.read::<Value>(&CacheKey::collection()).await? {
        Lookup::Hit(value) => value,
        Lookup::Absent => Value::Null,
    };
    Ok(Json(value))
}

/// Seed `/articles` with a fixed two-article collection.
pub(super) async fn write_kv(
    State(state): State<HttpState>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let samples = sample_articles();
    state.cache.write(&CacheKey::collection(), &samples).await?;
    Ok(Json(samples))
}

fn sample_articles() -> Vec<Article> {
    vec![
        Article::new(1)
            .with_field("title", "Hello from the edge")
            .with_field("content", "This article was seeded into the cache."),
        Article::new(2)
            .with_field("title", "Cache-aside in practice")
            .with_field("content", "Reads hit the cache first and fall back to the origin."),
    ]
}
