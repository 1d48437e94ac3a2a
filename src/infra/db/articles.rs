use std::time::Instant;

use async_trait::async_trait;
use sqlx::types::Json;

use crate::{
    application::repos::{ArticlesRepo, CreateArticleParams, RepoError},
    domain::{Article, ArticleId},
    infra::telemetry::record_origin_latency,
};

use super::{PostgresRepositories, map_sqlx_error};

const BACKEND: &str = "postgres";

// Rows are projected through `to_jsonb` so every column reaches the cache,
// including ones added after this service was deployed.
#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn list_articles(&self) -> Result<Vec<Article>, RepoError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT to_jsonb(t) FROM {table} AS t ORDER BY t.id ASC",
            table = self.table()
        );
        let rows = sqlx::query_scalar::<_, Json<Article>>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error);
        record_origin_latency(BACKEND, "list", started);

        Ok(rows?.into_iter().map(|Json(article)| article).collect())
    }

    async fn find_article(&self, id: &ArticleId) -> Result<Option<Article>, RepoError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT to_jsonb(t) FROM {table} AS t WHERE t.id::text = $1",
            table = self.table()
        );
        let row = sqlx::query_scalar::<_, Json<Article>>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error);
        record_origin_latency(BACKEND, "find", started);

        Ok(row?.map(|Json(article)| article))
    }

    async fn create_article(&self, params: CreateArticleParams) -> Result<Article, RepoError> {
        let started = Instant::now();
        let sql = format!(
            "INSERT INTO {table} AS t (title, content) VALUES ($1, $2) RETURNING to_jsonb(t)",
            table = self.table()
        );
        let row = sqlx::query_scalar::<_, Json<Article>>(&sql)
            .bind(params.title)
            .bind(params.content)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error);
        record_origin_latency(BACKEND, "create", started);

        row.map(|Json(article)| article)
    }
}
