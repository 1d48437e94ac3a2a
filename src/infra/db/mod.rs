//! Postgres-backed origin store.

mod articles;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::infra::error::InfraError;

use util::is_sql_identifier;

/// Table created by the embedded migrations. Any other `origin.table` must
/// already exist with at least `id`, `title` and `content` columns.
pub const MIGRATED_TABLE: &str = "articles";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    table: Arc<str>,
}

impl PostgresRepositories {
    /// Wrap `pool`, reading and writing articles in `table`.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, InfraError> {
        if !is_sql_identifier(table) {
            return Err(InfraError::configuration(format!(
                "`{table}` is not a valid table name"
            )));
        }
        Ok(Self {
            pool: Arc::new(pool),
            table: Arc::from(table),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    /// Whether the embedded migrations own the schema of `table`.
    pub fn migrations_manage(table: &str) -> bool {
        table == MIGRATED_TABLE
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_default_table_is_migrated() {
        assert!(PostgresRepositories::migrations_manage("articles"));
        assert!(!PostgresRepositories::migrations_manage("posts"));
        assert!(!PostgresRepositories::migrations_manage("Articles"));
    }
}
