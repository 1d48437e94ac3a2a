//! Origin store seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Article, ArticleId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("origin unavailable: {0}")]
    Unavailable(String),
    #[error("origin rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("origin returned an unreadable payload: {0}")]
    Decode(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArticleParams {
    pub title: String,
    pub content: String,
}

/// Authoritative article storage.
#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Every article, ordered by id.
    async fn list_articles(&self) -> Result<Vec<Article>, RepoError>;

    async fn find_article(&self, id: &ArticleId) -> Result<Option<Article>, RepoError>;

    /// Insert a new article and return the stored row.
    async fn create_article(&self, params: CreateArticleParams) -> Result<Article, RepoError>;
}
