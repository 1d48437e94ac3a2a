use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::application::repos::{ArticlesRepo, CreateArticleParams, RepoError};
use crate::cache::{CacheAside, CacheKey, Lookup};
use crate::domain::{Article, ArticleId};

const SOURCE: &str = "application::articles::ArticleService";

#[derive(Debug, Error)]
pub enum ArticleServiceError {
    #[error("article `{0}` not found")]
    NotFound(ArticleId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Read-through access to articles and pass-through creation.
#[derive(Clone)]
pub struct ArticleService {
    articles: Arc<dyn ArticlesRepo>,
    cache: CacheAside,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticlesRepo>, cache: CacheAside) -> Self {
        Self { articles, cache }
    }

    /// Full collection, served from `/articles` when cached.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Article>, ArticleServiceError> {
        let key = CacheKey::collection();
        if let Some(articles) = self.cached::<Vec<Article>>(&key).await {
            return Ok(articles);
        }

        let articles = self.articles.list_articles().await?;
        self.populate(&key, &articles).await;
        Ok(articles)
    }

    /// Single article. An origin miss is reported as `NotFound` and leaves
    /// the cache untouched.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn get(&self, id: &ArticleId) -> Result<Article, ArticleServiceError> {
        let key = CacheKey::article(id);
        if let Some(article) = self.cached::<Article>(&key).await {
            return Ok(article);
        }

        let Some(article) = self.articles.find_article(id).await? else {
            debug!(source = SOURCE, "article absent at origin");
            return Err(ArticleServiceError::NotFound(id.clone()));
        };
        self.populate(&key, &article).await;
        Ok(article)
    }

    /// Insert at the origin. The cache is refreshed later by the origin's
    /// change event, not here.
    #[instrument(skip(self, params))]
    pub async fn create(&self, params: CreateArticleParams) -> Result<Article, ArticleServiceError> {
        let article = self.articles.create_article(params).await?;
        debug!(source = SOURCE, id = %article.id, "article created at origin");
        Ok(article)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.read::<T>(key).await {
            Ok(Lookup::Hit(value)) => Some(value),
            Ok(Lookup::Absent) => None,
            Err(err) => {
                warn!(
                    source = SOURCE,
                    key = %key,
                    error = %err,
                    "cache read failed; falling back to origin"
                );
                None
            }
        }
    }

    async fn populate<T: Serialize + Sync>(&self, key: &CacheKey, value: &T) {
        if let Err(err) = self.cache.write(key, value).await {
            warn!(
                source = SOURCE,
                key = %key,
                error = %err,
                "failed to populate cache after miss"
            );
        }
    }
}
