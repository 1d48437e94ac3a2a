//! Change-event driven cache resynchronisation.
//!
//! Each event updates or removes the touched article entry and then
//! unconditionally rewrites the `/articles` snapshot from a fresh origin read.
//! Nothing here is reported back to the event sender.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::application::repos::{ArticlesRepo, RepoError};
use crate::cache::{CacheAside, CacheError, CacheKey};
use crate::domain::{ChangeEvent, ChangeKind};

const SOURCE: &str = "application::revalidate::RevalidationService";

const METRIC_EVENTS: &str = "kvedge_revalidate_events_total";
const METRIC_FAILURES: &str = "kvedge_revalidate_failures_total";

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("failed to reload articles from origin: {0}")]
    Repo(#[from] RepoError),
    #[error("failed to update cache: {0}")]
    Cache(#[from] CacheError),
}

/// What happened to the single-article entry of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Written,
    Deleted,
    /// The event carried no usable record for its kind.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    /// Snapshot rewritten with this many articles.
    Refreshed(usize),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// Event belongs to another table and was not applied.
    Ignored,
    Applied {
        item: ItemAction,
        collection: CollectionAction,
    },
}

#[derive(Clone)]
pub struct RevalidationService {
    articles: Arc<dyn ArticlesRepo>,
    cache: CacheAside,
    table: String,
}

impl RevalidationService {
    pub fn new(articles: Arc<dyn ArticlesRepo>, cache: CacheAside, table: impl Into<String>) -> Self {
        Self {
            articles,
            cache,
            table: table.into(),
        }
    }

    #[instrument(skip_all, fields(event_kind = event.kind.as_str()))]
    pub async fn handle(&self, event: &ChangeEvent) -> RevalidationOutcome {
        counter!(METRIC_EVENTS, "kind" => event.kind.as_str()).increment(1);

        if let Some(table) = event.table.as_deref()
            && table != self.table
        {
            debug!(
                source = SOURCE,
                table,
                expected = %self.table,
                "ignoring change event for another table"
            );
            return RevalidationOutcome::Ignored;
        }

        let item = self.apply_item(event).await;

        let collection = match self.refresh_collection().await {
            Ok(count) => CollectionAction::Refreshed(count),
            Err(err) => {
                counter!(METRIC_FAILURES).increment(1);
                warn!(source = SOURCE, error = %err, "collection refresh failed");
                CollectionAction::Failed
            }
        };

        info!(
            source = SOURCE,
            item = ?item,
            collection = ?collection,
            "change event applied"
        );
        RevalidationOutcome::Applied { item, collection }
    }

    /// Re-read every article from the origin and overwrite `/articles`.
    #[instrument(skip(self))]
    pub async fn refresh_collection(&self) -> Result<usize, RevalidateError> {
        let articles = self.articles.list_articles().await?;
        self.cache.write(&CacheKey::collection(), &articles).await?;
        Ok(articles.len())
    }

    async fn apply_item(&self, event: &ChangeEvent) -> ItemAction {
        let Some(id) = event.target() else {
            warn!(
                source = SOURCE,
                "change event carries no record id; skipping item update"
            );
            return ItemAction::Skipped;
        };
        let key = CacheKey::article(id);

        let result = match (event.kind, event.record.as_ref()) {
            (ChangeKind::Delete, _) => self.cache.delete(&key).await.map(|_| ItemAction::Deleted),
            (_, Some(record)) => self
                .cache
                .write(&key, record)
                .await
                .map(|_| ItemAction::Written),
            (_, None) => Ok(ItemAction::Skipped),
        };

        result.unwrap_or_else(|err| {
            counter!(METRIC_FAILURES).increment(1);
            warn!(source = SOURCE, key = %key, error = %err, "item cache update failed");
            ItemAction::Failed
        })
    }
}
