use std::sync::Arc;

use crate::application::{articles::ArticleService, revalidate::RevalidationService};
use crate::cache::CacheAside;

/// Everything a handler may touch. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub revalidation: Arc<RevalidationService>,
    pub cache: CacheAside,
}
