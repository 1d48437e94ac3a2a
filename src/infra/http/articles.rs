use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use kvedge_api_types::{CreateArticleRequest, CreateArticleResponse};

use crate::application::repos::CreateArticleParams;
use crate::domain::{Article, ArticleId};

use super::{HttpState, error::ApiError};

pub(super) async fn list_articles(
    State(state): State<HttpState>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let articles = state.articles.list().await?;
    Ok(Json(articles))
}

pub(super) async fn get_article(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let id = ArticleId::parse(&raw_id);
    let article = state.articles.get(&id).await?;
    Ok(Json(article))
}

pub(super) async fn create_article(
    State(state): State<HttpState>,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> Result<Json<CreateArticleResponse<Article>>, ApiError> {
    let Json(request) = payload?;
    let article = state
        .articles
        .create(CreateArticleParams {
            title: request.title,
            content: request.content,
        })
        .await?;
    Ok(Json(CreateArticleResponse::created(article)))
}
