use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use kvedge_api_types::{ChangeType, RevalidateAck, RevalidateRequest};
use serde_json::Value;
use tracing::debug;

use crate::domain::{Article, ChangeEvent, ChangeKind};

use super::{HttpState, error::ApiError};

/// Change-event webhook. Well-formed events are always acknowledged;
/// resynchronisation failures stay in the logs.
pub(super) async fn revalidate(
    State(state): State<HttpState>,
    payload: Result<Json<RevalidateRequest>, JsonRejection>,
) -> Result<Json<RevalidateAck>, ApiError> {
    let Json(request) = payload?;
    let event = change_event(request);
    let outcome = state.revalidation.handle(&event).await;
    debug!(outcome = ?outcome, "revalidation finished");
    Ok(Json(RevalidateAck::received()))
}

fn change_event(request: RevalidateRequest) -> ChangeEvent {
    let kind = match request.kind {
        ChangeType::Insert => ChangeKind::Insert,
        ChangeType::Update => ChangeKind::Update,
        ChangeType::Delete => ChangeKind::Delete,
    };
    ChangeEvent {
        kind,
        table: request.table,
        record: request.record.and_then(article_from),
        old_record: request.old_record.and_then(article_from),
    }
}

// Rows without a usable `id` are treated as missing.
fn article_from(value: Value) -> Option<Article> {
    serde_json::from_value(value).ok()
}
