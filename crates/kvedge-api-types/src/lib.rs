//! Wire types for the kvedge HTTP surface.
//!
//! The server depends on this crate for its request and response bodies so that
//! clients can share the exact JSON shapes without pulling in the service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /articles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
}

/// Successful reply to `POST /articles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateArticleResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> CreateArticleResponse<T> {
    pub fn created(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Row change kind reported by the origin's database webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    #[serde(alias = "insert", alias = "create", alias = "CREATE")]
    Insert,
    #[serde(alias = "update")]
    Update,
    #[serde(alias = "delete")]
    Delete,
}

/// Body of `POST /revalidate`.
///
/// `record` carries the row after the change and is `null` for deletes;
/// `old_record` carries the row before the change and is only populated for
/// deletes. `table` and `schema` are sent by database webhooks and are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevalidateRequest {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

/// Acknowledgement returned to the webhook sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidateAck {
    pub received: bool,
}

impl RevalidateAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn revalidate_request_accepts_database_webhook_payload() {
        let payload = json!({
            "type": "DELETE",
            "table": "articles",
            "schema": "public",
            "record": null,
            "old_record": { "id": 5 }
        });

        let request: RevalidateRequest = serde_json::from_value(payload).expect("valid payload");
        assert_eq!(request.kind, ChangeType::Delete);
        assert_eq!(request.table.as_deref(), Some("articles"));
        assert!(request.record.is_none());
        assert_eq!(request.old_record, Some(json!({ "id": 5 })));
    }

    #[test]
    fn change_type_accepts_lowercase_aliases() {
        let kind: ChangeType = serde_json::from_value(json!("update")).expect("alias");
        assert_eq!(kind, ChangeType::Update);
        let kind: ChangeType = serde_json::from_value(json!("create")).expect("alias");
        assert_eq!(kind, ChangeType::Insert);
    }

    #[test]
    fn unknown_change_type_is_rejected() {
        let result = serde_json::from_value::<RevalidateRequest>(json!({ "type": "TRUNCATE" }));
        assert!(result.is_err());
    }

    #[test]
    fn create_response_serializes_success_flag() {
        let body = CreateArticleResponse::created(json!({ "id": 1 }));
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({ "success": true, "data": { "id": 1 } })
        );
    }
}
