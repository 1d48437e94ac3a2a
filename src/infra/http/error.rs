use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kvedge_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::application::articles::ArticleServiceError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::cache::CacheError;

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const ORIGIN_REJECTED: &str = "origin_rejected";
    pub const ORIGIN_ERROR: &str = "origin_error";
    pub const CACHE_UNAVAILABLE: &str = "cache_unavailable";
}

/// Client-facing error. `message` and `hint` reach the response body; `detail`
/// only reaches the logs through the attached [`ErrorReport`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn invalid_input(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message, hint)
    }

    pub fn origin_error(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            codes::ORIGIN_ERROR,
            "Origin store request failed",
            None,
        )
        .with_detail(detail)
    }

    pub fn cache_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CACHE_UNAVAILABLE,
            "Cache store unavailable",
            None,
        )
        .with_detail(detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .detail
            .clone()
            .or_else(|| self.hint.clone())
            .unwrap_or_else(|| self.message.to_string());
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::error",
            self.status,
            format!("{}: {detail}", self.code),
        )
        .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidInput { message } => {
                ApiError::invalid_input("Article could not be stored", Some(message))
            }
            RepoError::Rejected { status, message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::ORIGIN_REJECTED,
                "Origin store rejected the request",
                Some(message.clone()),
            )
            .with_detail(format!("origin status {status}: {message}")),
            other @ (RepoError::Unavailable(_)
            | RepoError::Decode(_)
            | RepoError::Persistence(_)) => ApiError::origin_error(other.to_string()),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(id) => {
                ApiError::not_found("Article not found").with_detail(format!("article `{id}`"))
            }
            ArticleServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::cache_unavailable(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input("Request body is not valid", Some(rejection.body_text()))
    }
}
