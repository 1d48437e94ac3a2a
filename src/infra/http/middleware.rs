use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Runs the request inside a span carrying a fresh request id, echoes the id
/// back in `x-request-id`, and logs every 4xx/5xx with its [`ErrorReport`].
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, chain) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let elapsed_ms = started.elapsed().as_millis();

    span.in_scope(|| {
        if status.is_server_error() {
            error!(
                target: "kvedge::http::response",
                status = status.as_u16(),
                elapsed_ms,
                source,
                chain = ?chain,
                "request failed"
            );
        } else {
            warn!(
                target: "kvedge::http::response",
                status = status.as_u16(),
                elapsed_ms,
                source,
                chain = ?chain,
                "client request error"
            );
        }
    });

    response
}
