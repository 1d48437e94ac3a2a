//! HTTP surface: article routes, the revalidation webhook and debug routes.

mod articles;
mod debug;
pub mod error;
mod middleware;
mod state;
mod webhook;

pub use error::ApiError;
pub use middleware::REQUEST_ID_HEADER;
pub use state::HttpState;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::application::error::ErrorReport;

use middleware::trace_requests;

const NOT_FOUND_MESSAGE: &str = "This route doesn't exist";

pub fn build_router(state: HttpState, debug_routes: bool) -> Router {
    let article_routes = Router::new()
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route("/articles/{id}", get(articles::get_article))
        .layer(cors_layer());

    let mut router = Router::new()
        .route("/", get(index))
        .route("/revalidate", post(webhook::revalidate))
        .merge(article_routes);

    if debug_routes {
        router = router
            .route("/read-kv", get(debug::read_kv))
            .route("/write-kv", get(debug::write_kv));
    }

    router
        .fallback(fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(trace_requests))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn index() -> &'static str {
    "Hello from kvedge!"
}

async fn fallback(request: Request<Body>) -> Response {
    let mut response = (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response();
    ErrorReport::from_message(
        "infra::http::fallback",
        StatusCode::NOT_FOUND,
        format!("no route for {} {}", request.method(), request.uri().path()),
    )
    .attach(&mut response);
    response
}
