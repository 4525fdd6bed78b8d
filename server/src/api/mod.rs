//! HTTP surface
//!
//! Every module contributes a `router()`; they are merged under `/api`
//! except for the browser OAuth routes.

mod auth;
mod classify;
mod community;
pub mod cookies;
pub mod extract;
mod library;
mod mcp;
mod prompts;

use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::app::AppState;
use crate::config::API_KEY_HEADER;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]);

    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .merge(auth::router())
        .nest("/api", api_router())
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(prompts::router())
        .merge(library::router())
        .merge(community::router())
        .merge(classify::router())
        .merge(auth::api_router())
        .merge(mcp::router())
}

async fn not_found(req: axum::extract::Request) -> impl IntoResponse {
    tracing::warn!("unhandled path: {}", req.uri());
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}
