//! MCP over server-sent events
//!
//! GET  /api/mcp             open a session stream (API key required)
//! POST /api/mcp?sessionId=  deliver a JSON-RPC message to a session

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::app::AppState;
use crate::config::API_KEY_HEADER;
use crate::error::{AppError, Result};
use crate::mcp::ToolServer;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    session_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/mcp", get(open_stream).post(post_message))
}

/// The API key from the header, else from the `apiKey` query parameter
fn api_key(headers: &HeaderMap, query: StreamQuery) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.api_key)
        .filter(|k| !k.is_empty())
}

pub(crate) async fn open_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<impl IntoResponse> {
    let key = api_key(&headers, query)
        .ok_or_else(|| AppError::Unauthorized("Missing API key".to_string()))?;
    let user = state
        .sessions
        .verify(&key)
        .map_err(|_| AppError::Unauthorized("Invalid API key".to_string()))?;

    let server = ToolServer::new(Arc::new(state.library_for(&user)));
    let (session_id, stream) = state.mcp.open(server);
    tracing::debug!("MCP stream {} opened for {}", session_id, user.username);

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

pub(crate) async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Result<impl IntoResponse> {
    let session_id = query
        .session_id
        .ok_or_else(|| AppError::Validation("Missing sessionId".to_string()))?;

    state.mcp.dispatch(&session_id, &body)?;
    Ok((StatusCode::ACCEPTED, "Accepted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_key_preferred_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("header-key"));

        let key = api_key(
            &headers,
            StreamQuery {
                api_key: Some("query-key".to_string()),
            },
        );
        assert_eq!(key.as_deref(), Some("header-key"));
    }

    #[test]
    fn test_empty_query_key_is_missing() {
        let key = api_key(
            &HeaderMap::new(),
            StreamQuery {
                api_key: Some(String::new()),
            },
        );
        assert!(key.is_none());
    }
}
