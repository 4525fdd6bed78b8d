//! Community library: discovery, nominations and discussion

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::extract::CurrentUser;
use super::prompts::CommentBody;
use crate::app::AppState;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    category: Option<String>,
    featured: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NominateBody {
    gist_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/community/discover", get(discover))
        .route("/community/nominate", post(nominate))
        .route("/community/prompt/{gist_id}", get(get_prompt))
        .route("/community/prompt/{gist_id}/comments", post(add_comment))
}

/// Curated prompts; a database failure yields an empty list
pub(crate) async fn discover(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> impl IntoResponse {
    let featured_only = query.featured.as_deref() == Some("true");

    match state
        .community
        .discover(query.category, featured_only, query.limit, query.offset)
        .await
    {
        Ok(prompts) => Json(json!({ "prompts": prompts })),
        Err(e) => {
            tracing::error!("Failed to discover community prompts: {}", e);
            Json(json!({ "prompts": [], "error": "Failed to load community prompts" }))
        }
    }
}

pub(crate) async fn nominate(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<NominateBody>,
) -> Result<impl IntoResponse> {
    let library = state.library_for(&current.user);
    let nomination = state
        .community
        .nominate(&library, &body.gist_id, &current.user.username)
        .await?;
    Ok(Json(json!({ "success": true, "nominationId": nomination.id })))
}

pub(crate) async fn get_prompt(
    State(state): State<AppState>,
    Path(gist_id): Path<String>,
) -> Result<impl IntoResponse> {
    let (prompt, discussions) = state.community.get_prompt(&gist_id).await?;
    Ok(Json(json!({ "prompt": prompt, "discussions": discussions })))
}

pub(crate) async fn add_comment(
    State(state): State<AppState>,
    Path(gist_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse> {
    let discussion = state
        .community
        .comment(&gist_id, body.author(), body.text())
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "discussion": discussion }))))
}
