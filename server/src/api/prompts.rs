//! Guest submissions and their discussion threads

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::database::CreateSubmissionRequest;
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitBody {
    text: String,
    guest_name: String,
    guest_email: Option<String>,
    suggested_title: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentBody {
    author: String,
    text: String,
}

impl CommentBody {
    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts", get(list_prompts).post(submit_prompt))
        .route("/prompts/{id}", get(get_prompt))
        .route("/prompts/{id}/comments", post(add_comment))
}

/// Approved submissions; a database failure yields an empty list and an error message
pub(crate) async fn list_prompts(State(state): State<AppState>) -> impl IntoResponse {
    match state.submissions.list_approved().await {
        Ok(prompts) => Json(json!({ "prompts": prompts })),
        Err(e) => {
            tracing::error!("Failed to list prompts: {}", e);
            Json(json!({
                "prompts": [],
                "error": "Failed to load prompts. Please try again later."
            }))
        }
    }
}

pub(crate) async fn submit_prompt(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse> {
    let submission = state
        .submissions
        .submit(CreateSubmissionRequest {
            text: body.text,
            suggested_title: body.suggested_title,
            category: body.category,
            tags: body.tags,
            guest_name: body.guest_name,
            guest_email: body.guest_email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "prompt": submission })),
    ))
}

pub(crate) async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let (prompt, discussions) = state.submissions.get_with_discussions(&id).await?;
    Ok(Json(json!({ "prompt": prompt, "discussions": discussions })))
}

pub(crate) async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse> {
    let discussion = state.submissions.comment(&id, body.author(), body.text()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "discussion": discussion }))))
}
