//! Personal library endpoints backed by the signed-in user's gists

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::extract::CurrentUser;
use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::gist::{NewPrompt, PromptPatch};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/library/index", get(get_index))
        .route("/library/prompt", post(create_prompt))
        .route(
            "/library/prompt/{gist_id}",
            get(get_prompt).patch(update_prompt).delete(delete_prompt),
        )
        .route("/library/fork/{gist_id}", post(fork_prompt))
}

/// The user's index, or an empty one when none exists yet
pub(crate) async fn get_index(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse> {
    let index = state.library_for(&current.user).index_or_empty().await?;
    Ok(Json(index))
}

pub(crate) async fn create_prompt(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(prompt): Json<NewPrompt>,
) -> Result<impl IntoResponse> {
    if prompt.title.trim().is_empty() || prompt.content.trim().is_empty() {
        return Err(AppError::Validation("Title and content are required".to_string()));
    }

    let gist_id = state.library_for(&current.user).add_prompt(prompt).await?;
    Ok(Json(json!({ "gistId": gist_id })))
}

pub(crate) async fn get_prompt(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(gist_id): Path<String>,
) -> Result<impl IntoResponse> {
    let prompt = state.library_for(&current.user).get_prompt(&gist_id).await?;
    Ok(Json(prompt))
}

pub(crate) async fn update_prompt(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(gist_id): Path<String>,
    Json(patch): Json<PromptPatch>,
) -> Result<impl IntoResponse> {
    if !patch.is_empty() {
        state
            .library_for(&current.user)
            .edit_prompt(&gist_id, patch)
            .await?;
    }
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn delete_prompt(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(gist_id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .library_for(&current.user)
        .remove_prompt(&gist_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Copy any readable gist into the user's library as a private prompt
pub(crate) async fn fork_prompt(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(gist_id): Path<String>,
) -> Result<impl IntoResponse> {
    let new_id = state
        .library_for(&current.user)
        .fork_prompt(&gist_id)
        .await?;
    Ok(Json(json!({ "gistId": new_id })))
}
