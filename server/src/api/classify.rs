use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassifyBody {
    text: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/classify", post(classify))
}

/// Suggest a title, category and tags for a prompt text
pub(crate) async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyBody>,
) -> Result<impl IntoResponse> {
    let classification = state.classifier.classify(&body.text).await?;
    Ok(Json(classification))
}
