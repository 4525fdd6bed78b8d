//! GitHub sign-in and session endpoints
//!
//! GET /auth/login      start the OAuth flow
//! GET /auth/callback   finish it and set the session cookie
//! GET /auth/logout     clear the session cookie
//! GET /api/session     the signed-in user, if any
//! GET /api/connect     API key and origin for MCP clients

use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::cookies;
use super::extract::{cookie_value, CurrentUser, MaybeUser};
use crate::app::AppState;
use crate::auth::{GithubOAuth, SessionUser};
use crate::config::OAUTH_STATE_COOKIE;
use crate::database::UpsertUserRequest;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Browser-facing routes, mounted at the root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", get(logout))
}

/// JSON routes, mounted under `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session))
        .route("/connect", get(connect))
}

pub(crate) async fn login(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let nonce = GithubOAuth::new_state();
    let url = state.oauth.authorize_url(&nonce)?;

    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, url),
            (
                SET_COOKIE,
                cookies::oauth_state(&nonce, state.config.secure_cookies()),
            ),
        ]),
    ))
}

pub(crate) async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    if let Some(error) = query.error {
        tracing::warn!("GitHub denied authorization: {}", error);
        return Err(AppError::Unauthorized(format!("Authorization failed: {error}")));
    }

    let expected = cookie_value(&headers, OAUTH_STATE_COOKIE);
    let (Some(code), Some(returned)) = (query.code, query.state) else {
        return Err(AppError::Validation("Invalid OAuth state".to_string()));
    };
    if expected.as_deref() != Some(returned.as_str()) {
        tracing::warn!("OAuth state mismatch");
        return Err(AppError::Validation("Invalid OAuth state".to_string()));
    }

    let access_token = state.oauth.exchange_code(&code).await?;
    let profile = state.oauth.fetch_user(&access_token).await?;

    let user = state
        .repo
        .upsert_user(UpsertUserRequest {
            github_id: profile.id,
            username: profile.login,
            name: profile.name,
            email: profile.email,
            avatar_url: profile.avatar_url,
        })
        .await?;

    let token = state.sessions.issue(&SessionUser {
        id: user.github_id,
        username: user.username.clone(),
        access_token,
    })?;

    tracing::info!("User {} signed in", user.username);

    let secure = state.config.secure_cookies();
    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, "/".to_string()),
            (SET_COOKIE, cookies::session(&token, secure)),
            (SET_COOKIE, cookies::clear_oauth_state(secure)),
        ]),
    ))
}

pub(crate) async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, "/".to_string()),
            (
                SET_COOKIE,
                cookies::clear_session(state.config.secure_cookies()),
            ),
        ]),
    )
}

/// The signed-in user; an invalid session cookie is cleared
pub(crate) async fn session(State(state): State<AppState>, maybe: MaybeUser) -> impl IntoResponse {
    let clear = maybe
        .stale_cookie
        .then(|| (SET_COOKIE, cookies::clear_session(state.config.secure_cookies())));

    (AppendHeaders(clear), Json(json!({ "user": maybe.user })))
}

pub(crate) async fn connect(
    State(state): State<AppState>,
    current: CurrentUser,
) -> impl IntoResponse {
    Json(json!({
        "apiKey": current.token,
        "origin": state.config.public_base_url,
    }))
}
