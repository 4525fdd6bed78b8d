//! Request extractors for the signed-in user
//!
//! A session is accepted from the `X-API-Key` header (API and MCP
//! clients) or from the `session` cookie (browsers).

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::app::AppState;
use crate::auth::SessionUser;
use crate::config::{API_KEY_HEADER, SESSION_COOKIE};
use crate::error::AppError;

/// Value of a named cookie from the `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// The raw session token presented with a request
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// A request that must carry a valid session
pub struct CurrentUser {
    pub user: SessionUser,
    /// The token the user authenticated with
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let user = state.sessions.verify(&token).map_err(|e| {
            tracing::debug!("Rejected session: {}", e);
            AppError::Unauthorized("Unauthorized".to_string())
        })?;

        Ok(Self { user, token })
    }
}

/// A request that may carry a session; invalid sessions count as absent
pub struct MaybeUser {
    pub user: Option<SessionUser>,
    /// A session cookie was presented but did not verify
    pub stale_cookie: bool,
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(Self {
                user: None,
                stale_cookie: false,
            });
        };

        match state.sessions.verify(&token) {
            Ok(user) => Ok(Self {
                user: Some(user),
                stale_cookie: false,
            }),
            Err(_) => Ok(Self {
                user: None,
                stale_cookie: cookie_value(&parts.headers, SESSION_COOKIE).is_some(),
            }),
        }
    }
}
