//! GitHub OAuth web flow

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::{Config, GITHUB_API_VERSION, GITHUB_OAUTH_SCOPE, USER_AGENT};
use crate::error::{AppError, Result};

/// Profile fields read from `GET /user`
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct GithubOAuth {
    client: Client,
    oauth_base: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GithubOAuth {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            oauth_base: config.github_oauth_url.trim_end_matches('/').to_string(),
            api_base: config.github_api_url.trim_end_matches('/').to_string(),
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            redirect_uri: format!(
                "{}/auth/callback",
                config.public_base_url.trim_end_matches('/')
            ),
        }
    }

    /// Random nonce for the `state` parameter
    pub fn new_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    /// URL of the GitHub consent page
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/login/oauth/authorize", self.oauth_base),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", GITHUB_OAUTH_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("invalid GitHub OAuth URL: {e}")))?;
        Ok(url.into())
    }

    /// Trade an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_base))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "GitHub token exchange failed with status {}",
                resp.status()
            )));
        }

        let body: TokenResponse = resp.json().await?;
        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                let reason = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| "no access token returned".to_string());
                tracing::warn!("GitHub token exchange rejected: {}", reason);
                Err(AppError::Unauthorized(format!(
                    "Failed to obtain access token: {reason}"
                )))
            }
        }
    }

    pub async fn fetch_user(&self, access_token: &str) -> Result<GithubUser> {
        let resp = self
            .client
            .get(format!("{}/user", self.api_base))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Unauthorized(
                "Failed to fetch user info from GitHub".to_string(),
            ));
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth(server: &MockServer) -> GithubOAuth {
        let config = Config {
            github_oauth_url: server.uri(),
            github_api_url: server.uri(),
            ..Config::for_tests()
        };
        GithubOAuth::new(Client::new(), &config)
    }

    #[test]
    fn test_state_is_random_alphanumeric() {
        let a = GithubOAuth::new_state();
        let b = GithubOAuth::new_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorize_url_carries_scope_and_state() {
        let oauth = GithubOAuth::new(Client::new(), &Config::for_tests());
        let url = Url::parse(&oauth.authorize_url("xyz").unwrap()).unwrap();

        assert_eq!(url.path(), "/login/oauth/authorize");
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["scope"], GITHUB_OAUTH_SCOPE);
        assert_eq!(params["state"], "xyz");
        assert_eq!(params["redirect_uri"], "http://localhost:5173/auth/callback");
    }

    #[tokio::test]
    async fn test_exchange_code_returns_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_json(json!({
                "client_id": "client-id",
                "client_secret": "client-secret",
                "code": "abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_123",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;

        assert_eq!(oauth(&server).exchange_code("abc").await.unwrap(), "gho_123");
    }

    #[tokio::test]
    async fn test_exchange_code_error_is_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let err = oauth(&server).exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_fetch_user() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 583231,
                "login": "octocat",
                "name": "The Octocat",
                "email": null,
                "avatar_url": "https://avatars.githubusercontent.com/u/583231"
            })))
            .mount(&server)
            .await;

        let user = oauth(&server).fetch_user("gho_123").await.unwrap();
        assert_eq!(user.id, 583231);
        assert_eq!(user.login, "octocat");
        assert!(user.email.is_none());
    }
}
