//! GitHub Gist client
//!
//! Gists are treated as an opaque document store: documents are addressed
//! by id and hold named text files.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::sync::Arc;

use super::models::{Gist, GistPayload};
use crate::config::{GIST_LIST_PAGE_SIZE, GITHUB_API_VERSION, USER_AGENT};
use crate::error::{AppError, Result};

/// CRUD over gist documents owned by one GitHub user
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List the user's gists. File contents are not included.
    async fn list(&self) -> Result<Vec<Gist>>;
    async fn get(&self, id: &str) -> Result<Gist>;
    async fn create(&self, payload: &GistPayload) -> Result<Gist>;
    async fn update(&self, id: &str, payload: &GistPayload) -> Result<Gist>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Produces a document store bound to a user's access token
pub trait GistConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Arc<dyn DocumentStore>;
}

/// Document store backed by the GitHub REST API
pub struct HttpGistStore {
    client: Client,
    api_base: String,
    token: String,
}

impl HttpGistStore {
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Option<reqwest::Response>> {
        let resp = builder.send().await?;
        let status = resp.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "GitHub API request failed".to_string());

            tracing::warn!(status = %status, message = %message, "GitHub API error");

            return Err(match status {
                StatusCode::NOT_FOUND => AppError::NotFound(message),
                StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
                _ => AppError::Upstream(message),
            });
        }

        Ok(Some(resp))
    }

    async fn send_gist(&self, builder: RequestBuilder) -> Result<Gist> {
        match self.send(builder).await? {
            Some(resp) => Ok(resp.json::<Gist>().await?),
            None => Err(AppError::Upstream("GitHub returned no gist".to_string())),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpGistStore {
    async fn list(&self) -> Result<Vec<Gist>> {
        let builder = self
            .request(Method::GET, "/gists")
            .query(&[("per_page", GIST_LIST_PAGE_SIZE)]);
        match self.send(builder).await? {
            Some(resp) => Ok(resp.json::<Vec<Gist>>().await?),
            None => Ok(Vec::new()),
        }
    }

    async fn get(&self, id: &str) -> Result<Gist> {
        self.send_gist(self.request(Method::GET, &format!("/gists/{id}")))
            .await
    }

    async fn create(&self, payload: &GistPayload) -> Result<Gist> {
        let gist = self
            .send_gist(self.request(Method::POST, "/gists").json(payload))
            .await?;
        tracing::debug!("Created gist: {}", gist.id);
        Ok(gist)
    }

    async fn update(&self, id: &str, payload: &GistPayload) -> Result<Gist> {
        let gist = self
            .send_gist(
                self.request(Method::PATCH, &format!("/gists/{id}"))
                    .json(payload),
            )
            .await?;
        tracing::debug!("Updated gist: {}", id);
        Ok(gist)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/gists/{id}")))
            .await?;
        tracing::debug!("Deleted gist: {}", id);
        Ok(())
    }
}

/// Connector handing out [`HttpGistStore`]s that share one HTTP client
#[derive(Clone)]
pub struct HttpGistConnector {
    client: Client,
    api_base: String,
}

impl HttpGistConnector {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

impl GistConnector for HttpGistConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn DocumentStore> {
        Arc::new(HttpGistStore::new(
            self.client.clone(),
            self.api_base.clone(),
            access_token,
        ))
    }
}
