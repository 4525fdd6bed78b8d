//! HTTP client for this server's personal-library API
//!
//! Authenticates with the session value as an API key, the same value
//! `/api/connect` hands out for MCP setup.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::RemoteLibrary;
use crate::config::{API_KEY_HEADER, USER_AGENT};
use crate::error::{AppError, Result};
use crate::gist::models::{LibraryIndex, NewPrompt, PromptDocument, PromptPatch};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPrompt {
    gist_id: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
            .header("User-Agent", USER_AGENT)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| format!("request failed with status {status}"));

        Err(match status {
            StatusCode::BAD_REQUEST => AppError::Validation(message),
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            _ => AppError::Upstream(message),
        })
    }
}

#[async_trait]
impl RemoteLibrary for ApiClient {
    async fn fetch_index(&self) -> Result<Option<LibraryIndex>> {
        let resp = self
            .send(self.request(Method::GET, "/api/library/index"))
            .await?;
        Ok(Some(resp.json().await?))
    }

    async fn fetch_prompt(&self, gist_id: &str) -> Result<PromptDocument> {
        let resp = self
            .send(self.request(Method::GET, &format!("/api/library/prompt/{gist_id}")))
            .await?;
        Ok(resp.json().await?)
    }

    async fn create_prompt(&self, prompt: NewPrompt) -> Result<String> {
        let resp = self
            .send(self.request(Method::POST, "/api/library/prompt").json(&prompt))
            .await?;
        let created: CreatedPrompt = resp.json().await?;
        tracing::debug!("Created remote prompt {}", created.gist_id);
        Ok(created.gist_id)
    }

    async fn update_prompt(&self, gist_id: &str, patch: PromptPatch) -> Result<()> {
        self.send(
            self.request(Method::PATCH, &format!("/api/library/prompt/{gist_id}"))
                .json(&patch),
        )
        .await?;
        Ok(())
    }

    async fn delete_prompt(&self, gist_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/api/library/prompt/{gist_id}")))
            .await?;
        Ok(())
    }
}
