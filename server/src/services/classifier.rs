//! Prompt classification through an OpenAI-compatible gateway
//!
//! Never fails for well-formed input: without a configured key a canned
//! mock is returned, and gateway errors fall back to a generic result.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{
    Config, CLASSIFY_CATEGORIES, MAX_CLASSIFY_TEXT_CHARS, MAX_SUGGESTED_TAGS,
    MAX_SUGGESTED_TITLE_CHARS, MIN_CLASSIFY_TEXT_LENGTH, PLACEHOLDER_GATEWAY_KEY,
};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(default)]
    pub suggested_title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Classification {
    pub fn mock() -> Self {
        Self {
            suggested_title: "AI-Generated Title (Mock)".to_string(),
            category: "Research".to_string(),
            tags: vec!["prompt".to_string(), "ai".to_string(), "dev".to_string()],
        }
    }

    pub fn fallback() -> Self {
        Self {
            suggested_title: "New Prompt".to_string(),
            category: "Creative".to_string(),
            tags: vec!["prompt".to_string()],
        }
    }

    /// Enforce title length and tag count, filling blanks from the fallback
    fn clamped(mut self) -> Self {
        let fallback = Self::fallback();
        if self.suggested_title.trim().is_empty() {
            self.suggested_title = fallback.suggested_title;
        }
        if self.category.trim().is_empty() {
            self.category = fallback.category;
        }
        self.suggested_title = self
            .suggested_title
            .chars()
            .take(MAX_SUGGESTED_TITLE_CHARS)
            .collect();
        self.tags.truncate(MAX_SUGGESTED_TAGS);
        self
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Clone)]
pub struct Classifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl Classifier {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: config.ai_gateway_url.clone(),
            model: config.ai_gateway_model.clone(),
            api_key: config.ai_gateway_key.clone(),
        }
    }

    fn configured_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.contains(PLACEHOLDER_GATEWAY_KEY))
    }

    pub async fn classify(&self, text: &str) -> Result<Classification> {
        if text.chars().count() < MIN_CLASSIFY_TEXT_LENGTH {
            return Err(AppError::Validation("Prompt text too short".to_string()));
        }

        let Some(key) = self.configured_key() else {
            tracing::debug!("No AI gateway key configured, returning mock classification");
            return Ok(Classification::mock());
        };

        match self.call_gateway(key, text).await {
            Ok(result) => Ok(result.clamped()),
            Err(e) => {
                tracing::warn!("Classification error: {}", e);
                Ok(Classification::fallback())
            }
        }
    }

    async fn call_gateway(&self, key: &str, text: &str) -> Result<Classification> {
        let excerpt: String = text.chars().take(MAX_CLASSIFY_TEXT_CHARS).collect();
        let system = format!(
            "You are a helpful assistant that classifies prompts. \
             Respond ONLY with a valid JSON object containing:\n\
             - suggestedTitle: concise title (max {MAX_SUGGESTED_TITLE_CHARS} chars)\n\
             - category: one of [{}]\n\
             - tags: array of max {MAX_SUGGESTED_TAGS} strings",
            CLASSIFY_CATEGORIES.join(", ")
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .header("X-Vercel-AI-Provider", "openai")
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": format!("Classify this prompt: {excerpt}") }
                ],
                "temperature": 0.3,
                "max_tokens": 150,
                "response_format": { "type": "json_object" }
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "AI gateway returned {}",
                resp.status()
            )));
        }

        let body: ChatResponse = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Upstream("AI gateway returned no choices".to_string()))?;

        Ok(serde_json::from_str(&content)?)
    }
}
