//! Application configuration
//!
//! Central location for configuration constants, resource limits and
//! validation boundaries, plus the runtime [`Config`] read from the
//! environment.

use crate::error::{AppError, Result};
use std::path::PathBuf;

// ===== Local Library =====

/// Category assigned to prompts created without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Accent color given to collections synced from a remote index without a color
pub const DEFAULT_COLLECTION_COLOR: &str = "#8b5c2e";

/// File name of the local library document
pub const LOCAL_STORE_FILENAME: &str = "anon-prompts.json";

/// Current local storage schema version
pub const LOCAL_SCHEMA_VERSION: u32 = 2;

// ===== Gist Library =====

/// File holding the library index inside the index gist
pub const GIST_INDEX_FILENAME: &str = "favored-prompts-index.json";

/// Description of the index gist
pub const GIST_INDEX_DESCRIPTION: &str = "Favored Prompts - Library Index";

/// File holding the prompt body inside a prompt gist
pub const GIST_PROMPT_FILENAME: &str = "prompt.md";

/// File holding the prompt metadata inside a prompt gist
pub const GIST_METADATA_FILENAME: &str = "metadata.json";

/// Version written into freshly created index documents
pub const GIST_INDEX_VERSION: u32 = 1;

/// Gists requested per page when listing (GitHub's maximum)
pub const GIST_LIST_PAGE_SIZE: u32 = 100;

/// GitHub REST API version header value
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// User agent sent to GitHub (required by the API)
pub const USER_AGENT: &str = "favored-prompts";

/// OAuth scopes requested at login
pub const GITHUB_OAUTH_SCOPE: &str = "gist,read:user,user:email";

// ===== Sessions =====

/// Cookie holding the signed session
pub const SESSION_COOKIE: &str = "session";

/// Cookie holding the OAuth state nonce
pub const OAUTH_STATE_COOKIE: &str = "github_oauth_state";

/// Header carrying the session value for API clients
pub const API_KEY_HEADER: &str = "x-api-key";

/// Session lifetime in seconds (30 days)
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// OAuth state cookie lifetime in seconds (10 minutes)
pub const OAUTH_STATE_MAX_AGE_SECS: i64 = 60 * 10;

// ===== Classification =====

/// Shortest text accepted by the classifier
pub const MIN_CLASSIFY_TEXT_LENGTH: usize = 10;

/// Characters of prompt text forwarded to the gateway
pub const MAX_CLASSIFY_TEXT_CHARS: usize = 500;

/// Maximum suggested title length in characters
pub const MAX_SUGGESTED_TITLE_CHARS: usize = 60;

/// Maximum number of suggested tags
pub const MAX_SUGGESTED_TAGS: usize = 5;

/// Categories the classifier is asked to choose from
pub const CLASSIFY_CATEGORIES: &[&str] = &[
    "Code Review",
    "Research",
    "Writing",
    "Education",
    "Business",
    "Lifestyle",
    "Creative",
];

/// Marker found in the unconfigured example key
pub const PLACEHOLDER_GATEWAY_KEY: &str = "your_vercel_ai_gateway_key";

// ===== Community =====

/// Page size for community discovery when none is given
pub const DEFAULT_DISCOVER_LIMIT: i64 = 20;

/// Largest page size accepted for community discovery
pub const MAX_DISCOVER_LIMIT: i64 = 100;

// ===== MCP =====

/// Server name reported to MCP clients
pub const MCP_SERVER_NAME: &str = "favored-prompts";

/// MCP protocol revision implemented by the tool server
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Environment variable holding the API key for the stdio MCP server
pub const MCP_API_KEY_ENV: &str = "FAVORED_PROMPTS_API_KEY";

/// Environment variable holding the server URL for the stdio MCP server
pub const MCP_BASE_URL_ENV: &str = "FAVORED_PROMPTS_BASE_URL";

/// Server URL used by API clients when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Runtime configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub public_base_url: String,
    pub database_path: PathBuf,
    pub auth_secret: String,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_api_url: String,
    pub github_oauth_url: String,
    pub ai_gateway_key: Option<String>,
    pub ai_gateway_url: String,
    pub ai_gateway_model: String,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// `AUTH_SECRET` is required; every other value has a development default.
    pub fn from_env() -> Result<Self> {
        let auth_secret = env_or("AUTH_SECRET", "");
        if auth_secret.is_empty() {
            return Err(AppError::Config(
                "AUTH_SECRET environment variable is not set".to_string(),
            ));
        }

        Ok(Self {
            bind_addr: env_or("FAVORED_BIND_ADDR", "127.0.0.1:5173"),
            public_base_url: env_or("PUBLIC_BASE_URL", DEFAULT_BASE_URL),
            database_path: PathBuf::from(env_or("DATABASE_PATH", "favored-prompts.db")),
            auth_secret,
            github_client_id: env_or("GITHUB_CLIENT_ID", ""),
            github_client_secret: env_or("GITHUB_CLIENT_SECRET", ""),
            github_api_url: env_or("GITHUB_API_URL", "https://api.github.com"),
            github_oauth_url: env_or("GITHUB_OAUTH_URL", "https://github.com"),
            ai_gateway_key: std::env::var("AI_GATEWAY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ai_gateway_url: env_or(
                "AI_GATEWAY_URL",
                "https://gateway.ai.vercel.com/v1/chat/completions",
            ),
            ai_gateway_model: env_or("AI_GATEWAY_MODEL", "gpt-4o-mini"),
        })
    }

    /// Configuration for tests: in-memory friendly defaults and a fixed secret.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            public_base_url: DEFAULT_BASE_URL.to_string(),
            database_path: PathBuf::from(":memory:"),
            auth_secret: "test-secret".to_string(),
            github_client_id: "client-id".to_string(),
            github_client_secret: "client-secret".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            github_oauth_url: "https://github.com".to_string(),
            ai_gateway_key: None,
            ai_gateway_url: "https://gateway.ai.vercel.com/v1/chat/completions".to_string(),
            ai_gateway_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Default location of the local library file
pub fn default_local_store_path() -> PathBuf {
    std::env::var("FAVORED_LOCAL_STORE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(LOCAL_STORE_FILENAME))
}
