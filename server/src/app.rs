//! Application state and initialization
//!
//! This module builds the shared state handed to every HTTP handler.
//! All services are initialized here and made available through AppState.

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{GithubOAuth, SessionKeys, SessionUser};
use crate::config::{Config, USER_AGENT};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::gist::{GistConnector, GistLibrary, HttpGistConnector};
use crate::mcp::McpSessions;
use crate::services::{Classifier, CommunityService, SubmissionsService};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Repository,
    pub submissions: SubmissionsService,
    pub community: CommunityService,
    pub classifier: Classifier,
    pub oauth: GithubOAuth,
    pub sessions: SessionKeys,
    pub gists: Arc<dyn GistConnector>,
    pub mcp: McpSessions,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        client: Client,
        gists: Arc<dyn GistConnector>,
    ) -> Self {
        let repo = Repository::new(pool);

        Self {
            submissions: SubmissionsService::new(repo.clone()),
            community: CommunityService::new(repo.clone()),
            classifier: Classifier::new(client.clone(), &config),
            oauth: GithubOAuth::new(client, &config),
            sessions: SessionKeys::new(&config.auth_secret),
            gists,
            mcp: McpSessions::new(),
            repo,
            config: Arc::new(config),
        }
    }

    /// Open the database and wire the GitHub-backed services
    pub async fn initialize(config: Config) -> Result<Self> {
        tracing::info!("Initializing application");

        let pool = create_pool(&config.database_path).await?;
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let gists = Arc::new(HttpGistConnector::new(
            client.clone(),
            config.github_api_url.clone(),
        ));

        if config.ai_gateway_key.is_none() {
            tracing::warn!("AI_GATEWAY_API_KEY not set, classification will return mock results");
        }

        tracing::info!("Application initialized successfully");
        Ok(Self::new(config, pool, client, gists))
    }

    /// The personal library of a signed-in user
    pub fn library_for(&self, user: &SessionUser) -> GistLibrary {
        GistLibrary::new(self.gists.connect(&user.access_token))
    }
}
