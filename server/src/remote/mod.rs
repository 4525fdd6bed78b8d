//! Remote personal library
//!
//! The contract every personal-library backend fulfils. The server talks to
//! GitHub directly through [`crate::gist::GistLibrary`]; command-line
//! clients and the stdio MCP server go through this server's HTTP API with
//! [`ApiClient`].

pub mod api_client;

pub use api_client::ApiClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::gist::models::{LibraryIndex, NewPrompt, PromptDocument, PromptPatch};

#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// The index document, `None` when the user has none yet
    async fn fetch_index(&self) -> Result<Option<LibraryIndex>>;

    /// A single prompt including its body
    async fn fetch_prompt(&self, gist_id: &str) -> Result<PromptDocument>;

    /// Store a new prompt and register it in the index; returns its id
    async fn create_prompt(&self, prompt: NewPrompt) -> Result<String>;

    /// Apply a partial update to a prompt and its index entry
    async fn update_prompt(&self, gist_id: &str, patch: PromptPatch) -> Result<()>;

    /// Delete a prompt and drop it from the index
    async fn delete_prompt(&self, gist_id: &str) -> Result<()>;
}
