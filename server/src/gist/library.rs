//! Gist-backed personal library
//!
//! One private index gist per user enumerates the prompts; every prompt
//! lives in its own gist with a `prompt.md` body and a `metadata.json`.
//! Each mutation of a prompt gist is followed by a read-modify-write of
//! the index. Concurrent writers to the index are not detected.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::client::DocumentStore;
use super::models::*;
use crate::config::{
    GIST_INDEX_DESCRIPTION, GIST_INDEX_FILENAME, GIST_INDEX_VERSION, GIST_METADATA_FILENAME,
    GIST_PROMPT_FILENAME,
};
use crate::error::{AppError, Result};
use crate::remote::RemoteLibrary;

#[derive(Clone)]
pub struct GistLibrary {
    store: Arc<dyn DocumentStore>,
}

impl GistLibrary {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Locate the index gist and parse it
    pub async fn load_index(&self) -> Result<Option<(String, LibraryIndex)>> {
        let gists = self.store.list().await?;
        let Some(summary) = gists
            .into_iter()
            .find(|g| g.files.contains_key(GIST_INDEX_FILENAME))
        else {
            return Ok(None);
        };

        let gist = self.store.get(&summary.id).await?;
        let content = gist.file_content(GIST_INDEX_FILENAME).ok_or_else(|| {
            AppError::Upstream(format!("index gist {} has no content", gist.id))
        })?;

        let index: LibraryIndex = serde_json::from_str(content)?;
        Ok(Some((gist.id, index)))
    }

    /// The index, or an empty one when the user has none yet
    pub async fn index_or_empty(&self) -> Result<LibraryIndex> {
        Ok(self
            .load_index()
            .await?
            .map(|(_, index)| index)
            .unwrap_or_else(|| LibraryIndex::empty(GIST_INDEX_VERSION)))
    }

    /// Write the index, updating `existing_id` or creating a new private gist
    pub async fn save_index(&self, index: &LibraryIndex, existing_id: Option<&str>) -> Result<String> {
        let payload = GistPayload {
            description: Some(GIST_INDEX_DESCRIPTION.to_string()),
            public: Some(false),
            ..Default::default()
        }
        .with_file(GIST_INDEX_FILENAME, serde_json::to_string_pretty(index)?);

        let gist = match existing_id {
            Some(id) => self.store.update(id, &payload).await?,
            None => self.store.create(&payload).await?,
        };

        tracing::debug!("Saved library index {} ({} prompts)", gist.id, index.prompts.len());
        Ok(gist.id)
    }

    /// Load, mutate and save the index in one step
    async fn modify_index<F>(&self, create_if_missing: bool, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut LibraryIndex) -> bool,
    {
        let (existing_id, mut index) = match self.load_index().await? {
            Some((id, index)) => (Some(id), index),
            None if create_if_missing => (None, LibraryIndex::empty(GIST_INDEX_VERSION)),
            None => return Ok(()),
        };

        if mutate(&mut index) {
            index.updated = Utc::now();
            self.save_index(&index, existing_id.as_deref()).await?;
        }

        Ok(())
    }

    /// Create the gist for a prompt without touching the index
    pub async fn create_prompt_gist(&self, prompt: &NewPrompt) -> Result<String> {
        let metadata = PromptMetadata {
            category: prompt.category.clone(),
            tags: prompt.tags.clone(),
            collections: Some(prompt.collections.clone()),
            created: Some(Utc::now()),
            updated: None,
        };

        let payload = GistPayload {
            description: Some(prompt.title.clone()),
            public: Some(prompt.is_public),
            ..Default::default()
        }
        .with_file(GIST_PROMPT_FILENAME, prompt.content.clone())
        .with_file(GIST_METADATA_FILENAME, serde_json::to_string_pretty(&metadata)?);

        let gist = self.store.create(&payload).await?;
        Ok(gist.id)
    }

    /// Patch a prompt gist; metadata fields not in the patch keep their stored value
    pub async fn update_prompt_gist(&self, gist_id: &str, patch: &PromptPatch) -> Result<()> {
        let mut payload = GistPayload {
            description: patch.title.clone(),
            public: patch.is_public,
            ..Default::default()
        };

        if let Some(content) = &patch.content {
            payload = payload.with_file(GIST_PROMPT_FILENAME, content.clone());
        }

        if patch.touches_metadata() {
            let existing = self.get_prompt(gist_id).await?;
            let metadata = PromptMetadata {
                category: patch.category.clone().or(existing.category),
                tags: patch.tags.clone().or(existing.tags),
                collections: patch.collections.clone().or(existing.collections),
                created: None,
                updated: Some(Utc::now()),
            };
            payload = payload.with_file(GIST_METADATA_FILENAME, serde_json::to_string_pretty(&metadata)?);
        }

        self.store.update(gist_id, &payload).await?;
        Ok(())
    }

    /// Read a prompt gist back into a [`PromptDocument`]
    pub async fn get_prompt(&self, gist_id: &str) -> Result<PromptDocument> {
        let gist = self.store.get(gist_id).await?;

        let metadata: PromptMetadata = match gist.file_content(GIST_METADATA_FILENAME) {
            Some(raw) => serde_json::from_str(raw)?,
            None => PromptMetadata::default(),
        };

        Ok(PromptDocument {
            title: gist.description.clone().unwrap_or_default(),
            content: gist
                .file_content(GIST_PROMPT_FILENAME)
                .unwrap_or_default()
                .to_string(),
            category: metadata.category,
            tags: metadata.tags,
            collections: metadata.collections,
            updated_at: gist.updated_at,
            is_public: gist.public,
            gist_id: gist.id,
        })
    }

    /// Create a prompt gist and append it to the index
    pub async fn add_prompt(&self, prompt: NewPrompt) -> Result<String> {
        let gist_id = self.create_prompt_gist(&prompt).await?;
        let now = Utc::now();

        let entry = IndexEntry {
            gist_id: gist_id.clone(),
            title: prompt.title,
            category: prompt.category,
            tags: prompt.tags,
            collection_ids: (!prompt.collections.is_empty()).then_some(prompt.collections),
            created: now,
            updated: now,
            is_public: prompt.is_public,
        };

        self.modify_index(true, |index| {
            index.prompts.push(entry);
            true
        })
        .await?;

        tracing::info!("Added prompt {} to personal library", gist_id);
        Ok(gist_id)
    }

    /// Patch a prompt gist and mirror the change into its index entry
    pub async fn edit_prompt(&self, gist_id: &str, patch: PromptPatch) -> Result<()> {
        self.update_prompt_gist(gist_id, &patch).await?;

        self.modify_index(false, |index| {
            let Some(entry) = index.prompts.iter_mut().find(|p| p.gist_id == gist_id) else {
                return false;
            };
            if let Some(title) = &patch.title {
                entry.title = title.clone();
            }
            if let Some(category) = &patch.category {
                entry.category = Some(category.clone());
            }
            if let Some(tags) = &patch.tags {
                entry.tags = Some(tags.clone());
            }
            if let Some(collections) = &patch.collections {
                entry.collection_ids = Some(collections.clone());
            }
            if let Some(is_public) = patch.is_public {
                entry.is_public = is_public;
            }
            entry.updated = Utc::now();
            true
        })
        .await?;

        tracing::debug!("Updated prompt {}", gist_id);
        Ok(())
    }

    /// Delete a prompt gist and remove its index entry
    pub async fn remove_prompt(&self, gist_id: &str) -> Result<()> {
        self.store.delete(gist_id).await?;

        self.modify_index(false, |index| {
            let before = index.prompts.len();
            index.prompts.retain(|p| p.gist_id != gist_id);
            index.prompts.len() != before
        })
        .await?;

        tracing::info!("Removed prompt {} from personal library", gist_id);
        Ok(())
    }

    /// Copy another gist into the library as a private prompt
    pub async fn fork_prompt(&self, source_gist_id: &str) -> Result<String> {
        let original = self.get_prompt(source_gist_id).await?;

        self.add_prompt(NewPrompt {
            title: format!("Fork of {}", original.title),
            content: original.content,
            category: original.category,
            tags: original.tags,
            collections: original.collections.unwrap_or_default(),
            is_public: false,
        })
        .await
    }
}

#[async_trait]
impl RemoteLibrary for GistLibrary {
    async fn fetch_index(&self) -> Result<Option<LibraryIndex>> {
        Ok(self.load_index().await?.map(|(_, index)| index))
    }

    async fn fetch_prompt(&self, gist_id: &str) -> Result<PromptDocument> {
        self.get_prompt(gist_id).await
    }

    async fn create_prompt(&self, prompt: NewPrompt) -> Result<String> {
        self.add_prompt(prompt).await
    }

    async fn update_prompt(&self, gist_id: &str, patch: PromptPatch) -> Result<()> {
        self.edit_prompt(gist_id, patch).await
    }

    async fn delete_prompt(&self, gist_id: &str) -> Result<()> {
        self.remove_prompt(gist_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gist::memory::MemoryDocumentStore;

    fn library() -> (GistLibrary, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        (GistLibrary::new(store.clone()), store)
    }

    fn new_prompt(title: &str) -> NewPrompt {
        NewPrompt {
            title: title.to_string(),
            content: format!("{title} body"),
            category: Some("Research".to_string()),
            tags: Some(vec!["ai".to_string()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_prompt_creates_private_index() {
        let (library, store) = library();

        assert!(library.load_index().await.unwrap().is_none());

        let gist_id = library.add_prompt(new_prompt("First")).await.unwrap();

        let (index_id, index) = library.load_index().await.unwrap().unwrap();
        assert_eq!(index.version, GIST_INDEX_VERSION);
        assert_eq!(index.prompts.len(), 1);
        assert_eq!(index.prompts[0].gist_id, gist_id);
        assert!(!store.snapshot(&index_id).unwrap().public);

        library.add_prompt(new_prompt("Second")).await.unwrap();
        let (same_id, index) = library.load_index().await.unwrap().unwrap();
        assert_eq!(same_id, index_id);
        assert_eq!(index.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_round_trips_through_two_files() {
        let (library, _) = library();
        let gist_id = library.add_prompt(new_prompt("Review")).await.unwrap();

        let doc = library.get_prompt(&gist_id).await.unwrap();
        assert_eq!(doc.title, "Review");
        assert_eq!(doc.content, "Review body");
        assert_eq!(doc.category.as_deref(), Some("Research"));
        assert_eq!(doc.collections, Some(vec![]));
        assert!(!doc.is_public);
    }

    #[tokio::test]
    async fn test_edit_preserves_unpatched_metadata_and_updates_index() {
        let (library, _) = library();
        let gist_id = library.add_prompt(new_prompt("Review")).await.unwrap();

        library
            .edit_prompt(
                &gist_id,
                PromptPatch {
                    title: Some("Renamed".to_string()),
                    collections: Some(vec!["c1".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let doc = library.get_prompt(&gist_id).await.unwrap();
        assert_eq!(doc.title, "Renamed");
        assert_eq!(doc.category.as_deref(), Some("Research"));
        assert_eq!(doc.tags, Some(vec!["ai".to_string()]));
        assert_eq!(doc.collections, Some(vec!["c1".to_string()]));

        let index = library.index_or_empty().await.unwrap();
        let entry = index.entry(&gist_id).unwrap();
        assert_eq!(entry.title, "Renamed");
        assert_eq!(entry.collection_ids, Some(vec!["c1".to_string()]));
        assert!(entry.updated >= entry.created);
    }

    #[tokio::test]
    async fn test_remove_drops_gist_and_index_entry() {
        let (library, store) = library();
        let keep = library.add_prompt(new_prompt("Keep")).await.unwrap();
        let drop = library.add_prompt(new_prompt("Drop")).await.unwrap();

        library.remove_prompt(&drop).await.unwrap();

        assert!(store.snapshot(&drop).is_none());
        let index = library.index_or_empty().await.unwrap();
        assert!(index.entry(&drop).is_none());
        assert!(index.entry(&keep).is_some());
    }

    #[tokio::test]
    async fn test_fork_is_private_copy() {
        let (library, _) = library();
        let original = library
            .add_prompt(NewPrompt {
                is_public: true,
                ..new_prompt("Shared")
            })
            .await
            .unwrap();

        let fork = library.fork_prompt(&original).await.unwrap();
        assert_ne!(fork, original);

        let doc = library.get_prompt(&fork).await.unwrap();
        assert_eq!(doc.title, "Fork of Shared");
        assert_eq!(doc.content, "Shared body");
        assert!(!doc.is_public);

        let index = library.index_or_empty().await.unwrap();
        assert_eq!(index.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_index_or_empty_without_index() {
        let (library, _) = library();
        let index = library.index_or_empty().await.unwrap();
        assert!(index.prompts.is_empty());
        assert!(index.collections.is_empty());
    }
}
