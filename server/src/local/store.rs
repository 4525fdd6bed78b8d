//! Local prompt store
//!
//! State lives in a `watch` channel: named operations are the only writers
//! and every change is published to subscribers. The document is persisted
//! after each mutation. When a remote library is connected, writes are
//! mirrored to it through the per-record [`WriteQueue`].

use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use super::models::*;
use super::queue::WriteQueue;
use super::storage::{self, LocalStorage};
use super::sync::{reconcile, SyncReport};
use crate::config::{DEFAULT_CATEGORY, GIST_INDEX_VERSION, MAX_SUGGESTED_TITLE_CHARS};
use crate::error::{AppError, Result};
use crate::gist::models::{LibraryIndex, NewPrompt, PromptPatch};
use crate::remote::RemoteLibrary;

/// Counts of records an import added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub prompts: usize,
    pub collections: usize,
}

struct Inner {
    state: watch::Sender<LibraryState>,
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    queue: WriteQueue,
    remote: RwLock<Option<Arc<dyn RemoteLibrary>>>,
    save_lock: Mutex<()>,
}

#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

impl LocalStore {
    /// Load the library from storage.
    ///
    /// Unreadable documents are logged and the store starts empty; a
    /// document that fails to decode is quarantined first so later saves
    /// do not replace it. The store always reports itself loaded afterwards.
    pub async fn open(storage: Arc<dyn LocalStorage>, clock: Arc<dyn Clock>) -> Self {
        let mut state = LibraryState::default();

        match storage.load().await {
            Ok(Some(raw)) => match storage::decode(&raw) {
                Ok(data) => {
                    tracing::info!(
                        "Loaded local library: {} prompts, {} collections",
                        data.prompts.len(),
                        data.collections.len()
                    );
                    state.collections = data.collections;
                    state.prompts = data.prompts;
                    for i in 0..state.prompts.len() {
                        let ids = std::mem::take(&mut state.prompts[i].collection_ids);
                        state.prompts[i].collection_ids = known_collections(&state, ids);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to decode local library: {}", e);
                    match storage.quarantine().await {
                        Ok(Some(path)) => {
                            tracing::warn!("Unreadable local library moved to {:?}", path)
                        }
                        Ok(None) => tracing::warn!("Unreadable local library set aside"),
                        Err(e) => tracing::error!("Failed to set aside local library: {}", e),
                    }
                }
            },
            Ok(None) => tracing::debug!("No local library yet, starting empty"),
            Err(e) => tracing::error!("Failed to load local library: {}", e),
        }
        state.is_loaded = true;

        let (tx, _) = watch::channel(state);

        Self {
            inner: Arc::new(Inner {
                state: tx,
                storage,
                clock,
                queue: WriteQueue::new(),
                remote: RwLock::new(None),
                save_lock: Mutex::new(()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> LibraryState {
        self.inner.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.remote().is_some()
    }

    /// Wait for every queued remote write to finish
    pub async fn flush(&self) {
        self.inner.queue.wait_idle().await;
    }

    fn now(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    fn remote(&self) -> Option<Arc<dyn RemoteLibrary>> {
        self.inner
            .remote
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Apply `f` to the state; subscribers are notified only when it returns `Some`
    fn modify<R>(&self, f: impl FnOnce(&mut LibraryState) -> Option<R>) -> Option<R> {
        let mut out = None;
        self.inner.state.send_if_modified(|state| {
            out = f(state);
            out.is_some()
        });
        out
    }

    async fn persist(&self) {
        let _guard = self.inner.save_lock.lock().await;

        let document = {
            let state = self.inner.state.borrow();
            storage::encode(&state.prompts, &state.collections)
        };

        let result = match document {
            Ok(document) => self.inner.storage.save(&document).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!("Failed to save local library: {}", e);
        }
    }

    /// Create a prompt and, when connected, its remote copy
    pub async fn add_prompt(
        &self,
        text: impl Into<String>,
        category: Option<String>,
        tags: Vec<String>,
        collection_ids: Vec<String>,
    ) -> LocalPrompt {
        let now = self.now();
        let mut prompt = LocalPrompt {
            id: Uuid::new_v4().to_string(),
            remote_id: None,
            title: None,
            text: text.into(),
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags,
            collection_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.inner.state.send_modify(|state| {
            prompt.collection_ids = known_collections(state, collection_ids);
            state.prompts.insert(0, prompt.clone());
        });

        tracing::debug!("Added local prompt {}", prompt.id);
        self.persist().await;

        if let Some(remote) = self.remote() {
            self.queue_create(remote, prompt.id.clone());
        }

        prompt
    }

    /// Merge `patch` into a prompt and bump its update stamp
    pub async fn update_prompt(&self, id: &str, patch: LocalPromptPatch) -> Result<LocalPrompt> {
        let now = self.now();

        let updated = self
            .modify(|state| {
                let collection_ids = patch
                    .collection_ids
                    .clone()
                    .map(|ids| known_collections(state, ids));
                let prompt = state.prompts.iter_mut().find(|p| p.id == id)?;

                if let Some(text) = &patch.text {
                    prompt.text = text.clone();
                }
                if let Some(title) = &patch.title {
                    prompt.title = Some(title.clone());
                }
                if let Some(category) = &patch.category {
                    prompt.category = category.clone();
                }
                if let Some(tags) = &patch.tags {
                    prompt.tags = tags.clone();
                }
                if let Some(ids) = collection_ids {
                    prompt.collection_ids = ids;
                }
                prompt.touch(now);
                Some(prompt.clone())
            })
            .ok_or_else(|| AppError::NotFound(format!("local prompt {id}")))?;

        tracing::debug!("Updated local prompt {}", id);
        self.persist().await;

        if let Some(remote) = self.remote() {
            let remote_patch = PromptPatch {
                title: patch.title,
                content: patch.text,
                category: patch.category,
                tags: patch.tags,
                collections: patch.collection_ids.map(|_| updated.collection_ids.clone()),
                is_public: None,
            };
            if !remote_patch.is_empty() {
                self.queue_update(remote, id.to_string(), remote_patch);
            }
        }

        Ok(updated)
    }

    /// Remove a prompt locally and delete its remote copy, if any
    pub async fn delete_prompt(&self, id: &str) -> Result<()> {
        let removed = self
            .modify(|state| {
                let pos = state.prompts.iter().position(|p| p.id == id)?;
                Some(state.prompts.remove(pos))
            })
            .ok_or_else(|| AppError::NotFound(format!("local prompt {id}")))?;

        tracing::debug!("Deleted local prompt {}", id);
        self.persist().await;

        if let (Some(remote), Some(remote_id)) = (self.remote(), removed.remote_id) {
            self.inner.queue.enqueue(id, async move {
                match remote.delete_prompt(&remote_id).await {
                    Ok(()) => tracing::debug!("Deleted remote prompt {}", remote_id),
                    Err(e) => tracing::warn!("Failed to delete remote prompt {}: {}", remote_id, e),
                }
            });
        }

        Ok(())
    }

    pub async fn create_collection(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<Collection> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation("Collection name is required".to_string()));
        }

        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            color,
            created_at: self.now(),
        };

        self.inner
            .state
            .send_modify(|state| state.collections.push(collection.clone()));

        tracing::debug!("Created collection {}", collection.id);
        self.persist().await;
        Ok(collection)
    }

    /// Delete a collection and strip it from every prompt's membership
    pub async fn delete_collection(&self, id: &str) -> Result<()> {
        self.modify(|state| {
            let pos = state.collections.iter().position(|c| c.id == id)?;
            state.collections.remove(pos);
            for prompt in &mut state.prompts {
                prompt.collection_ids.retain(|c| c != id);
            }
            Some(())
        })
        .ok_or_else(|| AppError::NotFound(format!("collection {id}")))?;

        tracing::debug!("Deleted collection {}", id);
        self.persist().await;
        Ok(())
    }

    /// Add the prompt to the collection, or remove it if already a member
    pub async fn toggle_collection(&self, prompt_id: &str, collection_id: &str) -> Result<LocalPrompt> {
        let current = self.snapshot();
        if !current.has_collection(collection_id) {
            return Err(AppError::NotFound(format!("collection {collection_id}")));
        }
        let prompt = current
            .prompt(prompt_id)
            .ok_or_else(|| AppError::NotFound(format!("local prompt {prompt_id}")))?;

        let mut membership = prompt.collection_ids.clone();
        if membership.iter().any(|c| c == collection_id) {
            membership.retain(|c| c != collection_id);
        } else {
            membership.push(collection_id.to_string());
        }

        self.update_prompt(
            prompt_id,
            LocalPromptPatch {
                collection_ids: Some(membership),
                ..Default::default()
            },
        )
        .await
    }

    /// Merge exported data; existing ids are never overwritten
    pub async fn import_data(&self, data: ImportData) -> ImportSummary {
        let summary = self
            .modify(|state| {
                let mut collections = Vec::new();
                for collection in data.collections {
                    let seen = state.has_collection(&collection.id)
                        || collections.iter().any(|c: &Collection| c.id == collection.id);
                    if !seen {
                        collections.push(collection);
                    }
                }

                let mut prompts = Vec::new();
                for prompt in data.prompts {
                    let seen = state.prompt(&prompt.id).is_some()
                        || prompts.iter().any(|p: &LocalPrompt| p.id == prompt.id);
                    if !seen {
                        prompts.push(prompt);
                    }
                }

                let summary = ImportSummary {
                    prompts: prompts.len(),
                    collections: collections.len(),
                };
                if summary == ImportSummary::default() {
                    return None;
                }

                collections.append(&mut state.collections);
                state.collections = collections;

                for prompt in &mut prompts {
                    let ids = std::mem::take(&mut prompt.collection_ids);
                    prompt.collection_ids = known_collections(state, ids);
                }
                prompts.append(&mut state.prompts);
                state.prompts = prompts;

                Some(summary)
            })
            .unwrap_or_default();

        if summary != ImportSummary::default() {
            tracing::info!(
                "Imported {} prompts and {} collections",
                summary.prompts,
                summary.collections
            );
            self.persist().await;
        }

        summary
    }

    /// Fetch the body of a prompt that arrived through sync without one
    pub async fn hydrate_prompt(&self, id: &str) -> Result<LocalPrompt> {
        let prompt = self
            .snapshot()
            .prompt(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("local prompt {id}")))?;

        let (Some(remote_id), true) = (prompt.remote_id.clone(), prompt.text.is_empty()) else {
            return Ok(prompt);
        };

        let remote = self
            .remote()
            .ok_or_else(|| AppError::Validation("Not connected to a remote library".to_string()))?;

        let document = remote.fetch_prompt(&remote_id).await?;

        let hydrated = self
            .modify(|state| {
                let prompt = state.prompts.iter_mut().find(|p| p.id == id)?;
                if !prompt.text.is_empty() {
                    return None;
                }
                prompt.text = document.content;
                Some(prompt.clone())
            })
            .or_else(|| self.snapshot().prompt(id).cloned())
            .ok_or_else(|| AppError::NotFound(format!("local prompt {id}")))?;

        tracing::debug!("Hydrated local prompt {} from {}", id, remote_id);
        self.persist().await;
        Ok(hydrated)
    }

    /// Prompts matching `query` in text, title, category or tags
    pub fn search(&self, query: &str) -> Vec<LocalPrompt> {
        let query = query.trim();
        let state = self.inner.state.borrow();
        state
            .prompts
            .iter()
            .filter(|p| query.is_empty() || p.matches(query))
            .cloned()
            .collect()
    }

    pub fn export(&self) -> ImportData {
        let state = self.inner.state.borrow();
        ImportData {
            prompts: state.prompts.clone(),
            collections: state.collections.clone(),
        }
    }

    /// Attach a remote library.
    ///
    /// Reconciliation runs only when going from disconnected to connected;
    /// it returns `None` when it did not run or the index fetch failed.
    pub async fn connect(&self, remote: Arc<dyn RemoteLibrary>) -> Option<SyncReport> {
        let was_connected = self
            .inner
            .remote
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .replace(remote.clone())
            .is_some();

        if was_connected {
            return None;
        }

        tracing::info!("Remote library connected, syncing");
        self.modify(|state| {
            state.is_syncing = true;
            Some(())
        });

        let index = match remote.fetch_index().await {
            Ok(index) => index.unwrap_or_else(|| LibraryIndex::empty(GIST_INDEX_VERSION)),
            Err(e) => {
                tracing::warn!("Sync aborted, could not fetch remote index: {}", e);
                self.modify(|state| {
                    state.is_syncing = false;
                    Some(())
                });
                return None;
            }
        };

        let now = self.now();
        let report = self
            .modify(|state| {
                let report = reconcile(&mut state.prompts, &mut state.collections, &index, now);
                state.is_syncing = false;
                Some(report)
            })
            .unwrap_or_default();

        tracing::info!(
            "Sync complete: {} collections added, {} prompts added, {} updated, {} unchanged",
            report.collections_added,
            report.prompts_added,
            report.prompts_updated,
            report.prompts_unchanged
        );

        if report.changed() {
            self.persist().await;
        }

        Some(report)
    }

    /// Detach the remote library; queued writes still complete
    pub fn disconnect(&self) {
        if self
            .inner
            .remote
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .is_some()
        {
            tracing::info!("Remote library disconnected");
        }
    }

    fn queue_create(&self, remote: Arc<dyn RemoteLibrary>, id: String) {
        let store = self.clone();
        let key = id.clone();

        self.inner.queue.enqueue(&key, async move {
            let Some(prompt) = store.snapshot().prompt(&id).cloned() else {
                tracing::debug!("Prompt {} deleted before remote create", id);
                return;
            };

            let new_prompt = NewPrompt {
                title: remote_title(&prompt),
                content: prompt.text,
                category: Some(prompt.category),
                tags: Some(prompt.tags),
                collections: prompt.collection_ids,
                is_public: false,
            };

            let remote_id = match remote.create_prompt(new_prompt).await {
                Ok(remote_id) => remote_id,
                Err(e) => {
                    tracing::warn!("Failed to create remote prompt for {}: {}", id, e);
                    return;
                }
            };

            let attached = store.modify(|state| {
                let prompt = state.prompts.iter_mut().find(|p| p.id == id)?;
                prompt.remote_id = Some(remote_id.clone());
                Some(())
            });

            match attached {
                Some(()) => {
                    tracing::debug!("Linked local prompt {} to remote {}", id, remote_id);
                    store.persist().await;
                }
                None => {
                    // Deleted while the create was in flight; the delete had
                    // no remote id to queue, so drop the new copy here
                    tracing::debug!(
                        "Prompt {} deleted while remote {} was being created",
                        id,
                        remote_id
                    );
                    match remote.delete_prompt(&remote_id).await {
                        Ok(()) => tracing::debug!("Deleted orphaned remote prompt {}", remote_id),
                        Err(e) => tracing::warn!(
                            "Failed to delete orphaned remote prompt {}: {}",
                            remote_id,
                            e
                        ),
                    }
                }
            }
        });
    }

    fn queue_update(&self, remote: Arc<dyn RemoteLibrary>, id: String, patch: PromptPatch) {
        let store = self.clone();
        let key = id.clone();

        self.inner.queue.enqueue(&key, async move {
            let Some(remote_id) = store.snapshot().prompt(&id).and_then(|p| p.remote_id.clone())
            else {
                tracing::debug!("Prompt {} has no remote copy, skipping update", id);
                return;
            };

            if let Err(e) = remote.update_prompt(&remote_id, patch).await {
                tracing::warn!("Failed to update remote prompt {}: {}", remote_id, e);
            }
        });
    }
}

/// Keep only ids of existing collections, without duplicates
fn known_collections(state: &LibraryState, ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if state.has_collection(&id) && !out.contains(&id) {
            out.push(id);
        } else if !state.has_collection(&id) {
            tracing::debug!("Dropping unknown collection id {}", id);
        }
    }
    out
}

/// Title for the remote copy: the local title or the first line of text
fn remote_title(prompt: &LocalPrompt) -> String {
    if let Some(title) = prompt.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return title.to_string();
    }
    let first_line = prompt.text.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return "Untitled prompt".to_string();
    }
    first_line.chars().take(MAX_SUGGESTED_TITLE_CHARS).collect()
}
