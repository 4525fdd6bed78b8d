//! In-memory document store
//!
//! Behaves like the Gist API for the operations the library uses: updates
//! merge files, list responses omit file contents. Used by tests and by
//! offline development runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::client::{DocumentStore, GistConnector};
use super::models::{Gist, GistFile, GistPayload};
use crate::error::{AppError, Result};

#[derive(Default)]
pub struct MemoryDocumentStore {
    gists: Mutex<BTreeMap<String, Gist>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with an upstream error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct read access for assertions
    pub fn snapshot(&self, id: &str) -> Option<Gist> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Gist>> {
        self.gists.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("document store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self) -> Result<Vec<Gist>> {
        self.check()?;
        Ok(self
            .lock()
            .values()
            .map(|gist| Gist {
                files: gist
                    .files
                    .keys()
                    .map(|name| (name.clone(), GistFile::default()))
                    .collect(),
                ..gist.clone()
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Gist> {
        self.check()?;
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("gist {id}")))
    }

    async fn create(&self, payload: &GistPayload) -> Result<Gist> {
        self.check()?;
        let id = format!("gist-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        let gist = Gist {
            id: id.clone(),
            description: payload.description.clone(),
            public: payload.public.unwrap_or(false),
            files: payload
                .files
                .iter()
                .map(|(name, file)| {
                    (
                        name.clone(),
                        GistFile {
                            content: Some(file.content.clone()),
                        },
                    )
                })
                .collect(),
            updated_at: Some(Utc::now()),
        };

        self.lock().insert(id, gist.clone());
        Ok(gist)
    }

    async fn update(&self, id: &str, payload: &GistPayload) -> Result<Gist> {
        self.check()?;
        let mut gists = self.lock();
        let gist = gists
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("gist {id}")))?;

        if let Some(description) = &payload.description {
            gist.description = Some(description.clone());
        }
        if let Some(public) = payload.public {
            gist.public = public;
        }
        for (name, file) in &payload.files {
            gist.files.insert(
                name.clone(),
                GistFile {
                    content: Some(file.content.clone()),
                },
            );
        }
        gist.updated_at = Some(Utc::now());

        Ok(gist.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check()?;
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("gist {id}")))
    }
}

/// Connector that hands out the same shared in-memory store for every token
#[derive(Clone, Default)]
pub struct MemoryGistConnector {
    store: Arc<MemoryDocumentStore>,
}

impl MemoryGistConnector {
    pub fn new(store: Arc<MemoryDocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryDocumentStore> {
        self.store.clone()
    }
}

impl GistConnector for MemoryGistConnector {
    fn connect(&self, _access_token: &str) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }
}
