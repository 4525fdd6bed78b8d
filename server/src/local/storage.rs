//! Durable storage for the local library
//!
//! The library is a single JSON document. Version 2 is the only schema
//! written; unversioned documents from the legacy format (`groups` and a
//! single `groupId` per prompt) are upgraded when read.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::models::{Collection, ImportData, LocalPrompt};
use crate::config::{DEFAULT_CATEGORY, LOCAL_SCHEMA_VERSION};
use crate::error::{AppError, Result};

/// Raw document persistence
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// The stored document, `None` when nothing has been saved yet
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, document: &str) -> Result<()>;

    /// Move an unreadable document aside so the next save cannot replace it.
    /// Returns where it went, if anywhere.
    async fn quarantine(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Document stored in a single file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write to temp file first, then rename over the old document
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(document.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        tracing::debug!("Saved local library to {:?} ({} bytes)", self.path, document.len());
        Ok(())
    }

    async fn quarantine(&self) -> Result<Option<PathBuf>> {
        let Some(name) = self.path.file_name() else {
            return Ok(None);
        };
        let backup = self.path.with_file_name(format!(
            "{}.corrupt-{}",
            name.to_string_lossy(),
            chrono::Utc::now().timestamp_millis()
        ));

        match fs::rename(&self.path, &backup).await {
            Ok(()) => Ok(Some(backup)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Storage kept in memory, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
    quarantined: Mutex<Option<String>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            ..Default::default()
        }
    }

    /// Last saved document
    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Document moved aside by the last quarantine
    pub fn quarantined(&self) -> Option<String> {
        self.quarantined
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Make loads and saves fail
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::Io(std::io::Error::other("storage unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.document())
    }

    async fn save(&self, document: &str) -> Result<()> {
        self.check()?;
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(document.to_string());
        Ok(())
    }

    async fn quarantine(&self) -> Result<Option<PathBuf>> {
        self.check()?;
        let moved = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        *self
            .quarantined
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = moved;
        Ok(None)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredLibrary {
    version: u32,
    #[serde(default)]
    prompts: Vec<LocalPrompt>,
    #[serde(default)]
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPrompt {
    id: String,
    #[serde(default)]
    remote_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    collection_ids: Option<Vec<String>>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Deserialize)]
struct LegacyLibrary {
    #[serde(default)]
    prompts: Vec<LegacyPrompt>,
    #[serde(default)]
    groups: Vec<Collection>,
    #[serde(default)]
    collections: Vec<Collection>,
}

impl From<LegacyPrompt> for LocalPrompt {
    fn from(legacy: LegacyPrompt) -> Self {
        let collection_ids = legacy
            .collection_ids
            .unwrap_or_else(|| legacy.group_id.into_iter().collect());

        Self {
            id: legacy.id,
            remote_id: legacy.remote_id,
            title: legacy.title,
            text: legacy.text,
            category: legacy
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags: legacy.tags,
            collection_ids,
            created_at: legacy.created_at,
            updated_at: legacy.updated_at,
        }
    }
}

/// Parse a stored document of any known schema version
pub fn decode(raw: &str) -> Result<ImportData> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    match value.get("version").and_then(|v| v.as_u64()) {
        Some(v) if v == u64::from(LOCAL_SCHEMA_VERSION) => {
            let stored: StoredLibrary = serde_json::from_value(value)?;
            Ok(ImportData {
                prompts: stored.prompts,
                collections: stored.collections,
            })
        }
        Some(v) => Err(AppError::Validation(format!(
            "unsupported local library version {v}"
        ))),
        None => {
            let legacy: LegacyLibrary = serde_json::from_value(value)?;
            tracing::info!(
                "Upgrading legacy local library ({} prompts, {} groups)",
                legacy.prompts.len(),
                legacy.groups.len()
            );

            let mut collections = legacy.groups;
            collections.extend(legacy.collections);

            Ok(ImportData {
                prompts: legacy.prompts.into_iter().map(LocalPrompt::from).collect(),
                collections,
            })
        }
    }
}

/// Serialize library contents in the current schema
pub fn encode(prompts: &[LocalPrompt], collections: &[Collection]) -> Result<String> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        version: u32,
        prompts: &'a [LocalPrompt],
        collections: &'a [Collection],
    }

    Ok(serde_json::to_string_pretty(&Borrowed {
        version: LOCAL_SCHEMA_VERSION,
        prompts,
        collections,
    })?)
}
