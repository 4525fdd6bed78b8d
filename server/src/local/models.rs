//! Local library models
//!
//! Timestamps are milliseconds since the Unix epoch.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// A prompt owned by the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPrompt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LocalPrompt {
    /// Set the update stamp without ever moving it backwards
    pub fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now);
    }

    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.text.to_lowercase().contains(&needle)
            || self
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
            || self.category.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// A named grouping of local prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: i64,
}

/// Snapshot published to store subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryState {
    pub prompts: Vec<LocalPrompt>,
    pub collections: Vec<Collection>,
    pub is_loaded: bool,
    pub is_syncing: bool,
}

impl LibraryState {
    pub fn prompt(&self, id: &str) -> Option<&LocalPrompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn has_collection(&self, id: &str) -> bool {
        self.collections.iter().any(|c| c.id == id)
    }
}

/// Portable library contents used by import and export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub prompts: Vec<LocalPrompt>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// Fields to change on a local prompt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPromptPatch {
    pub text: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub collection_ids: Option<Vec<String>>,
}

/// Time source for the local store
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> LocalPrompt {
        LocalPrompt {
            id: "p1".to_string(),
            remote_id: None,
            title: Some("Code Review".to_string()),
            text: "Review this diff".to_string(),
            category: "General".to_string(),
            tags: vec!["Rust".to_string()],
            collection_ids: vec![],
            created_at: 10,
            updated_at: 100,
        }
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut p = prompt();
        p.touch(50);
        assert_eq!(p.updated_at, 100);
        p.touch(150);
        assert_eq!(p.updated_at, 150);
    }

    #[test]
    fn test_matches_is_case_insensitive_across_fields() {
        let p = prompt();
        assert!(p.matches("DIFF"));
        assert!(p.matches("code review"));
        assert!(p.matches("general"));
        assert!(p.matches("rust"));
        assert!(!p.matches("python"));
    }

    #[test]
    fn test_serializes_camel_case_without_empty_options() {
        let value = serde_json::to_value(prompt()).unwrap();
        assert_eq!(value["collectionIds"], serde_json::json!([]));
        assert_eq!(value["updatedAt"], 100);
        assert!(value.get("remoteId").is_none());
    }
}
