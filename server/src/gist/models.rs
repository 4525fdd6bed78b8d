//! Gist wire models and the personal library document formats
//!
//! `Gist`/`GistFile`/`GistPayload` mirror the GitHub REST API. The index
//! and prompt documents are what this application stores inside gists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A gist as returned by the GitHub API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub files: HashMap<String, GistFile>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Gist {
    /// Content of a named file; list responses carry no content
    pub fn file_content(&self, name: &str) -> Option<&str> {
        self.files.get(name).and_then(|f| f.content.as_deref())
    }
}

/// One file inside a gist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub content: Option<String>,
}

/// Body of a create or update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GistPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    pub files: BTreeMap<String, FileContent>,
}

impl GistPayload {
    pub fn with_file(mut self, name: &str, content: String) -> Self {
        self.files.insert(name.to_string(), FileContent { content });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

/// The per-user index of personal prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryIndex {
    pub version: u32,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub collections: Vec<IndexCollection>,
    #[serde(default)]
    pub prompts: Vec<IndexEntry>,
}

impl LibraryIndex {
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            updated: Utc::now(),
            collections: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub fn entry(&self, gist_id: &str) -> Option<&IndexEntry> {
        self.prompts.iter().find(|p| p.gist_id == gist_id)
    }
}

/// Collection descriptor stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCollection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Prompt metadata stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub gist_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_ids: Option<Vec<String>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
}

/// A personal prompt read back from its gist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDocument {
    pub gist_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub collections: Option<Vec<String>>,
    #[serde(rename = "updated_at", default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub is_public: bool,
}

/// Contents of `metadata.json` inside a prompt gist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// A prompt to be stored as a new gist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update of a prompt gist; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl PromptPatch {
    pub fn touches_metadata(&self) -> bool {
        self.category.is_some() || self.tags.is_some() || self.collections.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == PromptPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_uses_camel_case_keys() {
        let raw = r#"{
            "version": 1,
            "updated": "2024-05-01T10:00:00Z",
            "prompts": [{
                "gistId": "abc",
                "title": "Review",
                "collectionIds": ["c1"],
                "created": "2024-05-01T09:00:00Z",
                "updated": "2024-05-01T10:00:00Z",
                "isPublic": true
            }]
        }"#;

        let index: LibraryIndex = serde_json::from_str(raw).unwrap();
        assert!(index.collections.is_empty());

        let entry = index.entry("abc").unwrap();
        assert_eq!(entry.collection_ids.as_deref(), Some(&["c1".to_string()][..]));
        assert!(entry.is_public);
        assert!(entry.category.is_none());

        let out = serde_json::to_value(&index).unwrap();
        assert_eq!(out["prompts"][0]["gistId"], "abc");
        assert!(out["prompts"][0].get("category").is_none());
    }

    #[test]
    fn test_payload_omits_unset_fields() {
        let payload = GistPayload::default().with_file("prompt.md", "body".to_string());
        let out = serde_json::to_value(&payload).unwrap();

        assert!(out.get("description").is_none());
        assert!(out.get("public").is_none());
        assert_eq!(out["files"]["prompt.md"]["content"], "body");
    }

    #[test]
    fn test_patch_detects_metadata_changes() {
        let title_only = PromptPatch {
            title: Some("New".to_string()),
            ..Default::default()
        };
        assert!(!title_only.touches_metadata());
        assert!(!title_only.is_empty());

        let tags = PromptPatch {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(tags.touches_metadata());
        assert!(PromptPatch::default().is_empty());
    }
}
