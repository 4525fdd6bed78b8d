//! Merge of the remote library index into local state
//!
//! Last write wins on the `updated` timestamp, local wins ties. Remote
//! entries never delete local records and never replace a local body.

use uuid::Uuid;

use super::models::{Collection, LocalPrompt};
use crate::config::{DEFAULT_CATEGORY, DEFAULT_COLLECTION_COLOR};
use crate::gist::models::{IndexEntry, LibraryIndex};

/// What a reconciliation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub collections_added: usize,
    pub prompts_added: usize,
    pub prompts_updated: usize,
    pub prompts_unchanged: usize,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.collections_added + self.prompts_added + self.prompts_updated > 0
    }
}

/// Apply `index` to the local prompts and collections in place
pub fn reconcile(
    prompts: &mut Vec<LocalPrompt>,
    collections: &mut Vec<Collection>,
    index: &LibraryIndex,
    now_ms: i64,
) -> SyncReport {
    let mut report = SyncReport::default();

    for remote in &index.collections {
        if collections.iter().any(|c| c.id == remote.id) {
            continue;
        }
        collections.push(Collection {
            id: remote.id.clone(),
            name: remote.name.clone(),
            description: None,
            color: Some(
                remote
                    .color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_COLLECTION_COLOR.to_string()),
            ),
            created_at: now_ms,
        });
        report.collections_added += 1;
    }

    let known = |ids: &[String]| -> Vec<String> {
        ids.iter()
            .filter(|id| collections.iter().any(|c| &c.id == *id))
            .cloned()
            .collect()
    };

    for entry in &index.prompts {
        let remote_updated = entry.updated.timestamp_millis();
        let membership = known(entry.collection_ids.as_deref().unwrap_or_default());

        match prompts
            .iter_mut()
            .find(|p| p.remote_id.as_deref() == Some(entry.gist_id.as_str()))
        {
            Some(local) if remote_updated > local.updated_at => {
                apply_entry(local, entry, membership);
                local.updated_at = remote_updated;
                report.prompts_updated += 1;
            }
            Some(_) => report.prompts_unchanged += 1,
            None => {
                let mut local = LocalPrompt {
                    id: Uuid::new_v4().to_string(),
                    remote_id: Some(entry.gist_id.clone()),
                    title: None,
                    text: String::new(),
                    category: DEFAULT_CATEGORY.to_string(),
                    tags: Vec::new(),
                    collection_ids: Vec::new(),
                    created_at: entry.created.timestamp_millis(),
                    updated_at: remote_updated,
                };
                apply_entry(&mut local, entry, membership);
                prompts.push(local);
                report.prompts_added += 1;
            }
        }
    }

    report
}

fn apply_entry(local: &mut LocalPrompt, entry: &IndexEntry, membership: Vec<String>) {
    local.title = (!entry.title.is_empty()).then(|| entry.title.clone());
    local.category = entry
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    local.tags = entry.tags.clone().unwrap_or_default();
    local.collection_ids = membership;
}
