//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Moderation status of a guest submission
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const SUBMISSION_STATUSES: &[&str] = &["draft", "pending", "approved", "rejected"];

/// A prompt submitted by a guest through the public form
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: String,
    pub text: String,
    pub suggested_title: Option<String>,
    pub category: Option<String>,
    pub tags: Json<Vec<String>>,
    pub guest_name: String,
    pub guest_email: Option<String>,
    /// One of `draft`, `pending`, `approved`, `rejected`
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Create submission request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubmissionRequest {
    pub text: String,
    pub suggested_title: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub guest_name: String,
    pub guest_email: Option<String>,
}

/// A comment attached to a submission or a community prompt
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Discussion {
    pub id: String,
    /// Submission id or community gist id
    pub subject_id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A prompt promoted into the community library
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CuratedPrompt {
    pub id: String,
    pub gist_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Json<Vec<String>>,
    pub author_username: String,
    pub quality_score: f64,
    pub created_at: DateTime<Utc>,
    pub featured: bool,
    pub verified: bool,
}

/// Create curated prompt request
#[derive(Debug, Clone, Default)]
pub struct CreateCuratedRequest {
    pub gist_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author_username: String,
    pub quality_score: f64,
    pub featured: bool,
    pub verified: bool,
}

/// Filters for community discovery
#[derive(Debug, Clone, Default)]
pub struct CuratedQuery {
    pub category: Option<String>,
    pub featured_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// A GitHub user who signed in at least once
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub github_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert user request
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertUserRequest {
    pub github_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// A public gist proposed for the community library
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Nomination {
    pub id: String,
    pub gist_id: String,
    pub title: String,
    pub nominated_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
