//! Repository layer for database operations
//!
//! CRUD operations for submissions, discussions, users, nominations and
//! curated community prompts.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a guest submission in `pending` state
    pub async fn create_submission(&self, req: CreateSubmissionRequest) -> Result<Submission> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions
                (id, text, suggested_title, category, tags, guest_name, guest_email, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.text)
        .bind(&req.suggested_title)
        .bind(&req.category)
        .bind(Json(&req.tags))
        .bind(&req.guest_name)
        .bind(&req.guest_email)
        .bind(STATUS_PENDING)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created submission: {}", id);
        Ok(submission)
    }

    /// Get a submission by ID
    pub async fn get_submission(&self, id: &str) -> Result<Submission> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("prompt {id}")))
    }

    /// List approved submissions, newest first
    pub async fn list_approved_submissions(&self) -> Result<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE status = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(STATUS_APPROVED)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    /// Change the moderation status of a submission
    pub async fn set_submission_status(&self, id: &str, status: &str) -> Result<Submission> {
        if !SUBMISSION_STATUSES.contains(&status) {
            return Err(AppError::Validation(format!("unknown status: {status}")));
        }

        let rows = sqlx::query("UPDATE submissions SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("prompt {id}")));
        }

        tracing::debug!("Set submission {} status to {}", id, status);
        self.get_submission(id).await
    }

    /// Append a comment to a submission or community prompt thread
    pub async fn add_discussion(
        &self,
        subject_id: &str,
        author: &str,
        text: &str,
    ) -> Result<Discussion> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let discussion = sqlx::query_as::<_, Discussion>(
            r#"
            INSERT INTO discussions (id, subject_id, author, text, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(subject_id)
        .bind(author)
        .bind(text)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Added discussion {} to {}", id, subject_id);
        Ok(discussion)
    }

    /// List the thread for a subject, oldest first
    pub async fn list_discussions(&self, subject_id: &str) -> Result<Vec<Discussion>> {
        let discussions = sqlx::query_as::<_, Discussion>(
            r#"
            SELECT * FROM discussions
            WHERE subject_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(discussions)
    }

    /// Insert or refresh a user keyed by GitHub id
    pub async fn upsert_user(&self, req: UpsertUserRequest) -> Result<User> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (github_id, username, name, email, avatar_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(github_id) DO UPDATE SET
                username = excluded.username,
                name = excluded.name,
                email = excluded.email,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(req.github_id)
        .bind(&req.username)
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.avatar_url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Upserted user: {}", user.username);
        Ok(user)
    }

    /// Record a nomination of a public gist
    pub async fn create_nomination(
        &self,
        gist_id: &str,
        title: &str,
        nominated_by: &str,
    ) -> Result<Nomination> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let nomination = sqlx::query_as::<_, Nomination>(
            r#"
            INSERT INTO nominations (id, gist_id, title, nominated_by, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(gist_id)
        .bind(title)
        .bind(nominated_by)
        .bind(STATUS_PENDING)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Recorded nomination {} for gist {}", id, gist_id);
        Ok(nomination)
    }

    /// Get a nomination by ID
    pub async fn get_nomination(&self, id: &str) -> Result<Nomination> {
        sqlx::query_as::<_, Nomination>("SELECT * FROM nominations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("nomination {id}")))
    }

    /// Mark a nomination with a new status
    pub async fn set_nomination_status(&self, id: &str, status: &str) -> Result<()> {
        sqlx::query("UPDATE nominations SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Add a prompt to the community library
    pub async fn create_curated_prompt(&self, req: CreateCuratedRequest) -> Result<CuratedPrompt> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let curated = sqlx::query_as::<_, CuratedPrompt>(
            r#"
            INSERT INTO curated_prompts
                (id, gist_id, title, description, category, tags, author_username,
                 quality_score, created_at, featured, verified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.gist_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(Json(&req.tags))
        .bind(&req.author_username)
        .bind(req.quality_score)
        .bind(now)
        .bind(req.featured)
        .bind(req.verified)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Curated gist {} as {}", req.gist_id, id);
        Ok(curated)
    }

    /// Look up a community prompt by its gist id
    pub async fn get_curated_by_gist_id(&self, gist_id: &str) -> Result<Option<CuratedPrompt>> {
        let curated =
            sqlx::query_as::<_, CuratedPrompt>("SELECT * FROM curated_prompts WHERE gist_id = ?")
                .bind(gist_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(curated)
    }

    /// List community prompts, featured and highest scored first
    pub async fn list_curated(&self, query: &CuratedQuery) -> Result<Vec<CuratedPrompt>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM curated_prompts WHERE 1 = 1");

        if let Some(category) = &query.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }

        if query.featured_only {
            builder.push(" AND featured = 1");
        }

        builder
            .push(" ORDER BY featured DESC, quality_score DESC, created_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let prompts = builder
            .build_query_as::<CuratedPrompt>()
            .fetch_all(&self.pool)
            .await?;

        Ok(prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;

    async fn create_test_repo() -> Repository {
        Repository::new(create_memory_pool().await.unwrap())
    }

    fn submission(text: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            text: text.to_string(),
            guest_name: "Ada".to_string(),
            tags: vec!["optimization".to_string()],
            ..Default::default()
        }
    }

    fn curated(gist_id: &str, category: &str, featured: bool, score: f64) -> CreateCuratedRequest {
        CreateCuratedRequest {
            gist_id: gist_id.to_string(),
            title: format!("Prompt {gist_id}"),
            category: Some(category.to_string()),
            author_username: "octocat".to_string(),
            quality_score: score,
            featured,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submission_starts_pending() {
        let repo = create_test_repo().await;

        let created = repo
            .create_submission(submission("Analyze this code for hot loops"))
            .await
            .unwrap();

        assert_eq!(created.status, STATUS_PENDING);
        assert_eq!(created.tags.0, vec!["optimization".to_string()]);

        // Pending submissions are not listed publicly
        assert!(repo.list_approved_submissions().await.unwrap().is_empty());

        repo.set_submission_status(&created.id, STATUS_APPROVED)
            .await
            .unwrap();

        let approved = repo.list_approved_submissions().await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, created.id);
    }

    #[tokio::test]
    async fn test_set_status_rejects_unknown_values() {
        let repo = create_test_repo().await;
        let created = repo.create_submission(submission("Some prompt")).await.unwrap();

        let result = repo.set_submission_status(&created.id, "published").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let missing = repo.set_submission_status("nope", STATUS_APPROVED).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_discussions_are_ordered_oldest_first() {
        let repo = create_test_repo().await;

        repo.add_discussion("p1", "You", "first").await.unwrap();
        repo.add_discussion("p1", "Team", "second").await.unwrap();
        repo.add_discussion("p2", "Other", "elsewhere").await.unwrap();

        let thread = repo.list_discussions("p1").await.unwrap();
        let texts: Vec<&str> = thread.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_upsert_user_updates_existing_row() {
        let repo = create_test_repo().await;

        let first = repo
            .upsert_user(UpsertUserRequest {
                github_id: 42,
                username: "octocat".to_string(),
                name: None,
                email: None,
                avatar_url: None,
            })
            .await
            .unwrap();

        let second = repo
            .upsert_user(UpsertUserRequest {
                github_id: 42,
                username: "octocat-renamed".to_string(),
                name: Some("Octo Cat".to_string()),
                email: None,
                avatar_url: None,
            })
            .await
            .unwrap();

        assert_eq!(second.username, "octocat-renamed");
        assert_eq!(second.created_at, first.created_at);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_list_curated_filters_and_pages() {
        let repo = create_test_repo().await;

        repo.create_curated_prompt(curated("g1", "Research", false, 1.0))
            .await
            .unwrap();
        repo.create_curated_prompt(curated("g2", "Research", true, 0.5))
            .await
            .unwrap();
        repo.create_curated_prompt(curated("g3", "Writing", false, 3.0))
            .await
            .unwrap();

        let research = repo
            .list_curated(&CuratedQuery {
                category: Some("Research".to_string()),
                limit: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = research.iter().map(|p| p.gist_id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1"]);

        let featured = repo
            .list_curated(&CuratedQuery {
                featured_only: true,
                limit: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(featured.len(), 1);
        assert!(featured[0].featured);

        let second_page = repo
            .list_curated(&CuratedQuery {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].gist_id, "g3");
    }

    #[tokio::test]
    async fn test_curated_gist_id_is_unique() {
        let repo = create_test_repo().await;

        repo.create_curated_prompt(curated("g1", "Research", false, 1.0))
            .await
            .unwrap();
        let duplicate = repo
            .create_curated_prompt(curated("g1", "Writing", false, 1.0))
            .await;

        assert!(matches!(duplicate, Err(AppError::Database(_))));
        assert!(repo.get_curated_by_gist_id("g1").await.unwrap().is_some());
        assert!(repo.get_curated_by_gist_id("missing").await.unwrap().is_none());
    }
}
