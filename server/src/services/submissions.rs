//! Guest submissions service
//!
//! Public prompt submissions, their moderation status and the discussion
//! thread under each one.

use crate::database::{
    CreateSubmissionRequest, Discussion, Repository, Submission, STATUS_APPROVED,
};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct SubmissionsService {
    repo: Repository,
}

impl SubmissionsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Store a guest submission as `pending`
    pub async fn submit(&self, mut req: CreateSubmissionRequest) -> Result<Submission> {
        if req.text.trim().is_empty() || req.guest_name.trim().is_empty() {
            return Err(AppError::Validation(
                "Please fill in all required fields.".to_string(),
            ));
        }

        req.suggested_title = non_empty(req.suggested_title);
        req.category = non_empty(req.category);
        req.guest_email = non_empty(req.guest_email);
        req.tags = req
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let submission = self.repo.create_submission(req).await?;
        tracing::info!("New submission {} from {}", submission.id, submission.guest_name);
        Ok(submission)
    }

    pub async fn list_approved(&self) -> Result<Vec<Submission>> {
        self.repo.list_approved_submissions().await
    }

    /// A submission with its discussion thread
    pub async fn get_with_discussions(&self, id: &str) -> Result<(Submission, Vec<Discussion>)> {
        let submission = self.repo.get_submission(id).await?;
        let discussions = self.repo.list_discussions(id).await?;
        Ok((submission, discussions))
    }

    /// Add a comment under an existing submission
    pub async fn comment(&self, id: &str, author: &str, text: &str) -> Result<Discussion> {
        if author.trim().is_empty() || text.trim().is_empty() {
            return Err(AppError::Validation("Author and text are required".to_string()));
        }

        self.repo.get_submission(id).await?;
        self.repo.add_discussion(id, author.trim(), text.trim()).await
    }

    pub async fn approve(&self, id: &str) -> Result<Submission> {
        tracing::info!("Approving submission {}", id);
        self.repo.set_submission_status(id, STATUS_APPROVED).await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, STATUS_PENDING};

    async fn service() -> SubmissionsService {
        let pool = create_memory_pool().await.unwrap();
        SubmissionsService::new(Repository::new(pool))
    }

    fn request(text: &str, guest: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            text: text.to_string(),
            guest_name: guest.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_requires_text_and_name() {
        let service = service().await;
        assert!(matches!(
            service.submit(request("", "Ada")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.submit(request("Explain monads", "  ")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_normalizes_optional_fields() {
        let service = service().await;
        let submission = service
            .submit(CreateSubmissionRequest {
                suggested_title: Some("  ".to_string()),
                guest_email: Some(String::new()),
                tags: vec![" rust ".to_string(), String::new()],
                ..request("Explain monads", "Ada")
            })
            .await
            .unwrap();

        assert_eq!(submission.status, STATUS_PENDING);
        assert!(submission.suggested_title.is_none());
        assert!(submission.guest_email.is_none());
        assert_eq!(submission.tags.0, vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn test_only_approved_are_listed() {
        let service = service().await;
        let a = service.submit(request("first prompt", "Ada")).await.unwrap();
        service.submit(request("second prompt", "Bob")).await.unwrap();

        assert!(service.list_approved().await.unwrap().is_empty());

        service.approve(&a.id).await.unwrap();
        let listed = service.list_approved().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);
    }

    #[tokio::test]
    async fn test_comment_thread() {
        let service = service().await;
        let s = service.submit(request("prompt text", "Ada")).await.unwrap();

        service.comment(&s.id, "Bob", "Nice one").await.unwrap();
        service.comment(&s.id, "Cy", "Agreed").await.unwrap();

        let (_, thread) = service.get_with_discussions(&s.id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].author, "Bob");

        assert!(matches!(
            service.comment("missing", "Bob", "hi").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.comment(&s.id, "", "hi").await,
            Err(AppError::Validation(_))
        ));
    }
}
