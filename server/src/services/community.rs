//! Community library service
//!
//! Curated prompts are browsed from the relational store; nominations
//! of public gists wait for a moderator to approve them.

use crate::config::{DEFAULT_DISCOVER_LIMIT, MAX_DISCOVER_LIMIT};
use crate::database::{
    CreateCuratedRequest, CuratedPrompt, CuratedQuery, Discussion, Nomination, Repository,
    STATUS_APPROVED, STATUS_PENDING,
};
use crate::error::{AppError, Result};
use crate::gist::GistLibrary;

#[derive(Clone)]
pub struct CommunityService {
    repo: Repository,
}

impl CommunityService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Page through curated prompts; the page size is clamped to 1..=100
    pub async fn discover(
        &self,
        category: Option<String>,
        featured_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CuratedPrompt>> {
        let query = CuratedQuery {
            category: category.filter(|c| !c.is_empty()),
            featured_only,
            limit: limit
                .unwrap_or(DEFAULT_DISCOVER_LIMIT)
                .clamp(1, MAX_DISCOVER_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        };

        self.repo.list_curated(&query).await
    }

    /// Nominate one of the user's gists; only public gists qualify
    pub async fn nominate(
        &self,
        library: &GistLibrary,
        gist_id: &str,
        username: &str,
    ) -> Result<Nomination> {
        let prompt = library.get_prompt(gist_id).await?;
        if !prompt.is_public {
            return Err(AppError::Validation(
                "Only public Gists can be nominated for the community library".to_string(),
            ));
        }

        let title = if prompt.title.trim().is_empty() {
            "Untitled Prompt"
        } else {
            prompt.title.as_str()
        };

        let nomination = self.repo.create_nomination(gist_id, title, username).await?;
        tracing::info!("{} nominated gist {}", username, gist_id);
        Ok(nomination)
    }

    /// A curated prompt with its discussion thread
    pub async fn get_prompt(&self, gist_id: &str) -> Result<(CuratedPrompt, Vec<Discussion>)> {
        let curated = self
            .repo
            .get_curated_by_gist_id(gist_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Prompt not found in community library".to_string())
            })?;
        let discussions = self.repo.list_discussions(gist_id).await?;
        Ok((curated, discussions))
    }

    pub async fn comment(&self, gist_id: &str, author: &str, text: &str) -> Result<Discussion> {
        if author.trim().is_empty() || text.trim().is_empty() {
            return Err(AppError::Validation("Author and text are required".to_string()));
        }
        self.get_prompt(gist_id).await?;
        self.repo.add_discussion(gist_id, author.trim(), text.trim()).await
    }

    /// Promote a pending nomination into the curated library
    pub async fn approve_nomination(&self, id: &str) -> Result<CuratedPrompt> {
        let nomination = self.repo.get_nomination(id).await?;
        if nomination.status != STATUS_PENDING {
            return Err(AppError::Validation(format!(
                "Nomination {id} is already {}",
                nomination.status
            )));
        }

        let curated = match self.repo.get_curated_by_gist_id(&nomination.gist_id).await? {
            Some(existing) => existing,
            None => {
                self.repo
                    .create_curated_prompt(CreateCuratedRequest {
                        gist_id: nomination.gist_id.clone(),
                        title: nomination.title.clone(),
                        author_username: nomination.nominated_by.clone(),
                        ..Default::default()
                    })
                    .await?
            }
        };

        self.repo.set_nomination_status(id, STATUS_APPROVED).await?;
        tracing::info!("Approved nomination {} as curated {}", id, curated.id);
        Ok(curated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;
    use crate::gist::{MemoryDocumentStore, NewPrompt};
    use std::sync::Arc;

    async fn setup() -> (CommunityService, Repository, GistLibrary) {
        let pool = create_memory_pool().await.unwrap();
        let repo = Repository::new(pool);
        let library = GistLibrary::new(Arc::new(MemoryDocumentStore::new()));
        (CommunityService::new(repo.clone()), repo, library)
    }

    async fn curate(repo: &Repository, gist_id: &str, category: &str, featured: bool) {
        repo.create_curated_prompt(CreateCuratedRequest {
            gist_id: gist_id.to_string(),
            title: gist_id.to_string(),
            category: Some(category.to_string()),
            author_username: "octocat".to_string(),
            featured,
            ..Default::default()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_discover_filters_and_clamps() {
        let (service, repo, _) = setup().await;
        curate(&repo, "a", "Writing", false).await;
        curate(&repo, "b", "Research", true).await;
        curate(&repo, "c", "Writing", false).await;

        let all = service.discover(None, false, None, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].gist_id, "b");

        let writing = service
            .discover(Some("Writing".to_string()), false, None, None)
            .await
            .unwrap();
        assert_eq!(writing.len(), 2);

        let featured = service.discover(None, true, None, None).await.unwrap();
        assert_eq!(featured.len(), 1);

        let page = service.discover(None, false, Some(0), Some(-5)).await.unwrap();
        assert_eq!(page.len(), 1);

        let big = service.discover(None, false, Some(10_000), Some(2)).await.unwrap();
        assert_eq!(big.len(), 1);
    }

    #[tokio::test]
    async fn test_nominate_requires_public_gist() {
        let (service, _, library) = setup().await;

        let private = library
            .add_prompt(NewPrompt {
                title: "Secret".to_string(),
                content: "x".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            service.nominate(&library, &private, "octocat").await,
            Err(AppError::Validation(_))
        ));

        let public = library
            .add_prompt(NewPrompt {
                title: String::new(),
                content: "x".to_string(),
                is_public: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let nomination = service.nominate(&library, &public, "octocat").await.unwrap();
        assert_eq!(nomination.title, "Untitled Prompt");
        assert_eq!(nomination.status, STATUS_PENDING);
    }

    #[tokio::test]
    async fn test_approved_nomination_becomes_curated() {
        let (service, repo, _) = setup().await;
        let nomination = repo.create_nomination("g1", "Great prompt", "octocat").await.unwrap();

        let curated = service.approve_nomination(&nomination.id).await.unwrap();
        assert_eq!(curated.gist_id, "g1");
        assert_eq!(curated.author_username, "octocat");

        let (found, thread) = service.get_prompt("g1").await.unwrap();
        assert_eq!(found.id, curated.id);
        assert!(thread.is_empty());

        assert!(service.approve_nomination(&nomination.id).await.is_err());
    }

    #[tokio::test]
    async fn test_community_thread_requires_curated_prompt() {
        let (service, repo, _) = setup().await;
        assert!(matches!(service.get_prompt("nope").await, Err(AppError::NotFound(_))));

        curate(&repo, "g1", "Writing", false).await;
        service.comment("g1", "Ada", "Love it").await.unwrap();
        let (_, thread) = service.get_prompt("g1").await.unwrap();
        assert_eq!(thread[0].text, "Love it");
    }
}
