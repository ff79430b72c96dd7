//! Pull request lifecycle and review queries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use prr_assign::{select_initial_reviewers, RandomSource, ThreadRandom};
use prr_id::{PullRequestId, UserId};
use tracing::{debug, info, instrument, warn};

use super::{with_deadline, Entity, ServiceConfig, ServiceError};
use crate::db::DbError;
use crate::model::{NewPullRequest, PullRequest};
use crate::store::{CreateOutcome, MergeOutcome, Store};

/// Pull request operations.
///
/// Cloning is cheap; clones share the store and the random source.
#[derive(Clone)]
pub struct ReviewService {
    pub(super) store: Arc<dyn Store>,
    max_reviewers: usize,
    pub(super) op_timeout: Duration,
    pub(super) random: Arc<Mutex<Box<dyn RandomSource>>>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self {
            store,
            max_reviewers: config.max_reviewers,
            op_timeout: config.op_timeout,
            random: Arc::new(Mutex::new(Box::new(ThreadRandom))),
        }
    }

    /// Replace the random source used for reassignment.
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Arc::new(Mutex::new(random));
        self
    }

    /// Open a pull request and assign up to `max_reviewers` reviewers from
    /// the author's team.
    #[instrument(skip_all, fields(pull_request_id = %id, author_id = %author_id))]
    pub async fn create_pr(
        &self,
        id: PullRequestId,
        name: String,
        author_id: UserId,
    ) -> Result<PullRequest, ServiceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "pull_request_name must not be empty".to_string(),
            ));
        }

        with_deadline("create_pr", self.op_timeout, async {
            if self.store.get_pull_request(&id).await?.is_some() {
                warn!("Pull request already exists");
                return Err(ServiceError::already_exists(Entity::PullRequest, &id));
            }

            let author = self
                .store
                .get_user(&author_id)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::User, &author_id))?;

            let team = self
                .store
                .get_team(&author.team_name)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::Team, &author.team_name))?;

            let reviewers =
                select_initial_reviewers(&team.members, &author.user_id, self.max_reviewers);
            debug!(reviewers = ?reviewers, "Selected initial reviewers");

            let new_pr = NewPullRequest {
                pull_request_id: id.clone(),
                pull_request_name: name,
                author_id: author.user_id,
                reviewers,
                created_at: Utc::now(),
            };

            if self.store.create_pull_request(&new_pr).await? == CreateOutcome::AlreadyExists {
                warn!("Pull request created concurrently");
                return Err(ServiceError::already_exists(Entity::PullRequest, &id));
            }

            let pr = self.store.get_pull_request(&id).await?.ok_or_else(|| {
                DbError::Inconsistent(format!("pull request {id} missing after insert"))
            })?;

            info!(reviewers = pr.assigned_reviewers.len(), "Pull request created");
            Ok(pr)
        })
        .await
    }

    /// Move a pull request to MERGED. A second merge fails and leaves
    /// `merged_at` untouched.
    #[instrument(skip_all, fields(pull_request_id = %id))]
    pub async fn merge_pr(&self, id: &PullRequestId) -> Result<PullRequest, ServiceError> {
        with_deadline("merge_pr", self.op_timeout, async {
            match self.store.mark_merged(id, Utc::now()).await? {
                MergeOutcome::Merged(pr) => {
                    info!("Pull request merged");
                    Ok(pr)
                }
                MergeOutcome::AlreadyMerged(_) => {
                    warn!("Pull request already merged");
                    Err(ServiceError::AlreadyMerged(id.clone()))
                }
                MergeOutcome::NotFound => Err(ServiceError::not_found(Entity::PullRequest, id)),
            }
        })
        .await
    }

    #[instrument(skip_all, fields(pull_request_id = %id))]
    pub async fn get_pr(&self, id: &PullRequestId) -> Result<PullRequest, ServiceError> {
        with_deadline("get_pr", self.op_timeout, async {
            self.store
                .get_pull_request(id)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::PullRequest, id))
        })
        .await
    }

    /// Pull requests `user_id` currently reviews, oldest first. Unknown users
    /// get an empty list.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn reviews_for(&self, user_id: &UserId) -> Result<Vec<PullRequest>, ServiceError> {
        with_deadline("reviews_for", self.op_timeout, async {
            let prs = self.store.list_by_reviewer(user_id).await?;
            debug!(count = prs.len(), "Loaded reviews");
            Ok(prs)
        })
        .await
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::model::{NewMember, PrStatus};
    use crate::service::RosterService;
    use crate::store::memory::MemoryStore;
    use prr_assign::SeededRandom;
    use prr_id::TeamName;

    pub(crate) fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    pub(crate) fn prid(s: &str) -> PullRequestId {
        PullRequestId::parse(s).unwrap()
    }

    /// Services over a fresh store with team `core` = A, B (active), C (inactive).
    pub(crate) async fn core_team() -> (RosterService, ReviewService) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = ServiceConfig::default();
        let roster = RosterService::new(store.clone(), &config);
        let review = ReviewService::new(store, &config).with_random(Box::new(SeededRandom::new(7)));

        let members = [("A", true), ("B", true), ("C", false)]
            .into_iter()
            .map(|(id, active)| NewMember {
                user_id: uid(id),
                username: id.to_lowercase(),
                is_active: active,
            })
            .collect();
        roster
            .create_team(TeamName::parse("core").unwrap(), members)
            .await
            .unwrap();

        (roster, review)
    }

    #[tokio::test]
    async fn test_create_pr_skips_author_and_inactive() {
        let (_, review) = core_team().await;
        let pr = review
            .create_pr(prid("pr-1"), "Add search".into(), uid("A"))
            .await
            .unwrap();

        assert_eq!(pr.status, PrStatus::Open);
        assert_eq!(pr.assigned_reviewers, vec![uid("B")]);
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_create_pr_respects_cap() {
        let (roster, review) = core_team().await;
        roster.set_active(&uid("C"), true).await.unwrap();

        let pr = review
            .create_pr(prid("pr-1"), "Add search".into(), uid("A"))
            .await
            .unwrap();
        assert_eq!(pr.assigned_reviewers, vec![uid("B"), uid("C")]);
    }

    #[tokio::test]
    async fn test_create_pr_duplicate_and_unknown_author() {
        let (_, review) = core_team().await;
        review
            .create_pr(prid("pr-1"), "Add search".into(), uid("A"))
            .await
            .unwrap();

        let dup = review
            .create_pr(prid("pr-1"), "Again".into(), uid("B"))
            .await
            .unwrap_err();
        assert!(matches!(
            dup,
            ServiceError::AlreadyExists { entity: Entity::PullRequest, .. }
        ));

        let unknown = review
            .create_pr(prid("pr-2"), "Orphan".into(), uid("Z"))
            .await
            .unwrap_err();
        assert!(matches!(
            unknown,
            ServiceError::NotFound { entity: Entity::User, .. }
        ));
    }

    #[tokio::test]
    async fn test_create_pr_rejects_blank_name() {
        let (_, review) = core_team().await;
        let err = review
            .create_pr(prid("pr-1"), "  ".into(), uid("A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_double_merge_keeps_timestamp() {
        let (_, review) = core_team().await;
        review
            .create_pr(prid("pr-1"), "Add search".into(), uid("A"))
            .await
            .unwrap();

        let merged = review.merge_pr(&prid("pr-1")).await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        let merged_at = merged.merged_at.unwrap();

        let err = review.merge_pr(&prid("pr-1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyMerged(_)));

        let again = review.get_pr(&prid("pr-1")).await.unwrap();
        assert_eq!(again.merged_at, Some(merged_at));
    }

    #[tokio::test]
    async fn test_merge_unknown_pr() {
        let (_, review) = core_team().await;
        let err = review.merge_pr(&prid("nope")).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotFound { entity: Entity::PullRequest, .. }
        ));
    }

    #[tokio::test]
    async fn test_reviews_for_includes_merged() {
        let (_, review) = core_team().await;
        review
            .create_pr(prid("pr-1"), "First".into(), uid("A"))
            .await
            .unwrap();
        review
            .create_pr(prid("pr-2"), "Second".into(), uid("A"))
            .await
            .unwrap();
        review.merge_pr(&prid("pr-1")).await.unwrap();

        let prs = review.reviews_for(&uid("B")).await.unwrap();
        let ids: Vec<&str> = prs.iter().map(|p| p.pull_request_id.as_str()).collect();
        assert_eq!(ids, ["pr-1", "pr-2"]);

        assert!(review.reviews_for(&uid("nobody")).await.unwrap().is_empty());
    }
}
