//! Reviewer reassignment.
//!
//! A reassignment swaps one reviewer of an OPEN pull request for a random
//! active member of that reviewer's team. All reads and writes happen inside
//! one [`ReviewTransaction`](crate::store::ReviewTransaction) that starts by
//! locking the pull request, so two reassignments on the same pull request
//! run one after the other. Any early return drops the transaction and rolls
//! it back.

use std::sync::PoisonError;

use prr_assign::select_replacement_reviewer;
use prr_id::{PullRequestId, UserId};
use tracing::{debug, info, instrument, warn};

use super::{with_deadline, Entity, ReviewService, ServiceError};
use crate::db::DbError;
use crate::model::PullRequest;

/// Outcome of a successful reassignment.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub pull_request: PullRequest,
    pub replaced_by: UserId,
}

impl ReviewService {
    /// Replace `old_reviewer` on pull request `id` with another active member
    /// of `old_reviewer`'s team.
    ///
    /// The replacement is never the removed reviewer, the author, or someone
    /// already reviewing the pull request.
    #[instrument(skip_all, fields(pull_request_id = %id, old_reviewer = %old_reviewer))]
    pub async fn reassign_reviewer(
        &self,
        id: &PullRequestId,
        old_reviewer: &UserId,
    ) -> Result<Reassignment, ServiceError> {
        with_deadline(
            "reassign_reviewer",
            self.op_timeout,
            self.reassign_in_transaction(id, old_reviewer),
        )
        .await
    }

    async fn reassign_in_transaction(
        &self,
        id: &PullRequestId,
        old_reviewer: &UserId,
    ) -> Result<Reassignment, ServiceError> {
        let mut tx = self.store.begin_review().await?;

        let pr = tx
            .lock_pull_request(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Entity::PullRequest, id))?;

        if pr.is_merged() {
            warn!("Refusing to reassign on merged pull request");
            return Err(ServiceError::AlreadyMerged(id.clone()));
        }

        if !pr.has_reviewer(old_reviewer) || !tx.remove_reviewer(id, old_reviewer).await? {
            info!("Reviewer is not assigned");
            return Err(ServiceError::ReviewerNotAssigned {
                pull_request: id.clone(),
                reviewer: old_reviewer.clone(),
            });
        }

        let roster = tx.team_roster_of(old_reviewer).await?;

        let mut excluded: Vec<UserId> = pr
            .assigned_reviewers
            .iter()
            .filter(|r| *r != old_reviewer)
            .cloned()
            .collect();
        excluded.push(pr.author_id.clone());

        let replacement = {
            let mut random = self.random.lock().unwrap_or_else(PoisonError::into_inner);
            select_replacement_reviewer(&roster, old_reviewer, &excluded, &mut **random)
        };
        let replacement = match replacement {
            Ok(user_id) => user_id,
            Err(e) => {
                info!(roster = roster.len(), "No replacement candidate");
                return Err(e.into());
            }
        };
        debug!(replacement = %replacement, "Selected replacement reviewer");

        tx.add_reviewer(id, &replacement).await?;

        let updated = tx.load_pull_request(id).await?.ok_or_else(|| {
            DbError::Inconsistent(format!("pull request {id} vanished while locked"))
        })?;
        tx.commit().await?;

        info!(replaced_by = %replacement, "Reviewer reassigned");
        Ok(Reassignment {
            pull_request: updated,
            replaced_by: replacement,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::NewMember;
    use crate::service::review::tests::{core_team, prid, uid};
    use crate::service::{RosterService, ServiceConfig};
    use crate::store::memory::MemoryStore;
    use crate::store::Store;
    use prr_id::TeamName;

    async fn pr_by_a(review: &ReviewService) {
        review
            .create_pr(prid("pr-1"), "Add search".into(), uid("A"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_candidate_keeps_reviewer() {
        let (_, review) = core_team().await;
        pr_by_a(&review).await;

        let err = review
            .reassign_reviewer(&prid("pr-1"), &uid("B"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoCandidateAvailable { ref removed } if *removed == uid("B")));

        let pr = review.get_pr(&prid("pr-1")).await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec![uid("B")]);
    }

    #[tokio::test]
    async fn test_reassign_moves_review_to_new_member() {
        let (roster, review) = core_team().await;
        pr_by_a(&review).await;
        roster.set_active(&uid("C"), true).await.unwrap();

        // B is the only reviewer; the author is excluded, so C is the only pick.
        let reassigned = review
            .reassign_reviewer(&prid("pr-1"), &uid("B"))
            .await
            .unwrap();
        assert_eq!(reassigned.replaced_by, uid("C"));
        assert_eq!(reassigned.pull_request.assigned_reviewers, vec![uid("C")]);

        assert!(review.reviews_for(&uid("B")).await.unwrap().is_empty());
        assert_eq!(review.reviews_for(&uid("C")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reassign_unassigned_reviewer() {
        let (_, review) = core_team().await;
        pr_by_a(&review).await;

        let err = review
            .reassign_reviewer(&prid("pr-1"), &uid("C"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ReviewerNotAssigned { .. }));
    }

    #[tokio::test]
    async fn test_reassign_on_merged_or_missing_pr() {
        let (_, review) = core_team().await;
        pr_by_a(&review).await;
        review.merge_pr(&prid("pr-1")).await.unwrap();

        let merged = review
            .reassign_reviewer(&prid("pr-1"), &uid("B"))
            .await
            .unwrap_err();
        assert!(matches!(merged, ServiceError::AlreadyMerged(_)));

        let missing = review
            .reassign_reviewer(&prid("pr-404"), &uid("B"))
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            ServiceError::NotFound { entity: Entity::PullRequest, .. }
        ));
    }

    /// Team of six active members, author P, PR reviewers R1 and R2.
    async fn wide_team() -> ReviewService {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = ServiceConfig::default();
        let roster = RosterService::new(store.clone(), &config);
        let review = ReviewService::new(store, &config);

        let members = ["P", "R1", "R2", "X", "Y", "Z"]
            .into_iter()
            .map(|id| NewMember {
                user_id: uid(id),
                username: id.to_lowercase(),
                is_active: true,
            })
            .collect();
        roster
            .create_team(TeamName::parse("platform").unwrap(), members)
            .await
            .unwrap();
        review
            .create_pr(prid("pr-1"), "Refactor".into(), uid("P"))
            .await
            .unwrap();
        review
    }

    #[tokio::test]
    async fn test_replacement_is_never_removed_author_or_current() {
        for _ in 0..20 {
            let review = wide_team().await;
            let pr = review.get_pr(&prid("pr-1")).await.unwrap();
            assert_eq!(pr.assigned_reviewers, vec![uid("R1"), uid("R2")]);

            let result = review
                .reassign_reviewer(&prid("pr-1"), &uid("R1"))
                .await
                .unwrap();
            assert!(["X", "Y", "Z"].contains(&result.replaced_by.as_str()));
            assert!(result.pull_request.has_reviewer(&uid("R2")));
            assert_eq!(result.pull_request.assigned_reviewers.len(), 2);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reassignments_on_one_pr() {
        let review = wide_team().await;

        let first = {
            let review = review.clone();
            tokio::spawn(async move { review.reassign_reviewer(&prid("pr-1"), &uid("R1")).await })
        };
        let second = {
            let review = review.clone();
            tokio::spawn(async move { review.reassign_reviewer(&prid("pr-1"), &uid("R2")).await })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_ne!(first.replaced_by, second.replaced_by);

        // Whichever ran second saw the first one's result under the lock.
        let pr = review.get_pr(&prid("pr-1")).await.unwrap();
        let mut expected = vec![first.replaced_by, second.replaced_by];
        expected.sort();
        assert_eq!(pr.assigned_reviewers, expected);
        assert!(!pr.has_reviewer(&uid("P")));
    }
}
