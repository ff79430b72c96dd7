//! In-memory implementation of the store traits.
//!
//! All state lives in one `RwLock`-protected value and is lost on restart.
//! A [`ReviewTransaction`] takes the write lock for its whole lifetime and
//! edits a private copy of the state; `commit` swaps the copy in. Dropping the
//! transaction discards the copy, which is the rollback.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prr_id::{PullRequestId, TeamName, UserId};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{
    CreateOutcome, MergeOutcome, PullRequestStore, ReviewTransaction, RosterStore, Store,
    UserStore,
};
use crate::db::DbError;
use crate::model::{Member, NewMember, NewPullRequest, PrStatus, PullRequest, Team};

#[derive(Debug, Clone)]
struct PullRequestRecord {
    pull_request_name: String,
    author_id: UserId,
    status: PrStatus,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<TeamName>,
    users: BTreeMap<UserId, Member>,
    pull_requests: BTreeMap<PullRequestId, PullRequestRecord>,
    /// The assignment relation, keyed like the `pull_request_reviewers` table.
    reviewers: BTreeSet<(PullRequestId, UserId)>,
}

impl MemoryState {
    fn roster(&self, team_name: &TeamName) -> Vec<Member> {
        self.users
            .values()
            .filter(|m| &m.team_name == team_name)
            .cloned()
            .collect()
    }

    fn pull_request(&self, id: &PullRequestId) -> Option<PullRequest> {
        let record = self.pull_requests.get(id)?;
        let assigned_reviewers = self
            .reviewers
            .iter()
            .filter(|(pr_id, _)| pr_id == id)
            .map(|(_, user_id)| user_id.clone())
            .collect();

        Some(PullRequest {
            pull_request_id: id.clone(),
            pull_request_name: record.pull_request_name.clone(),
            author_id: record.author_id.clone(),
            status: record.status,
            assigned_reviewers,
            created_at: record.created_at,
            merged_at: record.merged_at,
        })
    }
}

/// In-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn get_team(&self, team_name: &TeamName) -> Result<Option<Team>, DbError> {
        let state = self.state.read().await;
        if !state.teams.contains(team_name) {
            return Ok(None);
        }
        Ok(Some(Team {
            team_name: team_name.clone(),
            members: state.roster(team_name),
        }))
    }

    async fn create_team(
        &self,
        team_name: &TeamName,
        members: &[NewMember],
    ) -> Result<CreateOutcome, DbError> {
        let mut state = self.state.write().await;
        if !state.teams.insert(team_name.clone()) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        for member in members {
            state.users.insert(
                member.user_id.clone(),
                Member {
                    user_id: member.user_id.clone(),
                    username: member.username.clone(),
                    team_name: team_name.clone(),
                    is_active: member.is_active,
                },
            );
        }

        Ok(CreateOutcome::Created)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Member>, DbError> {
        let state = self.state.read().await;
        Ok(state.users.get(user_id).cloned())
    }

    async fn set_active(
        &self,
        user_id: &UserId,
        is_active: bool,
    ) -> Result<Option<Member>, DbError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(user_id).map(|member| {
            member.is_active = is_active;
            member.clone()
        }))
    }
}

#[async_trait]
impl PullRequestStore for MemoryStore {
    async fn get_pull_request(&self, id: &PullRequestId) -> Result<Option<PullRequest>, DbError> {
        let state = self.state.read().await;
        Ok(state.pull_request(id))
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<CreateOutcome, DbError> {
        let mut state = self.state.write().await;
        if state.pull_requests.contains_key(&pr.pull_request_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        state.pull_requests.insert(
            pr.pull_request_id.clone(),
            PullRequestRecord {
                pull_request_name: pr.pull_request_name.clone(),
                author_id: pr.author_id.clone(),
                status: PrStatus::Open,
                created_at: pr.created_at,
                merged_at: None,
            },
        );
        for reviewer in &pr.reviewers {
            state
                .reviewers
                .insert((pr.pull_request_id.clone(), reviewer.clone()));
        }

        Ok(CreateOutcome::Created)
    }

    async fn mark_merged(
        &self,
        id: &PullRequestId,
        merged_at: DateTime<Utc>,
    ) -> Result<MergeOutcome, DbError> {
        let mut state = self.state.write().await;
        let Some(record) = state.pull_requests.get_mut(id) else {
            return Ok(MergeOutcome::NotFound);
        };

        let merged_now = record.status == PrStatus::Open;
        if merged_now {
            record.status = PrStatus::Merged;
            record.merged_at = Some(merged_at);
        }

        let pr = state
            .pull_request(id)
            .ok_or_else(|| DbError::Inconsistent(format!("pull request {id}")))?;
        Ok(if merged_now {
            MergeOutcome::Merged(pr)
        } else {
            MergeOutcome::AlreadyMerged(pr)
        })
    }

    async fn list_by_reviewer(&self, user_id: &UserId) -> Result<Vec<PullRequest>, DbError> {
        let state = self.state.read().await;
        let mut prs: Vec<PullRequest> = state
            .reviewers
            .iter()
            .filter(|(_, reviewer)| reviewer == user_id)
            .filter_map(|(pr_id, _)| state.pull_request(pr_id))
            .collect();
        prs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.pull_request_id.cmp(&b.pull_request_id))
        });
        Ok(prs)
    }

    async fn begin_review(&self) -> Result<Box<dyn ReviewTransaction>, DbError> {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryReviewTransaction { guard, working }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}

struct MemoryReviewTransaction {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl ReviewTransaction for MemoryReviewTransaction {
    async fn lock_pull_request(
        &mut self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, DbError> {
        Ok(self.working.pull_request(id))
    }

    async fn remove_reviewer(
        &mut self,
        id: &PullRequestId,
        user_id: &UserId,
    ) -> Result<bool, DbError> {
        Ok(self.working.reviewers.remove(&(id.clone(), user_id.clone())))
    }

    async fn team_roster_of(&mut self, user_id: &UserId) -> Result<Vec<Member>, DbError> {
        Ok(match self.working.users.get(user_id) {
            Some(member) => self.working.roster(&member.team_name),
            None => Vec::new(),
        })
    }

    async fn add_reviewer(&mut self, id: &PullRequestId, user_id: &UserId) -> Result<(), DbError> {
        if !self
            .working
            .reviewers
            .insert((id.clone(), user_id.clone()))
        {
            return Err(DbError::Inconsistent(format!(
                "reviewer {user_id} already assigned to {id}"
            )));
        }
        Ok(())
    }

    async fn load_pull_request(
        &mut self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, DbError> {
        Ok(self.working.pull_request(id))
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
