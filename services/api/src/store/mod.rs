//! Storage contracts.
//!
//! The services only talk to storage through these traits. Two
//! implementations exist:
//!
//! - [`crate::db::PgStore`]: Postgres, used in production
//! - [`memory::MemoryStore`]: in-process, used by tests and `serve --in-memory`
//!
//! Reviewer reassignment needs several statements to run atomically, so it is
//! exposed as a [`ReviewTransaction`] rather than a single call. Dropping a
//! transaction without calling [`ReviewTransaction::commit`] rolls it back.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prr_id::{PullRequestId, TeamName, UserId};

use crate::db::DbError;
use crate::model::{Member, NewMember, NewPullRequest, PullRequest, Team};

/// Result of an insert that must not overwrite an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Result of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The pull request moved from OPEN to MERGED.
    Merged(PullRequest),
    /// The pull request was already MERGED and was left untouched.
    AlreadyMerged(PullRequest),
    NotFound,
}

/// Teams and their rosters.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Load a team with all members, ordered by user ID.
    async fn get_team(&self, team_name: &TeamName) -> Result<Option<Team>, DbError>;

    /// Insert a team and upsert its members in one transaction.
    ///
    /// Members that already exist (in any team) are moved to this team and
    /// take the new username and active flag.
    async fn create_team(
        &self,
        team_name: &TeamName,
        members: &[NewMember],
    ) -> Result<CreateOutcome, DbError>;
}

/// Individual users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Member>, DbError>;

    /// Update the active flag, returning the updated member.
    async fn set_active(&self, user_id: &UserId, is_active: bool)
        -> Result<Option<Member>, DbError>;
}

/// Pull requests and the reviewer assignment relation.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn get_pull_request(&self, id: &PullRequestId) -> Result<Option<PullRequest>, DbError>;

    /// Insert an OPEN pull request together with its initial reviewers.
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<CreateOutcome, DbError>;

    /// Transition OPEN -> MERGED, stamping `merged_at`.
    async fn mark_merged(
        &self,
        id: &PullRequestId,
        merged_at: DateTime<Utc>,
    ) -> Result<MergeOutcome, DbError>;

    /// Pull requests where `user_id` is currently a reviewer, oldest first.
    async fn list_by_reviewer(&self, user_id: &UserId) -> Result<Vec<PullRequest>, DbError>;

    /// Open a transaction for editing one pull request's reviewer set.
    async fn begin_review(&self) -> Result<Box<dyn ReviewTransaction>, DbError>;
}

/// One atomic edit of a pull request's reviewer set.
#[async_trait]
pub trait ReviewTransaction: Send {
    /// Load the pull request and lock it against concurrent review edits
    /// until this transaction ends.
    async fn lock_pull_request(&mut self, id: &PullRequestId)
        -> Result<Option<PullRequest>, DbError>;

    /// Delete an assignment row. Returns false if there was none.
    async fn remove_reviewer(&mut self, id: &PullRequestId, user_id: &UserId)
        -> Result<bool, DbError>;

    /// The full roster of the team `user_id` belongs to (empty if unknown).
    async fn team_roster_of(&mut self, user_id: &UserId) -> Result<Vec<Member>, DbError>;

    /// Insert an assignment row.
    async fn add_reviewer(&mut self, id: &PullRequestId, user_id: &UserId)
        -> Result<(), DbError>;

    /// Re-read the pull request as this transaction sees it.
    async fn load_pull_request(&mut self, id: &PullRequestId)
        -> Result<Option<PullRequest>, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;
}

/// Everything the services need from storage.
#[async_trait]
pub trait Store: RosterStore + UserStore + PullRequestStore {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<(), DbError>;
}
