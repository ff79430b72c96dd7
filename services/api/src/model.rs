//! Domain types shared by the stores, services and HTTP layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use prr_assign::RosterMember;
use prr_id::{PullRequestId, TeamName, UserId};
use serde::{Deserialize, Serialize};

/// A team member as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    pub team_name: TeamName,
    pub is_active: bool,
}

impl RosterMember for Member {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// A member listed in a team creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub user_id: UserId,
    pub username: String,
    pub is_active: bool,
}

/// A team with its full roster, ordered by user ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub team_name: TeamName,
    pub members: Vec<Member>,
}

/// Pull request status. `Merged` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pull request status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PrStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A pull request together with its current reviewer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub pull_request_id: PullRequestId,
    pub pull_request_name: String,
    pub author_id: UserId,
    pub status: PrStatus,
    /// Ordered by user ID; order carries no meaning.
    pub assigned_reviewers: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn has_reviewer(&self, user_id: &UserId) -> bool {
        self.assigned_reviewers.contains(user_id)
    }
}

/// Input for persisting a freshly created pull request.
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub pull_request_id: PullRequestId,
    pub pull_request_name: String,
    pub author_id: UserId,
    pub reviewers: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}
