//! Route groups and the JSON shapes they share.

pub mod pull_requests;
pub mod teams;
pub mod users;

use chrono::{DateTime, Utc};
use prr_id::{PullRequestId, TeamName, UserId};
use serde::{Deserialize, Serialize};

use crate::model::{Member, PrStatus, PullRequest};

/// A team member as listed inside a team.
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamMemberDto {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

impl From<Member> for TeamMemberDto {
    fn from(member: Member) -> Self {
        Self {
            user_id: member.user_id.into_string(),
            username: member.username,
            is_active: member.is_active,
        }
    }
}

/// A user with the team it belongs to.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: UserId,
    pub username: String,
    pub team_name: TeamName,
    pub is_active: bool,
}

impl From<Member> for UserDto {
    fn from(member: Member) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username,
            team_name: member.team_name,
            is_active: member.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestDto {
    pub pull_request_id: PullRequestId,
    pub pull_request_name: String,
    pub author_id: UserId,
    pub status: PrStatus,
    pub assigned_reviewers: Vec<UserId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for PullRequestDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status,
            assigned_reviewers: pr.assigned_reviewers,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
        }
    }
}

/// Pull request without reviewers or timestamps, used in review listings.
#[derive(Debug, Serialize)]
pub struct PullRequestShortDto {
    pub pull_request_id: PullRequestId,
    pub pull_request_name: String,
    pub author_id: UserId,
    pub status: PrStatus,
}

impl From<PullRequest> for PullRequestShortDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestEnvelope {
    pub pr: PullRequestDto,
}

impl From<PullRequest> for PullRequestEnvelope {
    fn from(pr: PullRequest) -> Self {
        Self { pr: pr.into() }
    }
}
