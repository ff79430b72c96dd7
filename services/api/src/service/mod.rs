//! Domain operations on top of the store traits.
//!
//! - [`RosterService`]: teams, members and the active flag
//! - [`ReviewService`]: pull request lifecycle, review queries and reviewer
//!   reassignment
//!
//! Every public operation runs under the configured deadline; a timed-out
//! operation is dropped mid-flight, which rolls back any open transaction.

mod reassign;
mod review;
mod roster;

pub use reassign::Reassignment;
pub use review::ReviewService;
pub use roster::RosterService;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use prr_assign::{AssignError, DEFAULT_MAX_REVIEWERS};
use prr_id::{IdError, PullRequestId, UserId};
use thiserror::Error;
use tracing::warn;

use crate::db::DbError;

/// Default per-operation deadline.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(5000);

/// Knobs shared by the services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cap on reviewers assigned when a pull request is created.
    pub max_reviewers: usize,

    /// Deadline for a single service operation.
    pub op_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_reviewers: DEFAULT_MAX_REVIEWERS,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

/// Kind of record a lookup or insert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Team,
    User,
    PullRequest,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Team => "team",
            Self::User => "user",
            Self::PullRequest => "pull request",
        })
    }
}

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {key} not found")]
    NotFound { entity: Entity, key: String },

    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: Entity, key: String },

    #[error("pull request {0} is already merged")]
    AlreadyMerged(PullRequestId),

    #[error("reviewer {reviewer} is not assigned to pull request {pull_request}")]
    ReviewerNotAssigned {
        pull_request: PullRequestId,
        reviewer: UserId,
    },

    #[error("no active replacement candidate in team of reviewer {removed}")]
    NoCandidateAvailable { removed: UserId },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{op} timed out after {}ms", .after.as_millis())]
    Timeout { op: &'static str, after: Duration },

    #[error(transparent)]
    Store(#[from] DbError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: Entity, key: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<AssignError> for ServiceError {
    fn from(err: AssignError) -> Self {
        match err {
            AssignError::NoCandidateAvailable { removed } => Self::NoCandidateAvailable { removed },
        }
    }
}

/// Parse a raw request field into a typed key.
pub fn parse_key<K>(field: &str, raw: &str) -> Result<K, ServiceError>
where
    K: FromStr<Err = IdError>,
{
    raw.parse()
        .map_err(|e: IdError| ServiceError::InvalidInput(format!("{field}: {e}")))
}

/// Run `fut` under a deadline, mapping expiry to [`ServiceError::Timeout`].
pub(crate) async fn with_deadline<T, F>(
    op: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(op, timeout_ms = after.as_millis() as u64, "Operation timed out");
            Err(ServiceError::Timeout { op, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prr_id::TeamName;

    #[test]
    fn test_parse_key_reports_field() {
        let err = parse_key::<TeamName>("team_name", "   ").unwrap_err();
        match err {
            ServiceError::InvalidInput(msg) => assert!(msg.starts_with("team_name:")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_assign_error_maps_to_no_candidate() {
        let removed = UserId::parse("B").unwrap();
        let err: ServiceError = AssignError::NoCandidateAvailable {
            removed: removed.clone(),
        }
        .into();
        assert!(matches!(err, ServiceError::NoCandidateAvailable { removed: r } if r == removed));
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), ServiceError> =
            with_deadline("sleepy", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout { op: "sleepy", .. })));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline("quick", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_entity_display() {
        let err = ServiceError::not_found(Entity::PullRequest, "pr-9");
        assert_eq!(err.to_string(), "pull request pr-9 not found");
    }
}
