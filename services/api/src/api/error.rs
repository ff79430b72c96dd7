use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::{Entity, ServiceError};

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const TEAM_EXISTS: &str = "TEAM_EXISTS";
pub const PR_EXISTS: &str = "PR_EXISTS";
pub const PR_MERGED: &str = "PR_MERGED";
pub const NOT_ASSIGNED: &str = "NOT_ASSIGNED";
pub const NO_CANDIDATE: &str = "NO_CANDIDATE";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const TIMEOUT: &str = "TIMEOUT";
pub const INTERNAL: &str = "INTERNAL";

/// JSON error body: `{"error": {"code", "message"}, "request_id"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Box<ErrorBody>,
}

impl ApiError {
    fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Box::new(ErrorBody {
                error: ErrorDetail {
                    code: code.into(),
                    message: message.into(),
                },
                request_id: None,
            }),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn gateway_timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.body.request_id = Some(request_id.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.body.error.code
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::NotFound { .. } => Self::not_found(NOT_FOUND, message),
            ServiceError::AlreadyExists {
                entity: Entity::Team,
                ..
            } => Self::conflict(TEAM_EXISTS, message),
            ServiceError::AlreadyExists { .. } => Self::conflict(PR_EXISTS, message),
            ServiceError::AlreadyMerged(_) => Self::conflict(PR_MERGED, message),
            ServiceError::ReviewerNotAssigned { .. } => Self::conflict(NOT_ASSIGNED, message),
            ServiceError::NoCandidateAvailable { .. } => Self::conflict(NO_CANDIDATE, message),
            ServiceError::InvalidInput(_) => Self::bad_request(INVALID_INPUT, message),
            ServiceError::Timeout { .. } => Self::gateway_timeout(TIMEOUT, message),
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Store operation failed");
                Self::internal(INTERNAL, "internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::DbError;
    use prr_id::{PullRequestId, UserId};

    fn status_and_code(err: ServiceError) -> (StatusCode, String) {
        let api = ApiError::from(err);
        (api.status, api.code().to_string())
    }

    #[test]
    fn test_service_errors_map_to_wire_codes() {
        let pr = PullRequestId::parse("pr-1").unwrap();
        let user = UserId::parse("B").unwrap();

        let cases = [
            (
                ServiceError::not_found(Entity::User, "B"),
                StatusCode::NOT_FOUND,
                NOT_FOUND,
            ),
            (
                ServiceError::already_exists(Entity::Team, "core"),
                StatusCode::CONFLICT,
                TEAM_EXISTS,
            ),
            (
                ServiceError::already_exists(Entity::PullRequest, "pr-1"),
                StatusCode::CONFLICT,
                PR_EXISTS,
            ),
            (
                ServiceError::AlreadyMerged(pr.clone()),
                StatusCode::CONFLICT,
                PR_MERGED,
            ),
            (
                ServiceError::ReviewerNotAssigned {
                    pull_request: pr,
                    reviewer: user.clone(),
                },
                StatusCode::CONFLICT,
                NOT_ASSIGNED,
            ),
            (
                ServiceError::NoCandidateAvailable { removed: user },
                StatusCode::CONFLICT,
                NO_CANDIDATE,
            ),
            (
                ServiceError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
                INVALID_INPUT,
            ),
            (
                ServiceError::Timeout {
                    op: "merge_pr",
                    after: Duration::from_millis(5),
                },
                StatusCode::GATEWAY_TIMEOUT,
                TIMEOUT,
            ),
            (
                ServiceError::Store(DbError::Inconsistent("gone".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL,
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(status_and_code(err), (status, code.to_string()));
        }
    }

    #[test]
    fn test_store_error_message_is_not_leaked() {
        let api = ApiError::from(ServiceError::Store(DbError::Inconsistent(
            "row 42 vanished".into(),
        )))
        .with_request_id("req_1");

        let json = serde_json::to_value(&*api.body).unwrap();
        assert_eq!(json["error"]["message"], "internal server error");
        assert_eq!(json["request_id"], "req_1");
    }
}
