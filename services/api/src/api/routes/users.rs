//! User endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use prr_id::UserId;
use serde::{Deserialize, Serialize};

use super::{PullRequestShortDto, UserDto};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::request_context::RequestContext;
use crate::service::parse_key;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/set-active", post(set_active))
        .route("/get-review", get(get_review))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub user_id: UserId,
    pub pull_requests: Vec<PullRequestShortDto>,
}

/// POST /users/set-active
async fn set_active(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user_id: UserId = parse_key("user_id", &req.user_id).map_err(|e| ctx.error(e))?;

    let member = state
        .roster()
        .set_active(&user_id, req.is_active)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(UserEnvelope {
        user: member.into(),
    }))
}

/// GET /users/get-review?user_id=
async fn get_review(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> Result<Json<ReviewsResponse>, ApiError> {
    let user_id: UserId = parse_key("user_id", &query.user_id).map_err(|e| ctx.error(e))?;

    let prs = state
        .reviews()
        .reviews_for(&user_id)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(ReviewsResponse {
        user_id,
        pull_requests: prs.into_iter().map(Into::into).collect(),
    }))
}
