//! Pull request endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prr_id::{PullRequestId, UserId};
use serde::{Deserialize, Serialize};

use super::{PullRequestDto, PullRequestEnvelope};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::request_context::RequestContext;
use crate::service::parse_key;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_pull_request))
        .route("/merge", post(merge_pull_request))
        .route("/reassign", post(reassign_reviewer))
        .route("/get", get(get_pull_request))
}

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

/// Body of merge requests and query of `/get`.
#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReassignResponse {
    pub pr: PullRequestDto,
    pub replaced_by: UserId,
}

/// POST /pull-request/create
async fn create_pull_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<CreatePullRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PullRequestId =
        parse_key("pull_request_id", &req.pull_request_id).map_err(|e| ctx.error(e))?;
    let author_id: UserId = parse_key("author_id", &req.author_id).map_err(|e| ctx.error(e))?;

    let pr = state
        .reviews()
        .create_pr(id, req.pull_request_name, author_id)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok((StatusCode::CREATED, Json(PullRequestEnvelope::from(pr))))
}

/// POST /pull-request/merge
async fn merge_pull_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<PullRequestRef>,
) -> Result<Json<PullRequestEnvelope>, ApiError> {
    let id: PullRequestId =
        parse_key("pull_request_id", &req.pull_request_id).map_err(|e| ctx.error(e))?;

    let pr = state
        .reviews()
        .merge_pr(&id)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(pr.into()))
}

/// POST /pull-request/reassign
async fn reassign_reviewer(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<ReassignRequest>,
) -> Result<Json<ReassignResponse>, ApiError> {
    let id: PullRequestId =
        parse_key("pull_request_id", &req.pull_request_id).map_err(|e| ctx.error(e))?;
    let old_reviewer: UserId =
        parse_key("old_user_id", &req.old_user_id).map_err(|e| ctx.error(e))?;

    let reassignment = state
        .reviews()
        .reassign_reviewer(&id, &old_reviewer)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(ReassignResponse {
        pr: reassignment.pull_request.into(),
        replaced_by: reassignment.replaced_by,
    }))
}

/// GET /pull-request/get?pull_request_id=
async fn get_pull_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<PullRequestRef>,
) -> Result<Json<PullRequestEnvelope>, ApiError> {
    let id: PullRequestId =
        parse_key("pull_request_id", &query.pull_request_id).map_err(|e| ctx.error(e))?;

    let pr = state
        .reviews()
        .get_pr(&id)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(pr.into()))
}
