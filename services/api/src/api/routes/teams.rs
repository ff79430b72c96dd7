//! Team endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prr_id::{TeamName, UserId};
use serde::{Deserialize, Serialize};

use super::TeamMemberDto;
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::request_context::RequestContext;
use crate::model::{NewMember, Team};
use crate::service::{parse_key, ServiceError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_team))
        .route("/get", get(get_team))
}

#[derive(Debug, Deserialize)]
pub struct AddTeamRequest {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMemberDto>,
}

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_name: String,
}

#[derive(Debug, Serialize)]
pub struct TeamDto {
    pub team_name: TeamName,
    pub members: Vec<TeamMemberDto>,
}

impl From<Team> for TeamDto {
    fn from(team: Team) -> Self {
        Self {
            team_name: team.team_name,
            members: team.members.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddTeamResponse {
    pub team: TeamDto,
}

/// POST /team/add
async fn add_team(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<AddTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let team_name: TeamName = parse_key("team_name", &req.team_name).map_err(|e| ctx.error(e))?;

    let members = req
        .members
        .into_iter()
        .map(|m| {
            Ok(NewMember {
                user_id: parse_key::<UserId>("user_id", &m.user_id)?,
                username: m.username,
                is_active: m.is_active,
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()
        .map_err(|e| ctx.error(e))?;

    let team = state
        .roster()
        .create_team(team_name, members)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok((
        StatusCode::CREATED,
        Json(AddTeamResponse { team: team.into() }),
    ))
}

/// GET /team/get?team_name=
async fn get_team(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<TeamQuery>,
) -> Result<Json<TeamDto>, ApiError> {
    let team_name: TeamName = parse_key("team_name", &query.team_name).map_err(|e| ctx.error(e))?;

    let team = state
        .roster()
        .get_team(&team_name)
        .await
        .map_err(|e| ctx.error(e))?;

    Ok(Json(team.into()))
}
