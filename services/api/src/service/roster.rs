//! Team and member operations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use prr_id::{TeamName, UserId};
use tracing::{debug, info, instrument, warn};

use super::{with_deadline, Entity, ServiceConfig, ServiceError};
use crate::db::DbError;
use crate::model::{Member, NewMember, Team};
use crate::store::{CreateOutcome, Store};

#[derive(Clone)]
pub struct RosterService {
    store: Arc<dyn Store>,
    op_timeout: Duration,
}

impl RosterService {
    pub fn new(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self {
            store,
            op_timeout: config.op_timeout,
        }
    }

    /// Create a team and upsert its members.
    ///
    /// Members that already belong to another team move to this one.
    #[instrument(skip_all, fields(team_name = %team_name, members = members.len()))]
    pub async fn create_team(
        &self,
        team_name: TeamName,
        members: Vec<NewMember>,
    ) -> Result<Team, ServiceError> {
        validate_members(&members)?;

        with_deadline("create_team", self.op_timeout, async {
            match self.store.create_team(&team_name, &members).await? {
                CreateOutcome::Created => {}
                CreateOutcome::AlreadyExists => {
                    warn!("Team already exists");
                    return Err(ServiceError::already_exists(Entity::Team, &team_name));
                }
            }

            let team = self.store.get_team(&team_name).await?.ok_or_else(|| {
                DbError::Inconsistent(format!("team {team_name} missing after insert"))
            })?;

            info!("Team created");
            Ok(team)
        })
        .await
    }

    #[instrument(skip_all, fields(team_name = %team_name))]
    pub async fn get_team(&self, team_name: &TeamName) -> Result<Team, ServiceError> {
        with_deadline("get_team", self.op_timeout, async {
            let team = self
                .store
                .get_team(team_name)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::Team, team_name))?;
            debug!(members = team.members.len(), "Team loaded");
            Ok(team)
        })
        .await
    }

    /// Flip a member's active flag. Existing reviewer assignments are kept.
    #[instrument(skip_all, fields(user_id = %user_id, is_active = is_active))]
    pub async fn set_active(&self, user_id: &UserId, is_active: bool) -> Result<Member, ServiceError> {
        with_deadline("set_active", self.op_timeout, async {
            let member = self
                .store
                .set_active(user_id, is_active)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::User, user_id))?;
            info!("Active flag updated");
            Ok(member)
        })
        .await
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: &UserId) -> Result<Member, ServiceError> {
        with_deadline("get_user", self.op_timeout, async {
            self.store
                .get_user(user_id)
                .await?
                .ok_or_else(|| ServiceError::not_found(Entity::User, user_id))
        })
        .await
    }
}

fn validate_members(members: &[NewMember]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for member in members {
        if !seen.insert(&member.user_id) {
            return Err(ServiceError::InvalidInput(format!(
                "duplicate member {}",
                member.user_id
            )));
        }
        if member.username.trim().is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "username of {} must not be empty",
                member.user_id
            )));
        }
    }
    Ok(())
}
