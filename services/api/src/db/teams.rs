//! Team and roster storage.

use async_trait::async_trait;
use prr_id::TeamName;
use tracing::debug;

use super::{DbError, PgStore};
use crate::model::{Member, NewMember, Team};
use crate::store::{CreateOutcome, RosterStore};

#[async_trait]
impl RosterStore for PgStore {
    async fn get_team(&self, team_name: &TeamName) -> Result<Option<Team>, DbError> {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT team_name FROM teams WHERE team_name = $1")
                .bind(team_name.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::Query)?;

        if exists.is_none() {
            return Ok(None);
        }

        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = $1
            ORDER BY user_id ASC
            "#,
        )
        .bind(team_name.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        debug!(team_name = %team_name, members = members.len(), "Loaded team");

        Ok(Some(Team {
            team_name: team_name.clone(),
            members,
        }))
    }

    async fn create_team(
        &self,
        team_name: &TeamName,
        members: &[NewMember],
    ) -> Result<CreateOutcome, DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Transaction)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO teams (team_name)
            VALUES ($1)
            ON CONFLICT (team_name) DO NOTHING
            "#,
        )
        .bind(team_name.as_str())
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        if inserted.rows_affected() == 0 {
            return Ok(CreateOutcome::AlreadyExists);
        }

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO users (user_id, username, team_name, is_active)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id) DO UPDATE SET
                    username = EXCLUDED.username,
                    team_name = EXCLUDED.team_name,
                    is_active = EXCLUDED.is_active,
                    updated_at = now()
                "#,
            )
            .bind(member.user_id.as_str())
            .bind(&member.username)
            .bind(team_name.as_str())
            .bind(member.is_active)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

            debug!(user_id = %member.user_id, team_name = %team_name, "Upserted member");
        }

        tx.commit().await.map_err(DbError::Transaction)?;
        Ok(CreateOutcome::Created)
    }
}
