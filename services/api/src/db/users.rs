//! User storage.

use async_trait::async_trait;
use prr_id::UserId;
use sqlx::{postgres::PgRow, Row};
use tracing::debug;

use super::{key_column, DbError, PgStore};
use crate::model::Member;
use crate::store::UserStore;

impl<'r> sqlx::FromRow<'r, PgRow> for Member {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: key_column(row, "user_id")?,
            username: row.try_get("username")?,
            team_name: key_column(row, "team_name")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Member>, DbError> {
        debug!(user_id = %user_id, "Loading user");

        sqlx::query_as::<_, Member>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn set_active(
        &self,
        user_id: &UserId,
        is_active: bool,
    ) -> Result<Option<Member>, DbError> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE users
            SET is_active = $2,
                updated_at = now()
            WHERE user_id = $1
            RETURNING user_id, username, team_name, is_active
            "#,
        )
        .bind(user_id.as_str())
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}
