//! Pull request and reviewer assignment storage.
//!
//! Reviewer sets live in `pull_request_reviewers`, one row per
//! (pull request, user). Reads fold them back into [`PullRequest`] with an
//! `ARRAY(...)` subquery so a listing costs one round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prr_id::{PullRequestId, UserId};
use sqlx::{postgres::PgRow, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use super::{key_column, DbError, PgStore};
use crate::model::{Member, NewPullRequest, PrStatus, PullRequest};
use crate::store::{CreateOutcome, MergeOutcome, PullRequestStore, ReviewTransaction};

const SELECT_PULL_REQUEST: &str = r#"
    SELECT pr.pull_request_id,
           pr.pull_request_name,
           pr.author_id,
           pr.status,
           pr.created_at,
           pr.merged_at,
           ARRAY(
               SELECT r.user_id
               FROM pull_request_reviewers r
               WHERE r.pull_request_id = pr.pull_request_id
               ORDER BY r.user_id
           ) AS assigned_reviewers
    FROM pull_requests pr
"#;

impl<'r> sqlx::FromRow<'r, PgRow> for PullRequest {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PrStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        let reviewers: Vec<String> = row.try_get("assigned_reviewers")?;
        let assigned_reviewers = reviewers
            .iter()
            .map(|raw| UserId::parse(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "assigned_reviewers".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            pull_request_id: key_column(row, "pull_request_id")?,
            pull_request_name: row.try_get("pull_request_name")?,
            author_id: key_column(row, "author_id")?,
            status,
            assigned_reviewers,
            created_at: row.try_get("created_at")?,
            merged_at: row.try_get("merged_at")?,
        })
    }
}

#[async_trait]
impl PullRequestStore for PgStore {
    async fn get_pull_request(&self, id: &PullRequestId) -> Result<Option<PullRequest>, DbError> {
        sqlx::query_as::<_, PullRequest>(&format!(
            "{SELECT_PULL_REQUEST} WHERE pr.pull_request_id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    #[instrument(skip(self, pr), fields(pull_request_id = %pr.pull_request_id))]
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<CreateOutcome, DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Transaction)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id,
                pull_request_name,
                author_id,
                status,
                created_at
            )
            VALUES ($1, $2, $3, 'OPEN', $4)
            ON CONFLICT (pull_request_id) DO NOTHING
            "#,
        )
        .bind(pr.pull_request_id.as_str())
        .bind(&pr.pull_request_name)
        .bind(pr.author_id.as_str())
        .bind(pr.created_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        if inserted.rows_affected() == 0 {
            return Ok(CreateOutcome::AlreadyExists);
        }

        if !pr.reviewers.is_empty() {
            let reviewers: Vec<&str> = pr.reviewers.iter().map(UserId::as_str).collect();
            sqlx::query(
                r#"
                INSERT INTO pull_request_reviewers (pull_request_id, user_id)
                SELECT $1, UNNEST($2::text[])
                "#,
            )
            .bind(pr.pull_request_id.as_str())
            .bind(&reviewers)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;
        }

        tx.commit().await.map_err(DbError::Transaction)?;
        debug!(reviewers = pr.reviewers.len(), "Pull request stored");
        Ok(CreateOutcome::Created)
    }

    async fn mark_merged(
        &self,
        id: &PullRequestId,
        merged_at: DateTime<Utc>,
    ) -> Result<MergeOutcome, DbError> {
        let updated = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = 'MERGED',
                merged_at = $2
            WHERE pull_request_id = $1 AND status = 'OPEN'
            "#,
        )
        .bind(id.as_str())
        .bind(merged_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        let current = self.get_pull_request(id).await?;
        Ok(match (updated.rows_affected(), current) {
            (_, None) => MergeOutcome::NotFound,
            (0, Some(pr)) => MergeOutcome::AlreadyMerged(pr),
            (_, Some(pr)) => MergeOutcome::Merged(pr),
        })
    }

    async fn list_by_reviewer(&self, user_id: &UserId) -> Result<Vec<PullRequest>, DbError> {
        sqlx::query_as::<_, PullRequest>(&format!(
            r#"{SELECT_PULL_REQUEST}
            WHERE EXISTS (
                SELECT 1
                FROM pull_request_reviewers rev
                WHERE rev.pull_request_id = pr.pull_request_id
                  AND rev.user_id = $1
            )
            ORDER BY pr.created_at ASC, pr.pull_request_id ASC"#
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn begin_review(&self) -> Result<Box<dyn ReviewTransaction>, DbError> {
        let tx = self.pool.begin().await.map_err(DbError::Transaction)?;
        Ok(Box::new(PgReviewTransaction { tx }))
    }
}

/// Reviewer edit running inside a Postgres transaction.
///
/// The pull request row is locked with `FOR UPDATE`, so concurrent edits of
/// the same pull request queue up behind each other. Dropping the value
/// without committing rolls the transaction back.
struct PgReviewTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReviewTransaction for PgReviewTransaction {
    async fn lock_pull_request(
        &mut self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, DbError> {
        let locked: Option<String> = sqlx::query_scalar(
            "SELECT pull_request_id FROM pull_requests WHERE pull_request_id = $1 FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::Query)?;

        if locked.is_none() {
            return Ok(None);
        }

        // Separate statement: a subquery in the locking SELECT would still see
        // the snapshot taken before the lock wait.
        self.load_pull_request(id).await
    }

    async fn remove_reviewer(
        &mut self,
        id: &PullRequestId,
        user_id: &UserId,
    ) -> Result<bool, DbError> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM pull_request_reviewers
            WHERE pull_request_id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_str())
        .bind(user_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::Query)?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn team_roster_of(&mut self, user_id: &UserId) -> Result<Vec<Member>, DbError> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT u.user_id, u.username, u.team_name, u.is_active
            FROM users u
            WHERE u.team_name = (SELECT team_name FROM users WHERE user_id = $1)
            ORDER BY u.user_id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DbError::Query)
    }

    async fn add_reviewer(&mut self, id: &PullRequestId, user_id: &UserId) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO pull_request_reviewers (pull_request_id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(id.as_str())
        .bind(user_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::Query)?;

        Ok(())
    }

    async fn load_pull_request(
        &mut self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, DbError> {
        sqlx::query_as::<_, PullRequest>(&format!(
            "{SELECT_PULL_REQUEST} WHERE pr.pull_request_id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::Query)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await.map_err(DbError::Transaction)
    }
}
