use quiz_core::model::{SessionId, SessionResult};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{map_result_row, ser},
};
use crate::repository::{SessionResultRepository, StorageError};

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait::async_trait]
impl SessionResultRepository for SqliteRepository {
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError> {
        let tally = result.tally();

        sqlx::query(
            r"
                INSERT INTO session_results (
                    session_id, participant, condition, reason,
                    correct, attempted, total, remaining_seconds,
                    started_at, finished_at, bonus_per_correct_cents
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(result.session_id().to_string())
        .bind(result.participant())
        .bind(result.condition().as_str())
        .bind(result.reason().as_str())
        .bind(i64::from(tally.correct))
        .bind(i64::from(tally.attempted))
        .bind(i64::from(tally.total))
        .bind(i64::from(result.remaining_seconds()))
        .bind(result.started_at())
        .bind(result.finished_at())
        .bind(i64::from(result.bonus_per_correct_cents()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_result(&self, session_id: SessionId) -> Result<SessionResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    session_id, participant, condition, reason,
                    correct, attempted, total, remaining_seconds,
                    started_at, finished_at, bonus_per_correct_cents
                FROM session_results
                WHERE session_id = ?1
            ",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_result_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<SessionResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    session_id, participant, condition, reason,
                    correct, attempted, total, remaining_seconds,
                    started_at, finished_at, bonus_per_correct_cents
                FROM session_results
                ORDER BY finished_at DESC, session_id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }

    async fn count_results(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM session_results")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }
}
