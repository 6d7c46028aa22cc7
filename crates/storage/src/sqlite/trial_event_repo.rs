use quiz_core::model::{RecordedEvent, SessionId, TrialEvent};
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{StorageError, TrialLogRepository};

#[async_trait::async_trait]
impl TrialLogRepository for SqliteRepository {
    async fn append_event(&self, event: &RecordedEvent) -> Result<i64, StorageError> {
        let payload = serde_json::to_string(&event.event).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO trial_events (session_id, recorded_at, phase, payload)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(event.session_id.to_string())
        .bind(event.recorded_at)
        .bind(event.event.phase())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<RecordedEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT recorded_at, payload
                FROM trial_events
                WHERE session_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let recorded_at = row.try_get("recorded_at").map_err(ser)?;
            let payload: String = row.try_get("payload").map_err(ser)?;
            let event: TrialEvent = serde_json::from_str(&payload).map_err(ser)?;
            out.push(RecordedEvent::new(session_id, recorded_at, event));
        }
        Ok(out)
    }
}
