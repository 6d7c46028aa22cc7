use quiz_core::model::{Condition, FinishReason, SessionId, SessionResult, SessionTally};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn session_id_from_str(raw: &str) -> Result<SessionId, StorageError> {
    raw.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid session_id: {raw}")))
}

pub(crate) fn parse_condition(s: &str) -> Result<Condition, StorageError> {
    match s {
        "adaptive" => Ok(Condition::Adaptive),
        "static" => Ok(Condition::Static),
        _ => Err(StorageError::Serialization(format!("invalid condition: {s}"))),
    }
}

pub(crate) fn parse_reason(s: &str) -> Result<FinishReason, StorageError> {
    match s {
        "completed" => Ok(FinishReason::Completed),
        "timed_out" => Ok(FinishReason::TimedOut),
        _ => Err(StorageError::Serialization(format!("invalid reason: {s}"))),
    }
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionResult, StorageError> {
    let session_id = session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?;
    let participant: Option<String> = row.try_get("participant").map_err(ser)?;
    let condition = parse_condition(&row.try_get::<String, _>("condition").map_err(ser)?)?;
    let reason = parse_reason(&row.try_get::<String, _>("reason").map_err(ser)?)?;
    let tally = SessionTally {
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        attempted: u32_from_i64("attempted", row.try_get::<i64, _>("attempted").map_err(ser)?)?,
        total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
    };
    let remaining_seconds = u32_from_i64(
        "remaining_seconds",
        row.try_get::<i64, _>("remaining_seconds").map_err(ser)?,
    )?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let finished_at = row.try_get("finished_at").map_err(ser)?;
    let bonus_per_correct_cents = u32_from_i64(
        "bonus_per_correct_cents",
        row.try_get::<i64, _>("bonus_per_correct_cents").map_err(ser)?,
    )?;

    SessionResult::from_persisted(
        session_id,
        participant,
        condition,
        reason,
        tally,
        remaining_seconds,
        started_at,
        finished_at,
    )
    .map(|result| result.with_bonus_per_correct_cents(bonus_per_correct_cents))
    .map_err(ser)
}
