use async_trait::async_trait;
use quiz_core::model::{RecordedEvent, SessionId, SessionResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append-only log of trial events.
#[async_trait]
pub trait TrialLogRepository: Send + Sync {
    /// Append one event and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn append_event(&self, event: &RecordedEvent) -> Result<i64, StorageError>;

    /// Events of one session in the order they were appended.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<RecordedEvent>, StorageError>;
}

/// Final session results, one per session.
#[async_trait]
pub trait SessionResultRepository: Send + Sync {
    /// Store a finished session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already stored.
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError>;

    /// Fetch one session result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_result(&self, session_id: SessionId) -> Result<SessionResult, StorageError>;

    /// Most recently finished sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_results(&self, limit: u32) -> Result<Vec<SessionResult>, StorageError>;

    /// Number of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_results(&self) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and dry runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    results: Arc<Mutex<HashMap<SessionId, SessionResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrialLogRepository for InMemoryRepository {
    async fn append_event(&self, event: &RecordedEvent) -> Result<i64, StorageError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(event.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<RecordedEvent>, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionResultRepository for InMemoryRepository {
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&result.session_id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(result.session_id(), result.clone());
        Ok(())
    }

    async fn get_result(&self, session_id: SessionId) -> Result<SessionResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&session_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<SessionResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<SessionResult> = guard.values().cloned().collect();
        out.sort_by(|a, b| {
            b.finished_at()
                .cmp(&a.finished_at())
                .then_with(|| b.session_id().cmp(&a.session_id()))
        });
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn count_results(&self) -> Result<u64, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len() as u64)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub trial_logs: Arc<dyn TrialLogRepository>,
    pub results: Arc<dyn SessionResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let trial_logs: Arc<dyn TrialLogRepository> = Arc::new(repo.clone());
        let results: Arc<dyn SessionResultRepository> = Arc::new(repo);
        Self {
            trial_logs,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Condition, FinishReason, SessionTally, TrialEvent};
    use quiz_core::time::fixed_now;

    fn result(minutes_later: i64) -> SessionResult {
        let started = fixed_now();
        SessionResult::record(
            SessionId::new_random(),
            None,
            Condition::Adaptive,
            FinishReason::Completed,
            SessionTally {
                correct: 2,
                attempted: 3,
                total: 3,
            },
            120,
            started,
            started + Duration::minutes(minutes_later),
        )
    }

    #[tokio::test]
    async fn duplicate_result_conflicts() {
        let repo = InMemoryRepository::new();
        let r = result(1);
        repo.save_result(&r).await.unwrap();
        let err = repo.save_result(&r).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.count_results().await.unwrap(), 1);
        assert_eq!(repo.get_result(r.session_id()).await.unwrap(), r);
    }

    #[tokio::test]
    async fn list_orders_most_recent_first() {
        let repo = InMemoryRepository::new();
        let older = result(1);
        let newer = result(5);
        repo.save_result(&older).await.unwrap();
        repo.save_result(&newer).await.unwrap();

        let listed = repo.list_results(10).await.unwrap();
        assert_eq!(listed, vec![newer.clone(), older]);
        assert_eq!(repo.list_results(1).await.unwrap(), vec![newer]);
    }

    #[tokio::test]
    async fn events_are_filtered_by_session() {
        let repo = InMemoryRepository::new();
        let a = SessionId::new_random();
        let b = SessionId::new_random();
        let event = |id| {
            RecordedEvent::new(
                id,
                fixed_now(),
                TrialEvent::Assignment {
                    condition: Condition::Static,
                },
            )
        };
        repo.append_event(&event(a)).await.unwrap();
        repo.append_event(&event(b)).await.unwrap();
        repo.append_event(&event(a)).await.unwrap();

        assert_eq!(repo.events_for_session(a).await.unwrap().len(), 2);
        assert_eq!(repo.events_for_session(b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_result_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_result(SessionId::new_random()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
