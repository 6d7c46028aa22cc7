use serde::Serialize;
use std::sync::Arc;

use quiz_core::model::{Condition, RecordedEvent, SessionResult};
use storage::repository::{SessionResultRepository, Storage, TrialLogRepository};

use crate::error::HistoryError;

//
// ─── VIEW MODELS ───────────────────────────────────────────────────────────────
//

/// One stored session, optionally with its trial log, ready for JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionExport {
    #[serde(flatten)]
    pub result: SessionResult,
    pub score_percent: f64,
    /// Dollars earned, from the bonus rate recorded with the session.
    pub bonus: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<RecordedEvent>>,
}

/// Aggregate outcome of all sessions in one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionStats {
    pub condition: Condition,
    pub sessions: u64,
    pub timeouts: u64,
    /// Mean of per-session scores, over sessions with at least one attempt.
    pub mean_score: Option<f64>,
    pub mean_attempted: Option<f64>,
}

/// Per-condition summary, always one row per condition in `Condition::ALL` order.
#[must_use]
pub fn summarize_by_condition(results: &[SessionResult]) -> Vec<ConditionStats> {
    Condition::ALL
        .iter()
        .map(|&condition| {
            let rows: Vec<&SessionResult> = results
                .iter()
                .filter(|r| r.condition() == condition)
                .collect();
            let scores: Vec<f64> = rows.iter().filter_map(|r| r.score()).collect();
            let attempted: Vec<f64> = rows
                .iter()
                .map(|r| f64::from(r.questions_attempted()))
                .collect();

            ConditionStats {
                condition,
                sessions: rows.len() as u64,
                timeouts: rows.iter().filter(|r| r.timed_out()).count() as u64,
                mean_score: mean(&scores),
                mean_attempted: mean(&attempted),
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read side of the study data, for the administration commands.
#[derive(Clone)]
pub struct ResultHistoryService {
    results: Arc<dyn SessionResultRepository>,
    trial_logs: Arc<dyn TrialLogRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(storage: &Storage) -> Self {
        Self {
            results: Arc::clone(&storage.results),
            trial_logs: Arc::clone(&storage.trial_logs),
        }
    }

    /// Most recently finished sessions first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<SessionResult>, HistoryError> {
        Ok(self.results.list_results(limit).await?)
    }

    /// Number of stored sessions. Also the default counterbalance signal.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn count_sessions(&self) -> Result<u64, HistoryError> {
        Ok(self.results.count_results().await?)
    }

    /// Every stored session, newest first, optionally with its trial log.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn export(&self, with_events: bool) -> Result<Vec<SessionExport>, HistoryError> {
        let results = self.results.list_results(u32::MAX).await?;
        let mut out = Vec::with_capacity(results.len());
        for result in results {
            let events = if with_events {
                Some(self.trial_logs.events_for_session(result.session_id()).await?)
            } else {
                None
            };
            out.push(SessionExport {
                score_percent: result.score_percent(),
                bonus: result.bonus(),
                result,
                events,
            });
        }
        Ok(out)
    }

    /// Per-condition statistics over every stored session.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn stats(&self) -> Result<Vec<ConditionStats>, HistoryError> {
        let results = self.results.list_results(u32::MAX).await?;
        Ok(summarize_by_condition(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{FinishReason, SessionId, SessionTally, TrialEvent};
    use quiz_core::time::fixed_now;

    fn result(condition: Condition, reason: FinishReason, correct: u32, attempted: u32) -> SessionResult {
        SessionResult::record(
            SessionId::new_random(),
            None,
            condition,
            reason,
            SessionTally {
                correct,
                attempted,
                total: 6,
            },
            0,
            fixed_now(),
            fixed_now() + Duration::minutes(i64::from(attempted)),
        )
    }

    #[test]
    fn summarizes_each_condition() {
        let results = vec![
            result(Condition::Adaptive, FinishReason::Completed, 6, 6),
            result(Condition::Adaptive, FinishReason::TimedOut, 1, 2),
            result(Condition::Static, FinishReason::TimedOut, 0, 0),
        ];
        let stats = summarize_by_condition(&results);

        assert_eq!(stats.len(), 2);
        let adaptive = &stats[0];
        assert_eq!(adaptive.condition, Condition::Adaptive);
        assert_eq!(adaptive.sessions, 2);
        assert_eq!(adaptive.timeouts, 1);
        assert_eq!(adaptive.mean_score, Some(0.75));
        assert_eq!(adaptive.mean_attempted, Some(4.0));

        let fixed = &stats[1];
        assert_eq!(fixed.sessions, 1);
        assert_eq!(fixed.mean_score, None);
        assert_eq!(fixed.mean_attempted, Some(0.0));
    }

    #[test]
    fn empty_history_yields_zero_rows() {
        let stats = summarize_by_condition(&[]);
        assert!(stats.iter().all(|s| s.sessions == 0 && s.mean_score.is_none()));
    }

    #[tokio::test]
    async fn export_attaches_events_on_request() {
        let storage = Storage::in_memory();
        let r = result(Condition::Static, FinishReason::Completed, 3, 6)
            .with_bonus_per_correct_cents(2);
        storage.results.save_result(&r).await.unwrap();
        storage
            .trial_logs
            .append_event(&RecordedEvent::new(
                r.session_id(),
                fixed_now(),
                TrialEvent::Assignment {
                    condition: Condition::Static,
                },
            ))
            .await
            .unwrap();

        let history = ResultHistoryService::new(&storage);
        let bare = history.export(false).await.unwrap();
        assert_eq!(bare.len(), 1);
        assert!(bare[0].events.is_none());
        assert!((bare[0].score_percent - 50.0).abs() < 1e-9);
        assert!((bare[0].bonus - 0.06).abs() < 1e-9);

        let full = history.export(true).await.unwrap();
        assert_eq!(full[0].events.as_ref().map(Vec::len), Some(1));

        let json = serde_json::to_value(&full[0]).unwrap();
        assert_eq!(json["condition"], "static");
        assert_eq!(json["events"][0]["phase"], "ASSIGNMENT");
        assert_eq!(json["bonus_per_correct_cents"], 2);
        assert_eq!(history.count_sessions().await.unwrap(), 1);
    }
}
