//! Background persistence for the trial log and session results.
//!
//! The `TrialController` is synchronous and must never wait on I/O, so it
//! talks to a `ChannelSink`. A `Recorder` task drains the channel into the
//! storage repositories. Write failures are logged and counted; the task
//! keeps going.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use quiz_core::model::{RecordedEvent, SessionResult};
use storage::repository::{SessionResultRepository, Storage, TrialLogRepository};

use crate::error::SinkError;
use crate::quiz::{SessionFinalizer, TrialLogSink};

/// Messages queued for the recorder task.
#[derive(Debug)]
pub enum RecordMessage {
    Event(Box<RecordedEvent>),
    Finalized(Box<SessionResult>),
}

/// Sending half handed to the controller as both trial log and finalizer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RecordMessage>,
}

impl ChannelSink {
    fn send(&self, message: RecordMessage) -> Result<(), SinkError> {
        self.tx.send(message).map_err(|_| SinkError::Closed)
    }
}

impl TrialLogSink for ChannelSink {
    fn record(&self, event: &RecordedEvent) -> Result<(), SinkError> {
        self.send(RecordMessage::Event(Box::new(event.clone())))
    }
}

impl SessionFinalizer for ChannelSink {
    fn finalize(&self, result: &SessionResult) -> Result<(), SinkError> {
        self.send(RecordMessage::Finalized(Box::new(result.clone())))
    }
}

/// What the recorder managed to write before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderReport {
    pub events_written: u64,
    pub results_written: u64,
    pub failures: u64,
}

impl RecorderReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Drains queued records into storage.
#[derive(Clone)]
pub struct Recorder {
    trial_logs: Arc<dyn TrialLogRepository>,
    results: Arc<dyn SessionResultRepository>,
}

impl Recorder {
    #[must_use]
    pub fn new(storage: &Storage) -> Self {
        Self {
            trial_logs: Arc::clone(&storage.trial_logs),
            results: Arc::clone(&storage.results),
        }
    }

    /// A fresh unbounded channel.
    #[must_use]
    pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<RecordMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }

    /// Spawn the recorder on the current runtime.
    ///
    /// The task ends once every `ChannelSink` clone has been dropped and the
    /// queue is empty.
    #[must_use]
    pub fn spawn(self) -> (ChannelSink, JoinHandle<RecorderReport>) {
        let (sink, rx) = Self::channel();
        let handle = tokio::spawn(self.run(rx));
        (sink, handle)
    }

    /// Write messages until the channel closes.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<RecordMessage>) -> RecorderReport {
        debug!("recorder started");
        let mut report = RecorderReport::default();

        while let Some(message) = rx.recv().await {
            match message {
                RecordMessage::Event(event) => {
                    trace!(session_id = %event.session_id, phase = event.event.phase(), "writing trial event");
                    match self.trial_logs.append_event(&event).await {
                        Ok(_) => report.events_written += 1,
                        Err(err) => {
                            warn!(session_id = %event.session_id, %err, "failed to write trial event");
                            report.failures += 1;
                        }
                    }
                }
                RecordMessage::Finalized(result) => {
                    match self.results.save_result(&result).await {
                        Ok(()) => report.results_written += 1,
                        Err(err) => {
                            warn!(session_id = %result.session_id(), %err, "failed to save session result");
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        debug!(
            events = report.events_written,
            results = report.results_written,
            failures = report.failures,
            "recorder stopped"
        );
        report
    }
}
