use std::time::Duration;

use rand::Rng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use quiz_core::model::{FeedbackDirective, SessionResult};
use services::{SubmitOutcome, TickOutcome, TrialController, TrialError, TrialState};

use crate::terminal::{TerminalSurface, parse_action};

const TICK: Duration = Duration::from_secs(1);

/// Drive one session on the terminal until it finishes or stdin closes.
///
/// Three event sources feed the controller: typed lines, a one-second
/// countdown tick, and the single pending auto-advance (if any).
///
/// # Errors
///
/// Returns an error if the session cannot start or stdin fails.
pub async fn run_session<R: Rng + ?Sized>(
    controller: &mut TrialController,
    rng: &mut R,
) -> Result<Option<SessionResult>, Box<dyn std::error::Error>> {
    controller.start(rng)?;
    drive(controller, BufReader::new(tokio::io::stdin()).lines()).await
}

async fn drive<R: AsyncBufRead + Unpin>(
    controller: &mut TrialController,
    mut lines: Lines<R>,
) -> Result<Option<SessionResult>, Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let advance = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(advance);
    let mut armed: Option<u64> = None;
    let mut feedback: Option<FeedbackDirective> = None;

    while !controller.is_finished() {
        sync_advance(controller, &mut armed, advance.as_mut());

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!(session_id = %controller.session_id(), "input closed before the session finished");
                    return Ok(None);
                };
                handle_line(controller, &line, &mut feedback);
            }
            _ = ticker.tick() => {
                if let TickOutcome::Running { remaining_seconds } = controller.tick() {
                    TerminalSurface::countdown(remaining_seconds);
                }
            }
            () = &mut advance, if armed.is_some() => {
                if let Some(token) = armed.take() {
                    controller.fire_advance(token);
                }
            }
        }
    }

    Ok(controller.result().cloned())
}

fn sync_advance(
    controller: &TrialController,
    armed: &mut Option<u64>,
    sleep: std::pin::Pin<&mut Sleep>,
) {
    match controller.pending_advance() {
        Some(pending) if *armed != Some(pending.token) => {
            sleep.reset(Instant::now() + pending.delay);
            *armed = Some(pending.token);
            debug!(token = pending.token, delay_ms = pending.delay.as_millis(), "auto-advance armed");
        }
        Some(_) => {}
        None => *armed = None,
    }
}

fn handle_line(
    controller: &mut TrialController,
    line: &str,
    feedback: &mut Option<FeedbackDirective>,
) {
    match controller.state() {
        TrialState::AwaitingResponse(_) => match controller.submit(line) {
            Ok(SubmitOutcome::Feedback(directive)) => *feedback = Some(directive),
            Ok(SubmitOutcome::Reprompt | SubmitOutcome::Ignored) => {}
            Err(err) => warn!(%err, "submission rejected"),
        },
        TrialState::Feedback(_) => {
            let Some(action) = parse_action(line) else {
                TerminalSurface::unknown_choice(line, feedback.as_ref());
                return;
            };
            match controller.acknowledge(action) {
                Ok(_) => {}
                Err(TrialError::ActionNotOffered(_)) => {
                    TerminalSurface::unknown_choice(line, feedback.as_ref());
                }
                Err(err) => warn!(%err, "acknowledgement rejected"),
            }
        }
        state => debug!(%state, "input ignored"),
    }
}
