use super::seen::{admit, Admission, InMemorySeen, SeenStore};
use crate::model::Task;
use crate::tracker::Tracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Summary of a single poll cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub emitted: usize,
    pub skipped: usize,
    pub failed_statuses: Vec<String>,
    /// Cancelled or the consumer went away mid-cycle
    pub aborted: bool,
}

/// Periodically pulls matching tickets from the tracker and emits each one at most once
pub struct Poller<S: SeenStore = InMemorySeen> {
    tracker: Arc<dyn Tracker>,
    statuses: Vec<String>,
    interval: Duration,
    seen: S,
}

impl Poller<InMemorySeen> {
    pub fn new(tracker: Arc<dyn Tracker>, statuses: Vec<String>, interval: Duration) -> Self {
        Self::with_store(tracker, statuses, interval, InMemorySeen::default())
    }
}

impl<S: SeenStore> Poller<S> {
    pub fn with_store(
        tracker: Arc<dyn Tracker>,
        statuses: Vec<String>,
        interval: Duration,
        seen: S,
    ) -> Self {
        Self {
            tracker,
            statuses,
            interval,
            seen,
        }
    }

    pub fn seen(&self) -> &S {
        &self.seen
    }

    /// Query every status once, in order, and emit unseen tickets.
    ///
    /// A failing status query is logged and skipped. A full channel blocks the
    /// cycle until space frees up or `cancel` fires.
    pub async fn poll_once(
        &mut self,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<Task>,
    ) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        for status in &self.statuses {
            if cancel.is_cancelled() {
                outcome.aborted = true;
                return outcome;
            }

            let tasks = match self.tracker.search_by_status(status).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!("Polling status '{}' failed: {}", status, e);
                    outcome.failed_statuses.push(status.clone());
                    continue;
                }
            };

            for task in tasks {
                if admit(&self.seen, &task.ticket_id) == Admission::Duplicate {
                    outcome.skipped += 1;
                    continue;
                }
                self.seen.insert(&task.ticket_id);

                let ticket_id = task.ticket_id.clone();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Poll cancelled before {} could be queued", ticket_id);
                        outcome.aborted = true;
                        return outcome;
                    }
                    sent = tx.send(task) => {
                        if sent.is_err() {
                            warn!("Task queue closed, dropping {}", ticket_id);
                            outcome.aborted = true;
                            return outcome;
                        }
                        info!("Queued {} from status '{}'", ticket_id, status);
                        outcome.emitted += 1;
                    }
                }
            }
        }

        outcome
    }

    /// Poll immediately, then on every interval tick, until cancelled or the queue closes
    pub async fn run(mut self, cancel: CancellationToken, tx: mpsc::Sender<Task>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling {:?} every {:?}", self.statuses, self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = self.poll_once(&cancel, &tx).await;
            debug!(
                "Poll cycle: {} queued, {} already seen, {} status(es) failed",
                outcome.emitted,
                outcome.skipped,
                outcome.failed_statuses.len()
            );

            if tx.is_closed() {
                warn!("Task queue closed, stopping poller");
                break;
            }
            if outcome.aborted && cancel.is_cancelled() {
                break;
            }
        }

        info!("Poller stopped after seeing {} ticket(s)", self.seen.len());
    }
}
