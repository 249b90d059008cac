use super::{ExecutionRuntime, RunHandle, RunStore};
use crate::error::RuntimeError;
use crate::model::{PipelineInput, RunId};
use crate::pipeline::{execute_pipeline, ActivityOptions, Activities, RunState, RunStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct RunEntry {
    status: watch::Receiver<RunStatus>,
    cancel: CancellationToken,
}

impl RunEntry {
    fn finished(status: RunStatus) -> Self {
        let (_, rx) = watch::channel(status);
        Self {
            status: rx,
            cancel: CancellationToken::new(),
        }
    }

    fn current(&self) -> RunStatus {
        self.status.borrow().clone()
    }
}

/// Single-node execution of pipeline runs.
///
/// Runs are keyed by their deterministic id, bounded by a worker semaphore, and
/// their terminal records are written to the run store so they survive a restart.
pub struct LocalRuntime {
    activities: Activities,
    options: ActivityOptions,
    task_queue: String,
    store: RunStore,
    slots: Arc<Semaphore>,
    runs: Mutex<HashMap<RunId, RunEntry>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl LocalRuntime {
    pub fn new(
        activities: Activities,
        options: ActivityOptions,
        task_queue: String,
        store: RunStore,
        max_concurrent_runs: usize,
    ) -> Self {
        let mut runs = HashMap::new();
        for record in store.load_all() {
            debug!("Restored {} ({})", record.run_id, record.state);
            runs.insert(record.run_id.clone(), RunEntry::finished(record));
        }
        if !runs.is_empty() {
            info!("Restored {} finished run(s) from {:?}", runs.len(), store);
        }

        Self {
            activities,
            options,
            task_queue,
            store,
            slots: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
            runs: Mutex::new(runs),
            workers: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<RunId, RunEntry>> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until the run reaches a terminal state
    pub async fn wait(&self, run_id: &RunId) -> Result<RunStatus, RuntimeError> {
        let mut rx = self
            .runs()
            .get(run_id)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| RuntimeError::NotFound(run_id.to_string()))?;

        let finished = rx
            .wait_for(|s| s.state.is_terminal())
            .await
            .map(|s| s.clone());
        // the sender only goes away once the worker is done
        Ok(finished.unwrap_or_else(|_| rx.borrow().clone()))
    }

    /// Cancel every in-flight run and wait for the workers to wind down
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .map(|mut w| w.drain(..).collect())
            .unwrap_or_default();
        info!("Draining {} run worker(s)", workers.len());
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                warn!("Run worker panicked: {}", e);
            }
        }
    }

    fn handle(&self, status: &RunStatus, attached: bool) -> RunHandle {
        RunHandle {
            run_id: status.run_id.clone(),
            execution_id: status.execution_id,
            state: status.state,
            attached,
            task_queue: self.task_queue.clone(),
        }
    }
}

#[async_trait]
impl ExecutionRuntime for LocalRuntime {
    async fn start(&self, run_id: RunId, input: PipelineInput) -> Result<RunHandle, RuntimeError> {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }

        let mut runs = self.runs();
        if let Some(entry) = runs.get(&run_id) {
            let current = entry.current();
            match current.state {
                RunState::Pending | RunState::Running | RunState::Succeeded => {
                    info!("{} already {}, attaching", run_id, current.state);
                    return Ok(self.handle(&current, true));
                }
                RunState::Failed | RunState::Cancelled => {
                    info!("{} previously {}, starting a new execution", run_id, current.state);
                }
            }
        }

        let mut initial = RunStatus::pending(&input);
        initial.run_id = run_id.clone();
        let handle = self.handle(&initial, false);

        let (tx, rx) = watch::channel(initial);
        let cancel = self.shutdown.child_token();
        runs.insert(
            run_id.clone(),
            RunEntry {
                status: rx,
                cancel: cancel.clone(),
            },
        );
        drop(runs);

        let activities = self.activities.clone();
        let options = self.options.clone();
        let slots = self.slots.clone();
        let store = self.store.clone();

        let worker = tokio::spawn(async move {
            let permit = tokio::select! {
                _ = cancel.cancelled() => None,
                permit = slots.acquire_owned() => permit.ok(),
            };

            let final_status = match permit {
                Some(_permit) => execute_pipeline(input, &activities, &options, &cancel, &tx).await,
                None => {
                    info!("{} cancelled before it started", run_id);
                    tx.send_modify(|s| s.finish(RunState::Cancelled, None));
                    tx.borrow().clone()
                }
            };

            if let Err(e) = store.save(&final_status) {
                warn!("Failed to persist {}: {}", run_id, e);
            }
        });

        if let Ok(mut workers) = self.workers.lock() {
            workers.retain(|w| !w.is_finished());
            workers.push(worker);
        }

        info!(
            "Started {} (execution {}) on {}",
            handle.run_id, handle.execution_id, self.task_queue
        );
        Ok(handle)
    }

    async fn query(&self, run_id: &RunId) -> Result<RunStatus, RuntimeError> {
        self.runs()
            .get(run_id)
            .map(RunEntry::current)
            .ok_or_else(|| RuntimeError::NotFound(run_id.to_string()))
    }

    async fn cancel(&self, run_id: &RunId) -> Result<(), RuntimeError> {
        let runs = self.runs();
        let entry = runs
            .get(run_id)
            .ok_or_else(|| RuntimeError::NotFound(run_id.to_string()))?;

        if entry.current().state.is_terminal() {
            debug!("{} already finished, nothing to cancel", run_id);
        } else {
            info!("Cancelling {}", run_id);
            entry.cancel.cancel();
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RunStatus>, RuntimeError> {
        let mut all: Vec<RunStatus> = self.runs().values().map(RunEntry::current).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
