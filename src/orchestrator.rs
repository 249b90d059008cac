use crate::error::DispatchError;
use crate::intake::{InMemorySeen, Poller, SeenStore};
use crate::model::{PipelineInput, Task};
use crate::planner::PlanSource;
use crate::runtime::{ExecutionRuntime, RunHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the control loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    /// The poller stopped feeding the queue
    IntakeClosed,
}

/// Intake -> planning -> durable start
pub struct Orchestrator<S: SeenStore = InMemorySeen> {
    poller: Poller<S>,
    planner: Arc<dyn PlanSource>,
    runtime: Arc<dyn ExecutionRuntime>,
    queue_capacity: usize,
}

impl<S: SeenStore + 'static> Orchestrator<S> {
    pub fn new(
        poller: Poller<S>,
        planner: Arc<dyn PlanSource>,
        runtime: Arc<dyn ExecutionRuntime>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            poller,
            planner,
            runtime,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Run until `cancel` fires. A task that fails to plan or start is logged and skipped.
    pub async fn run(self, cancel: CancellationToken) -> StopReason {
        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let intake_cancel = cancel.child_token();
        let intake = tokio::spawn(self.poller.run(intake_cancel.clone(), tx));

        info!("Orchestrator started (queue capacity {})", self.queue_capacity);

        let reason = loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                next = rx.recv() => match next {
                    Some(task) => task,
                    None => break StopReason::IntakeClosed,
                },
            };

            match dispatch(self.planner.as_ref(), self.runtime.as_ref(), task).await {
                Ok(handle) if handle.attached => {
                    debug!("{} already known, attached ({})", handle.run_id, handle.state)
                }
                Ok(handle) => info!("Started {} ({})", handle.run_id, handle.execution_id),
                Err(e) => error!("{}", e),
            }
        };

        intake_cancel.cancel();
        drop(rx);
        if let Err(e) = intake.await {
            warn!("Intake task ended abnormally: {}", e);
        }

        info!("Orchestrator stopped: {:?}", reason);
        reason
    }
}

/// Plan a task and hand it to the runtime under its deterministic run id
pub async fn dispatch(
    planner: &dyn PlanSource,
    runtime: &dyn ExecutionRuntime,
    task: Task,
) -> Result<RunHandle, DispatchError> {
    let ticket = task.ticket_id.clone();
    let plan = planner.generate_plan(&task).await.map_err(|e| {
        warn!("Planning failed for {}", ticket);
        DispatchError::Planning(e)
    })?;
    debug!("{}: plan with {} step(s)", ticket, plan.steps.len());

    let input = PipelineInput::new(task, plan);
    let handle = runtime.start(input.run_id(), input).await?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{task, FakePlanner, FakeRuntime, FakeTracker};
    use std::time::Duration;

    const READY: &str = "Ready for Development";

    fn tracker(tickets: &[&str]) -> Arc<FakeTracker> {
        let tasks = tickets.iter().map(|t| task(t, "Some work")).collect();
        Arc::new(FakeTracker::default().with_status(READY, tasks))
    }

    async fn wait_for_starts(runtime: &FakeRuntime, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while runtime.started_tickets().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_uses_deterministic_run_id() {
        let planner = FakePlanner::default();
        let runtime = FakeRuntime::default();

        let first = dispatch(&planner, &runtime, task("PROJ-1", "x")).await.unwrap();
        let second = dispatch(&planner, &runtime, task("PROJ-1", "x")).await.unwrap();

        assert_eq!(first.run_id.as_str(), "implementation-PROJ-1-app");
        assert_eq!(first.run_id, second.run_id);
        assert!(!first.attached);
        assert!(second.attached);
        assert_eq!(runtime.runs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_planning_error_skips_start() {
        let planner = FakePlanner {
            failing: ["PROJ-1".to_string()].into_iter().collect(),
            ..FakePlanner::default()
        };
        let runtime = FakeRuntime::default();

        let err = dispatch(&planner, &runtime, task("PROJ-1", "x")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Planning(_)));
        assert!(runtime.started_tickets().is_empty());
    }

    #[tokio::test]
    async fn test_bad_tasks_do_not_stop_the_loop() {
        let tracker = tracker(&["PROJ-1", "PROJ-2", "PROJ-3", "PROJ-4"]);
        let planner = Arc::new(FakePlanner {
            failing: ["PROJ-2".to_string()].into_iter().collect(),
            ..FakePlanner::default()
        });
        let runtime = Arc::new(FakeRuntime {
            failing: ["PROJ-3".to_string()].into_iter().collect(),
            ..FakeRuntime::default()
        });

        let poller = Poller::new(tracker, vec![READY.to_string()], Duration::from_secs(60));
        let orchestrator = Orchestrator::new(poller, planner.clone(), runtime.clone(), 2);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(orchestrator.run(cancel.clone()));

        // PROJ-3 reaches the runtime but is rejected there
        wait_for_starts(&runtime, 3).await;
        cancel.cancel();
        let reason = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(runtime.started_tickets(), vec!["PROJ-1", "PROJ-3", "PROJ-4"]);
        assert_eq!(runtime.runs.lock().unwrap().len(), 2);
        assert_eq!(
            planner.calls.snapshot(),
            vec!["plan:PROJ-1", "plan:PROJ-2", "plan:PROJ-3", "plan:PROJ-4"]
        );
    }

    #[tokio::test]
    async fn test_cancel_while_idle_returns_cancellation() {
        let poller = Poller::new(tracker(&[]), vec![READY.to_string()], Duration::from_secs(60));
        let orchestrator = Orchestrator::new(
            poller,
            Arc::new(FakePlanner::default()),
            Arc::new(FakeRuntime::default()),
            10,
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(orchestrator.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let reason = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, StopReason::Cancelled);
    }
}
