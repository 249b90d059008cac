//! In-memory collaborators shared by the unit tests.

use crate::error::{
    CodegenError, HostingError, PlanningError, RuntimeError, TestRunError, TrackerError,
};
use crate::github::{CommitOutcome, VcsHost};
use crate::model::{
    ActivityType, ImplementationPlan, PipelineInput, PlanStep, RepositoryInfo, ReviewRequest,
    RunId, Task,
};
use crate::pipeline::{Activities, RunState, RunStatus, TestReport, TestRunner};
use crate::runtime::{ExecutionRuntime, RunHandle};
use crate::planner::PlanSource;
use crate::provider::{CodeChange, CodeGenerator};
use crate::tracker::Tracker;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn task(ticket_id: &str, title: &str) -> Task {
    Task {
        ticket_id: ticket_id.to_string(),
        title: title.to_string(),
        description: format!("Description of {}", ticket_id),
        status: "Ready for Development".to_string(),
        assignee: None,
        repo_owner: "org".to_string(),
        repo_name: "app".to_string(),
        base_branch: "main".to_string(),
        repo_url: String::new(),
        tracker_url: String::new(),
        created_at: Utc::now(),
    }
}

pub fn plan(steps: usize) -> ImplementationPlan {
    let names = ["Step one", "Step two", "Step three", "Step four"];
    ImplementationPlan {
        summary: "Test plan".to_string(),
        steps: (0..steps)
            .map(|i| PlanStep {
                order: i as u32 + 1,
                description: names.get(i).copied().unwrap_or("Another step").to_string(),
                activity_type: ActivityType::Codegen,
                parameters: BTreeMap::new(),
            })
            .collect(),
        ..ImplementationPlan::default()
    }
}

pub fn input(ticket_id: &str, title: &str, steps: usize) -> PipelineInput {
    PipelineInput::new(task(ticket_id, title), plan(steps))
}

/// Ordered log of collaborator calls
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn record(&self, call: &str) {
        self.0.lock().unwrap().push(call.to_string());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Where the fake pipeline collaborators should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Clone,
    Branch,
    Apply,
    TestsFail,
    TestsError,
    Commit,
    Push,
    /// First push answers 503, later pushes succeed
    PushFlaky,
    /// Every push answers 503
    PushUnavailable,
    Review,
    Comment,
    /// Every status transition answers 503
    Transition,
}

fn permanent() -> HostingError {
    HostingError::Api {
        status: 422,
        body: "injected".to_string(),
    }
}

fn unavailable() -> HostingError {
    HostingError::Api {
        status: 503,
        body: "try again".to_string(),
    }
}

pub struct FakeHost {
    pub calls: Calls,
    pub failure: Option<Failure>,
    /// Delay applied to every call, to keep a run in flight
    pub delay: Duration,
    pub pushes: AtomicU32,
}

impl FakeHost {
    async fn step(&self, call: &str, fail_on: Failure) -> Result<(), HostingError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.record(call);
        if self.failure == Some(fail_on) {
            return Err(permanent());
        }
        Ok(())
    }
}

#[async_trait]
impl VcsHost for FakeHost {
    async fn clone_repository(
        &self,
        _repo: &RepositoryInfo,
        dest: &Path,
    ) -> Result<PathBuf, HostingError> {
        self.step("clone", Failure::Clone).await?;
        Ok(dest.to_path_buf())
    }

    async fn create_branch(
        &self,
        _workspace: &Path,
        _base: &str,
        _branch: &str,
    ) -> Result<(), HostingError> {
        self.step("create_branch", Failure::Branch).await
    }

    async fn commit(&self, _workspace: &Path, _message: &str) -> Result<CommitOutcome, HostingError> {
        self.step("commit", Failure::Commit).await?;
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self, _workspace: &Path, _branch: &str) -> Result<(), HostingError> {
        self.step("push", Failure::Push).await?;
        let attempt = self.pushes.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failure {
            Some(Failure::PushUnavailable) => Err(unavailable()),
            Some(Failure::PushFlaky) if attempt == 1 => Err(unavailable()),
            _ => Ok(()),
        }
    }

    async fn open_review_request(
        &self,
        repo: &RepositoryInfo,
        _head: &str,
        title: &str,
        body: &str,
    ) -> Result<ReviewRequest, HostingError> {
        self.step("open_review_request", Failure::Review).await?;
        Ok(ReviewRequest {
            number: 7,
            url: format!("https://github.com/{}/pull/7", repo.slug()),
            title: title.to_string(),
            body: body.to_string(),
            state: "open".to_string(),
        })
    }
}

pub struct FakeCodegen {
    pub calls: Calls,
    pub fail: bool,
}

#[async_trait]
impl CodeGenerator for FakeCodegen {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn apply(
        &self,
        _task: &Task,
        _plan: &ImplementationPlan,
        _workspace: &Path,
    ) -> Result<CodeChange, CodegenError> {
        self.calls.record("apply");
        if self.fail {
            return Err(CodegenError::Timeout(Duration::from_secs(1)));
        }
        Ok(CodeChange {
            summary: "Changed one file".to_string(),
            modified_files: vec!["src/lib.rs".to_string()],
            created_files: Vec::new(),
        })
    }
}

pub struct FakeTests {
    pub calls: Calls,
    pub failure: Option<Failure>,
}

#[async_trait]
impl TestRunner for FakeTests {
    async fn run(&self, _workspace: &Path) -> Result<TestReport, TestRunError> {
        self.calls.record("tests");
        match self.failure {
            Some(Failure::TestsError) => Err(TestRunError::Timeout(Duration::from_secs(1))),
            Some(Failure::TestsFail) => Ok(TestReport {
                project: None,
                passed: false,
                output: "test it_works ... FAILED".to_string(),
                failures: vec!["test it_works ... FAILED".to_string()],
            }),
            _ => Ok(TestReport::vacuous()),
        }
    }
}

/// Tracker returning canned search results
#[derive(Default)]
pub struct FakeTracker {
    pub calls: Calls,
    pub by_status: Mutex<HashMap<String, Vec<Task>>>,
    pub failing_statuses: HashSet<String>,
    pub fail_comment: bool,
    pub fail_transition: bool,
}

impl FakeTracker {
    pub fn with_status(self, status: &str, tasks: Vec<Task>) -> Self {
        self.by_status
            .lock()
            .unwrap()
            .insert(status.to_string(), tasks);
        self
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn search_by_status(&self, status: &str) -> Result<Vec<Task>, TrackerError> {
        self.calls.record(&format!("search:{}", status));
        if self.failing_statuses.contains(status) {
            return Err(TrackerError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self
            .by_status
            .lock()
            .unwrap()
            .get(status)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_by_id(&self, ticket_id: &str) -> Result<Task, TrackerError> {
        self.by_status
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|t| t.ticket_id == ticket_id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(ticket_id.to_string()))
    }

    async fn add_comment(&self, _ticket_id: &str, _text: &str) -> Result<(), TrackerError> {
        self.calls.record("add_comment");
        if self.fail_comment {
            return Err(TrackerError::Api {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        _ticket_id: &str,
        _target_status: &str,
    ) -> Result<(), TrackerError> {
        self.calls.record("transition_status");
        if self.fail_transition {
            return Err(TrackerError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Pipeline collaborators sharing one call log
pub fn fake_activities(root: &Path, failure: Option<Failure>) -> (Activities, Calls) {
    fake_activities_with_delay(root, failure, Duration::ZERO)
}

pub fn fake_activities_with_delay(
    root: &Path,
    failure: Option<Failure>,
    delay: Duration,
) -> (Activities, Calls) {
    let calls = Calls::default();
    let activities = Activities {
        host: Arc::new(FakeHost {
            calls: calls.clone(),
            failure,
            delay,
            pushes: AtomicU32::new(0),
        }),
        codegen: Arc::new(FakeCodegen {
            calls: calls.clone(),
            fail: failure == Some(Failure::Apply),
        }),
        tests: Arc::new(FakeTests {
            calls: calls.clone(),
            failure,
        }),
        tracker: Arc::new(FakeTracker {
            calls: calls.clone(),
            fail_comment: failure == Some(Failure::Comment),
            fail_transition: failure == Some(Failure::Transition),
            ..FakeTracker::default()
        }),
        workspace_root: root.to_path_buf(),
        branch_prefix: "khitomer".to_string(),
        review_status: None,
    };
    (activities, calls)
}

/// Plan source that fails for the listed tickets
#[derive(Default)]
pub struct FakePlanner {
    pub calls: Calls,
    pub failing: HashSet<String>,
}

#[async_trait]
impl PlanSource for FakePlanner {
    async fn generate_plan(&self, task: &Task) -> Result<ImplementationPlan, PlanningError> {
        self.calls.record(&format!("plan:{}", task.ticket_id));
        if self.failing.contains(&task.ticket_id) {
            return Err(PlanningError::EmptyResponse(task.ticket_id.clone()));
        }
        Ok(plan(2))
    }
}

/// Runtime that records starts without executing anything
#[derive(Default)]
pub struct FakeRuntime {
    pub started: Mutex<Vec<PipelineInput>>,
    pub runs: Mutex<HashMap<RunId, RunStatus>>,
    /// Tickets whose start is rejected
    pub failing: HashSet<String>,
}

impl FakeRuntime {
    pub fn started_tickets(&self) -> Vec<String> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.task.ticket_id.clone())
            .collect()
    }
}

#[async_trait]
impl ExecutionRuntime for FakeRuntime {
    async fn start(&self, run_id: RunId, input: PipelineInput) -> Result<RunHandle, RuntimeError> {
        self.started.lock().unwrap().push(input.clone());
        if self.failing.contains(&input.task.ticket_id) {
            return Err(RuntimeError::ShuttingDown);
        }

        let mut runs = self.runs.lock().unwrap();
        let attached = runs.contains_key(&run_id);
        let status = runs
            .entry(run_id.clone())
            .or_insert_with(|| RunStatus::pending(&input));
        Ok(RunHandle {
            run_id,
            execution_id: status.execution_id,
            state: status.state,
            attached,
            task_queue: "implementation-queue".to_string(),
        })
    }

    async fn query(&self, run_id: &RunId) -> Result<RunStatus, RuntimeError> {
        self.runs
            .lock()
            .unwrap()
            .get(run_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(run_id.to_string()))
    }

    async fn cancel(&self, run_id: &RunId) -> Result<(), RuntimeError> {
        let mut runs = self.runs.lock().unwrap();
        let status = runs
            .get_mut(run_id)
            .ok_or_else(|| RuntimeError::NotFound(run_id.to_string()))?;
        status.finish(RunState::Cancelled, None);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RunStatus>, RuntimeError> {
        Ok(self.runs.lock().unwrap().values().cloned().collect())
    }
}
