use super::{StepKind, TestReport};
use crate::model::{PipelineInput, ReviewRequest, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Pending => write!(f, "pending"),
            RunState::Running => write!(f, "running"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed => write!(f, "failed"),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Running,
    Succeeded,
    Failed,
}

/// One entry of a run's step history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepKind,
    pub state: StepState,
    pub attempts: u32,
    /// Set when a failure did not stop the run
    #[serde(default)]
    pub tolerated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub step: StepKind,
    pub message: String,
}

/// Observable state of one pipeline execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: RunId,
    pub execution_id: Uuid,
    pub ticket_id: String,
    pub repository: String,
    pub state: RunState,
    pub current_step: Option<StepKind>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    pub feature_branch: Option<String>,
    pub review_request: Option<ReviewRequest>,
    pub test_report: Option<TestReport>,
    pub failure: Option<RunFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    pub fn pending(input: &PipelineInput) -> Self {
        Self {
            run_id: input.run_id(),
            execution_id: Uuid::new_v4(),
            ticket_id: input.task.ticket_id.clone(),
            repository: input.repository.slug(),
            state: RunState::Pending,
            current_step: None,
            steps: Vec::new(),
            feature_branch: None,
            review_request: None,
            test_report: None,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn step(&self, step: StepKind) -> Option<&StepRecord> {
        self.steps.iter().rev().find(|r| r.step == step)
    }

    pub(crate) fn begin_step(&mut self, step: StepKind) {
        self.current_step = Some(step);
        self.steps.push(StepRecord {
            step,
            state: StepState::Running,
            attempts: 0,
            tolerated: false,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        });
    }

    pub(crate) fn finish_step(&mut self, step: StepKind, attempts: u32, error: Option<String>) {
        if let Some(record) = self.steps.iter_mut().rev().find(|r| r.step == step) {
            record.attempts = attempts;
            record.finished_at = Some(Utc::now());
            record.state = if error.is_some() {
                StepState::Failed
            } else {
                StepState::Succeeded
            };
            record.tolerated =
                error.is_some() && step.failure_policy() == super::FailurePolicy::Tolerated;
            record.error = error;
        }
    }

    /// Move to a terminal state; a terminal status never changes afterwards
    pub(crate) fn finish(&mut self, state: RunState, failure: Option<RunFailure>) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.failure = failure;
        self.current_step = None;
        self.finished_at = Some(Utc::now());
    }
}
