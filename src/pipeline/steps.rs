use serde::{Deserialize, Serialize};

/// The pipeline's activities, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CloneRepository,
    CreateBranch,
    ApplyChanges,
    RunTests,
    CommitAndPush,
    OpenReviewRequest,
    NotifyTracker,
}

/// What a step's failure (after retries) does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    Fatal,
    Tolerated,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::CloneRepository,
        StepKind::CreateBranch,
        StepKind::ApplyChanges,
        StepKind::RunTests,
        StepKind::CommitAndPush,
        StepKind::OpenReviewRequest,
        StepKind::NotifyTracker,
    ];

    /// 1-based position in the pipeline
    pub fn number(&self) -> u8 {
        match self {
            StepKind::CloneRepository => 1,
            StepKind::CreateBranch => 2,
            StepKind::ApplyChanges => 3,
            StepKind::RunTests => 4,
            StepKind::CommitAndPush => 5,
            StepKind::OpenReviewRequest => 6,
            StepKind::NotifyTracker => 7,
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            StepKind::RunTests | StepKind::NotifyTracker => FailurePolicy::Tolerated,
            _ => FailurePolicy::Fatal,
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepKind::CloneRepository => "clone_repository",
            StepKind::CreateBranch => "create_branch",
            StepKind::ApplyChanges => "apply_changes",
            StepKind::RunTests => "run_tests",
            StepKind::CommitAndPush => "commit_and_push",
            StepKind::OpenReviewRequest => "open_review_request",
            StepKind::NotifyTracker => "notify_tracker",
        };
        write!(f, "{}", name)
    }
}
