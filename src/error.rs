use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KhitomerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Hosting error: {0}")]
    Hosting(#[from] HostingError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Transient when the request never got an answer, or the server asked us to back off.
fn status_is_transient(status: u16) -> bool {
    status == 429 || status >= 500
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracker returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Ticket {0} not found")]
    NotFound(String),

    #[error("Ticket {0} has no resolvable repository reference")]
    NoRepository(String),

    #[error("No transition to status '{status}' available for {ticket}")]
    NoTransition { ticket: String, status: String },
}

impl TrackerError {
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::Http(_) => true,
            TrackerError::Api { status, .. } => status_is_transient(*status),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum HostingError {
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("Hosting API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hosting API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostingError {
    pub fn is_transient(&self) -> bool {
        match self {
            // every git command issued by the pipeline is safe to re-run
            HostingError::Git { .. } | HostingError::Http(_) => true,
            HostingError::Api { status, .. } => status_is_transient(*status),
            HostingError::Io(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Completion backend returned no choices")]
    NoChoices,
}

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Completion backend failed: {0}")]
    Backend(#[from] CompletionError),

    #[error("Completion backend returned an empty plan for {0}")]
    EmptyResponse(String),
}

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Code generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Code generator exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Failed to inspect workspace changes: {0}")]
    Workspace(#[from] HostingError),
}

#[derive(Error, Debug)]
pub enum TestRunError {
    #[error("Test suite timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to launch test command: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single pipeline activity.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("{0}")]
    Hosting(#[from] HostingError),

    #[error("{0}")]
    Tracker(#[from] TrackerError),

    #[error("{0}")]
    Codegen(#[from] CodegenError),

    #[error("{0}")]
    TestRun(#[from] TestRunError),

    #[error("Tests failed: {0}")]
    TestsFailed(String),

    #[error("Activity timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing activity input: {0}")]
    MissingInput(&'static str),
}

impl StepError {
    /// Whether another attempt under the retry policy could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StepError::Hosting(e) => e.is_transient(),
            StepError::Tracker(e) => e.is_transient(),
            StepError::Codegen(CodegenError::NonZeroExit { .. }) => true,
            StepError::Codegen(_) => false,
            StepError::TestRun(_) | StepError::TestsFailed(_) => false,
            StepError::Timeout(_) => true,
            StepError::MissingInput(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Invalid {field} '{value}': only letters, digits, '.', '_' and '-' are allowed")]
    Invalid { field: &'static str, value: String },
}

/// Why a task from intake did not become a run
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Failed to start run: {0}")]
    Start(#[from] RuntimeError),
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Run '{0}' not found")]
    NotFound(String),

    #[error("Runtime is shutting down")]
    ShuttingDown,

    #[error("Failed to persist run record: {0}")]
    Store(#[from] std::io::Error),

    #[error("Failed to encode run record: {0}")]
    Serialize(#[from] serde_json::Error),
}
