mod retry;
mod status;
mod steps;
mod testing;
mod workflow;

pub use retry::{ActivityOptions, RetryPolicy};
pub use status::{RunState, RunStatus};
pub use steps::{FailurePolicy, StepKind};
pub use testing::{CommandTestRunner, TestReport, TestRunner};
pub use workflow::{execute_pipeline, Activities};
