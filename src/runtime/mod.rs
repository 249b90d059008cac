mod local;
mod store;

pub use local::LocalRuntime;
pub use store::RunStore;

use crate::error::RuntimeError;
use crate::model::{PipelineInput, RunId};
use crate::pipeline::{RunState, RunStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned by `start`: the run the caller is now attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHandle {
    pub run_id: RunId,
    pub execution_id: Uuid,
    pub state: RunState,
    /// True when an existing run was reused instead of starting a new one
    pub attached: bool,
    pub task_queue: String,
}

/// The durable-execution engine, reduced to the operations the service needs
#[async_trait]
pub trait ExecutionRuntime: Send + Sync {
    /// Start the pipeline under `run_id`, or attach to the run already using it
    async fn start(&self, run_id: RunId, input: PipelineInput) -> Result<RunHandle, RuntimeError>;

    async fn query(&self, run_id: &RunId) -> Result<RunStatus, RuntimeError>;

    /// Request cooperative cancellation; finished runs are left untouched
    async fn cancel(&self, run_id: &RunId) -> Result<(), RuntimeError>;

    async fn list(&self) -> Result<Vec<RunStatus>, RuntimeError>;
}
