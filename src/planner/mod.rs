//! Plan source: turns a task into an ordered implementation plan via a completion backend

mod completion;
mod parser;
mod prompt;

pub use completion::{CompletionBackend, OpenAiBackend};
pub use parser::parse_plan;

use crate::error::PlanningError;
use crate::model::{ImplementationPlan, Task};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Produces an implementation plan for a task
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn generate_plan(&self, task: &Task) -> Result<ImplementationPlan, PlanningError>;
}

/// Plans by prompting a completion backend and parsing its answer.
///
/// Makes exactly one backend call per plan; retrying is left to the caller.
pub struct AiPlanner {
    backend: Arc<dyn CompletionBackend>,
}

impl AiPlanner {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PlanSource for AiPlanner {
    async fn generate_plan(&self, task: &Task) -> Result<ImplementationPlan, PlanningError> {
        let response = self
            .backend
            .complete(prompt::SYSTEM_PROMPT, &prompt::user_prompt(task))
            .await?;

        if response.trim().is_empty() {
            return Err(PlanningError::EmptyResponse(task.ticket_id.clone()));
        }

        let plan = parse_plan(&response, &task.ticket_id);
        info!(
            "Planned {}: {} step(s), complexity {}",
            task.ticket_id,
            plan.steps.len(),
            plan.complexity
        );
        Ok(plan)
    }
}
