//! Domain types shared by intake, planning, the pipeline and the runtime.

mod plan;
mod repository;
mod task;

pub use plan::{ActivityType, Complexity, ImplementationPlan, PlanStep};
pub use repository::{RepositoryInfo, ReviewRequest};
pub use task::{PipelineInput, RunId, Task};
