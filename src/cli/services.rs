//! Wiring of the concrete collaborators from configuration.

use crate::config::Config;
use crate::error::{KhitomerError, PlanningError};
use crate::github::GitHubHost;
use crate::pipeline::{Activities, ActivityOptions, CommandTestRunner};
use crate::planner::{AiPlanner, OpenAiBackend, PlanSource};
use crate::provider::create_codegen;
use crate::runtime::{LocalRuntime, RunStore};
use crate::tracker::{JiraClient, Tracker};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Load the config file, overlay the environment and check it
pub fn load_config(path: &Path) -> Result<Config, KhitomerError> {
    info!("Loading config from {:?}", path);
    let mut config = Config::load(path)?;
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

pub fn tracker(config: &Config) -> Result<Arc<dyn Tracker>, KhitomerError> {
    Ok(Arc::new(JiraClient::new(config.tracker.clone())?))
}

pub fn planner(config: &Config) -> Result<Arc<dyn PlanSource>, KhitomerError> {
    let backend = OpenAiBackend::new(config.planner.clone()).map_err(PlanningError::from)?;
    Ok(Arc::new(AiPlanner::new(Arc::new(backend))))
}

pub fn activities(config: &Config, tracker: Arc<dyn Tracker>) -> Result<Activities, KhitomerError> {
    let codegen = create_codegen(&config.codegen);
    info!("Code generation via {}", codegen.name());

    Ok(Activities {
        host: Arc::new(GitHubHost::new(config.github.clone())?),
        codegen,
        tests: Arc::new(CommandTestRunner {
            timeout: Duration::from_secs(config.codegen.test_timeout_sec),
        }),
        tracker,
        workspace_root: config.runtime.workspace_root.clone(),
        branch_prefix: config.github.branch_prefix.clone(),
        review_status: config.tracker.review_status.clone(),
    })
}

pub fn runtime(config: &Config, activities: Activities) -> LocalRuntime {
    let options = ActivityOptions {
        step_timeout: config.step_timeout(),
        retry: config.retry_policy(),
    };
    LocalRuntime::new(
        activities,
        options,
        config.runtime.task_queue.clone(),
        RunStore::new(&config.runtime.state_dir),
        config.runtime.max_concurrent_runs,
    )
}
