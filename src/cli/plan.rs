//! CLI handler for the `plan` subcommand

use crate::cli::{services, PlanArgs};
use std::path::Path;
use tracing::info;

pub async fn execute(config_path: &Path, args: PlanArgs) -> anyhow::Result<()> {
    let config = services::load_config(config_path)?;

    let tracker = services::tracker(&config)?;
    let planner = services::planner(&config)?;

    let task = tracker.get_by_id(&args.ticket).await?;
    info!("Planning {} ({})", task.ticket_id, task.repo_slug());

    let plan = planner.generate_plan(&task).await?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
