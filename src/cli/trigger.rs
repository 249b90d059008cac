use crate::api::{shutdown_signal, TriggerRequest};
use crate::cli::{services, TriggerArgs};
use crate::pipeline::RunState;
use crate::runtime::ExecutionRuntime;
use std::path::Path;
use tracing::{error, info, warn};

pub async fn execute(config_path: &Path, args: TriggerArgs) -> anyhow::Result<()> {
    let config = services::load_config(config_path)?;
    config.validate_services()?;

    let tracker = services::tracker(&config)?;
    let planner = services::planner(&config)?;

    let request = TriggerRequest {
        ticket_id: args.ticket,
        repo_owner: args.owner,
        repo_name: args.repo,
        base_branch: args.base,
    };
    let input = request
        .prepare(
            tracker.as_ref(),
            planner.as_ref(),
            &config.tracker.default_base_branch,
        )
        .await?;

    let runtime = services::runtime(&config, services::activities(&config, tracker)?);
    let run_id = input.run_id();
    let handle = runtime.start(run_id.clone(), input).await?;
    if handle.attached {
        info!("{} already {}, attaching", run_id, handle.state);
    } else {
        info!("Started {} ({})", run_id, handle.execution_id);
    }

    let status = tokio::select! {
        status = runtime.wait(&run_id) => status?,
        _ = shutdown_signal() => {
            warn!("Interrupted, cancelling {}", run_id);
            runtime.cancel(&run_id).await?;
            runtime.wait(&run_id).await?
        }
    };
    runtime.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&status)?);

    if status.state != RunState::Succeeded {
        match &status.failure {
            Some(failure) => error!("Run {} at {}: {}", status.state, failure.step, failure.message),
            None => error!("Run {}", status.state),
        }
        std::process::exit(1);
    }

    Ok(())
}
