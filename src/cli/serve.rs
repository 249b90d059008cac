use crate::api::{self, AppState};
use crate::cli::{services, ServeArgs};
use crate::intake::Poller;
use crate::orchestrator::Orchestrator;
use crate::runtime::ExecutionRuntime;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn execute(config_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = services::load_config(config_path)?;
    if let Some(bind) = args.bind {
        config.api.bind = bind;
    }
    config.validate_services()?;

    let tracker = services::tracker(&config)?;
    let planner = services::planner(&config)?;
    let activities = services::activities(&config, tracker.clone())?;
    let runtime = Arc::new(services::runtime(&config, activities));

    let cancel = CancellationToken::new();

    let orchestrator = if args.no_intake {
        info!("Intake disabled, serving the admin API only");
        None
    } else {
        let poller = Poller::new(
            tracker.clone(),
            config.intake.status_filter.clone(),
            config.poll_interval(),
        );
        let orchestrator = Orchestrator::new(
            poller,
            planner.clone(),
            runtime.clone() as Arc<dyn ExecutionRuntime>,
            config.intake.queue_capacity,
        );
        Some(tokio::spawn(orchestrator.run(cancel.clone())))
    };

    let state = Arc::new(AppState {
        runtime: runtime.clone(),
        planner,
        tracker,
        default_base_branch: config.tracker.default_base_branch.clone(),
    });
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.api.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.bind))?;
    info!("Admin API listening on {}", config.api.bind);

    let shutdown = cancel.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = api::shutdown_signal() => {}
                _ = shutdown.cancelled() => {}
            }
        })
        .await
        .context("Server error");

    cancel.cancel();
    if let Some(handle) = orchestrator {
        match handle.await {
            Ok(reason) => info!("Orchestrator finished: {:?}", reason),
            Err(e) => warn!("Orchestrator task failed: {}", e),
        }
    }

    info!("Draining in-flight runs");
    runtime.shutdown().await;
    info!("Shut down cleanly");

    served
}
