use super::retry::{run_activity, ActivityOptions};
use super::status::{RunFailure, RunState, RunStatus};
use super::{FailurePolicy, StepKind, TestRunner};
use crate::error::StepError;
use crate::github::{naming, CommitOutcome, VcsHost};
use crate::model::{PipelineInput, RepositoryInfo, ReviewRequest, RunId};
use crate::provider::CodeGenerator;
use crate::tracker::Tracker;
use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The collaborators every pipeline run drives
#[derive(Clone)]
pub struct Activities {
    pub host: Arc<dyn VcsHost>,
    pub codegen: Arc<dyn CodeGenerator>,
    pub tests: Arc<dyn TestRunner>,
    pub tracker: Arc<dyn Tracker>,
    pub workspace_root: PathBuf,
    pub branch_prefix: String,
    /// Tracker status to move the ticket to once the review request is open
    pub review_status: Option<String>,
}

impl Activities {
    /// Workspace owned by a single run
    pub fn workspace_for(&self, repo: &RepositoryInfo, run_id: &RunId) -> PathBuf {
        self.workspace_root
            .join(&repo.owner)
            .join(&repo.name)
            .join(run_id.digest())
    }
}

enum Halt {
    Failed(StepKind, StepError),
    Cancelled,
}

struct RunContext<'a> {
    options: &'a ActivityOptions,
    cancel: &'a CancellationToken,
    status: &'a watch::Sender<RunStatus>,
    run_id: RunId,
}

impl RunContext<'_> {
    fn checkpoint(&self) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run one step under the activity options, recording it in the run's history
    async fn attempt<T, F, Fut>(&self, step: StepKind, operation: F) -> Result<T, StepError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        self.status.send_modify(|s| s.begin_step(step));
        info!("{}: step {} ({}) started", self.run_id, step.number(), step);

        let name = format!("{} {}", self.run_id, step);
        let outcome = run_activity(&name, self.options, self.cancel, operation).await;

        let error = outcome.result.as_ref().err().map(|e| e.to_string());
        self.status
            .send_modify(|s| s.finish_step(step, outcome.attempts, error.clone()));

        match &error {
            None => info!(
                "{}: step {} ({}) succeeded after {} attempt(s)",
                self.run_id,
                step.number(),
                step,
                outcome.attempts
            ),
            Some(e) if step.failure_policy() == FailurePolicy::Tolerated => warn!(
                "{}: step {} ({}) failed, continuing: {}",
                self.run_id,
                step.number(),
                step,
                e
            ),
            Some(e) => warn!(
                "{}: step {} ({}) failed: {}",
                self.run_id,
                step.number(),
                step,
                e
            ),
        }

        outcome.result
    }

    /// A fatal step failure; one that happened under cancellation ends the run as cancelled
    fn fatal(&self, step: StepKind) -> impl FnOnce(StepError) -> Halt + '_ {
        move |e| {
            if self.cancel.is_cancelled() {
                Halt::Cancelled
            } else {
                Halt::Failed(step, e)
            }
        }
    }
}

/// Execute the seven pipeline steps for one run.
///
/// Progress is published on `status`; the returned value is the terminal status.
pub async fn execute_pipeline(
    input: PipelineInput,
    activities: &Activities,
    options: &ActivityOptions,
    cancel: &CancellationToken,
    status: &watch::Sender<RunStatus>,
) -> RunStatus {
    let ctx = RunContext {
        options,
        cancel,
        status,
        run_id: input.run_id(),
    };

    status.send_modify(|s| {
        s.state = RunState::Running;
        s.started_at = Some(Utc::now());
    });
    info!(
        "{}: pipeline started for {} on {}",
        ctx.run_id,
        input.task.ticket_id,
        input.repository.slug()
    );

    match run_steps(&input, activities, &ctx).await {
        Ok(review) => {
            info!(
                "{}: succeeded, review request #{} at {}",
                ctx.run_id, review.number, review.url
            );
            status.send_modify(|s| s.finish(RunState::Succeeded, None));
        }
        Err(Halt::Failed(step, error)) => {
            warn!("{}: failed at step {} ({}): {}", ctx.run_id, step.number(), step, error);
            let failure = RunFailure {
                step,
                message: error.to_string(),
            };
            status.send_modify(|s| s.finish(RunState::Failed, Some(failure)));
        }
        Err(Halt::Cancelled) => {
            info!("{}: cancelled", ctx.run_id);
            status.send_modify(|s| s.finish(RunState::Cancelled, None));
        }
    }

    status.borrow().clone()
}

async fn run_steps(
    input: &PipelineInput,
    activities: &Activities,
    ctx: &RunContext<'_>,
) -> Result<ReviewRequest, Halt> {
    let task = &input.task;
    let plan = &input.plan;
    let mut repository = input.repository.clone();
    let host = activities.host.as_ref();

    // 1. clone
    ctx.checkpoint()?;
    let dest = activities.workspace_for(&repository, &ctx.run_id);
    let repo = &repository;
    let dest_ref = dest.as_path();
    let workspace: PathBuf = ctx
        .attempt(StepKind::CloneRepository, move || async move {
            host.clone_repository(repo, dest_ref)
                .await
                .map_err(StepError::from)
        })
        .await
        .map_err(ctx.fatal(StepKind::CloneRepository))?;
    let workspace_ref: &Path = workspace.as_path();

    // 2. branch
    ctx.checkpoint()?;
    let branch = naming::branch_name(&activities.branch_prefix, &task.ticket_id, &task.title);
    let base = repository.base_branch.as_str();
    let branch_ref = branch.as_str();
    ctx.attempt(StepKind::CreateBranch, move || async move {
        host.create_branch(workspace_ref, base, branch_ref)
            .await
            .map_err(StepError::from)
    })
    .await
    .map_err(ctx.fatal(StepKind::CreateBranch))?;
    repository.feature_branch = Some(branch.clone());
    ctx.status.send_modify(|s| s.feature_branch = Some(branch.clone()));

    // 3. code changes
    ctx.checkpoint()?;
    let codegen = activities.codegen.as_ref();
    let change = ctx
        .attempt(StepKind::ApplyChanges, move || async move {
            codegen
                .apply(task, plan, workspace_ref)
                .await
                .map_err(StepError::from)
        })
        .await
        .map_err(ctx.fatal(StepKind::ApplyChanges))?;
    if change.is_empty() {
        warn!("{}: code generation left the workspace unchanged", ctx.run_id);
    }

    // 4. tests (tolerated)
    ctx.checkpoint()?;
    let tests = activities.tests.as_ref();
    let status = ctx.status;
    let _ = ctx
        .attempt(StepKind::RunTests, move || async move {
            let report = tests.run(workspace_ref).await?;
            let passed = report.passed;
            let summary = if report.failures.is_empty() {
                "test suite exited with a failure status".to_string()
            } else {
                report.failures.join("; ")
            };
            status.send_modify(|s| s.test_report = Some(report));
            if passed {
                Ok(())
            } else {
                Err(StepError::TestsFailed(summary))
            }
        })
        .await;

    // 5. commit and push
    ctx.checkpoint()?;
    let message = naming::commit_message(task, &change.summary);
    let message_ref = message.as_str();
    ctx.attempt(StepKind::CommitAndPush, move || async move {
        if host.commit(workspace_ref, message_ref).await? == CommitOutcome::NoChanges {
            info!("Nothing new to commit on {}", branch_ref);
        }
        host.push(workspace_ref, branch_ref).await?;
        Ok::<(), StepError>(())
    })
    .await
    .map_err(ctx.fatal(StepKind::CommitAndPush))?;

    // 6. review request
    ctx.checkpoint()?;
    let title = naming::review_title(task);
    let body = naming::review_description(task, plan);
    let (title_ref, body_ref) = (title.as_str(), body.as_str());
    let repo = &repository;
    let review = ctx
        .attempt(StepKind::OpenReviewRequest, move || async move {
            host.open_review_request(repo, branch_ref, title_ref, body_ref)
                .await
                .map_err(StepError::from)
        })
        .await
        .map_err(ctx.fatal(StepKind::OpenReviewRequest))?;
    ctx.status.send_modify(|s| s.review_request = Some(review.clone()));

    // 7. tracker notification (tolerated)
    ctx.checkpoint()?;
    let tracker = activities.tracker.as_ref();
    let comment = format!("Pull request created: {}", review.url);
    let comment_ref = comment.as_str();
    let review_status = activities.review_status.as_deref();
    let ticket = task.ticket_id.as_str();
    // a retry after a failed transition must not post the comment again
    let commented = AtomicBool::new(false);
    let commented_ref = &commented;
    let _ = ctx
        .attempt(StepKind::NotifyTracker, move || async move {
            if !commented_ref.load(Ordering::Acquire) {
                tracker.add_comment(ticket, comment_ref).await?;
                commented_ref.store(true, Ordering::Release);
            }
            if let Some(target) = review_status {
                tracker.transition_status(ticket, target).await?;
            }
            Ok::<(), StepError>(())
        })
        .await;

    Ok(review)
}
