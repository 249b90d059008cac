use crate::error::TriggerError;
use crate::model::{ImplementationPlan, PipelineInput, Task};
use crate::planner::PlanSource;
use crate::tracker::{is_valid_name, Tracker};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

/// A run requested by hand rather than picked up by intake
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerRequest {
    pub ticket_id: String,
    #[serde(default)]
    pub repo_owner: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
}

fn checked(field: &'static str, value: &str) -> Result<(), TriggerError> {
    if is_valid_name(value) {
        Ok(())
    } else {
        Err(TriggerError::Invalid {
            field,
            value: value.to_string(),
        })
    }
}

fn given(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl TriggerRequest {
    /// Build the pipeline input for this request.
    ///
    /// The ticket is looked up in the tracker for its title and description;
    /// explicit repository fields win over the ticket's. If planning fails the
    /// run goes ahead with a manual plan.
    pub async fn prepare(
        &self,
        tracker: &dyn Tracker,
        planner: &dyn PlanSource,
        default_base_branch: &str,
    ) -> Result<PipelineInput, TriggerError> {
        let ticket_id = self.ticket_id.trim();
        if ticket_id.is_empty() {
            return Err(TriggerError::Missing("ticket_id"));
        }
        // these end up in workspace and run record paths
        checked("ticket_id", ticket_id)?;
        if let Some(owner) = given(&self.repo_owner) {
            checked("repo_owner", &owner)?;
        }
        if let Some(name) = given(&self.repo_name) {
            checked("repo_name", &name)?;
        }

        let tracked = match tracker.get_by_id(ticket_id).await {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("Could not load {} from tracker: {}", ticket_id, e);
                None
            }
        };

        let repo_owner = given(&self.repo_owner)
            .or_else(|| tracked.as_ref().map(|t| t.repo_owner.clone()))
            .ok_or(TriggerError::Missing("repo_owner"))?;
        let repo_name = given(&self.repo_name)
            .or_else(|| tracked.as_ref().map(|t| t.repo_name.clone()))
            .ok_or(TriggerError::Missing("repo_name"))?;
        let base_branch = given(&self.base_branch)
            .or_else(|| tracked.as_ref().map(|t| t.base_branch.clone()))
            .unwrap_or_else(|| default_base_branch.to_string());

        let task = match tracked {
            Some(task) => Task {
                repo_owner,
                repo_name,
                base_branch,
                ..task
            },
            None => Task {
                ticket_id: ticket_id.to_string(),
                title: ticket_id.to_string(),
                description: String::new(),
                status: String::new(),
                assignee: None,
                repo_owner,
                repo_name,
                base_branch,
                repo_url: String::new(),
                tracker_url: String::new(),
                created_at: Utc::now(),
            },
        };

        let plan = match planner.generate_plan(&task).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Planning failed for {}, using a manual plan: {}", task.ticket_id, e);
                ImplementationPlan::manual()
            }
        };
        debug!("{}: manual trigger with {} plan step(s)", task.ticket_id, plan.steps.len());

        Ok(PipelineInput::new(task, plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{task, FakePlanner, FakeTracker};

    fn request(ticket: &str) -> TriggerRequest {
        TriggerRequest {
            ticket_id: ticket.to_string(),
            repo_owner: Some("acme".to_string()),
            repo_name: Some("service".to_string()),
            base_branch: None,
        }
    }

    #[tokio::test]
    async fn test_prepare_enriches_from_tracker() {
        let tracker = FakeTracker::default().with_status("Ready", vec![task("PROJ-5", "Add caching")]);
        let input = request("PROJ-5")
            .prepare(&tracker, &FakePlanner::default(), "develop")
            .await
            .unwrap();

        assert_eq!(input.task.title, "Add caching");
        assert_eq!(input.task.repo_owner, "acme");
        assert_eq!(input.task.repo_name, "service");
        // the tracked task's branch is kept when the request has none
        assert_eq!(input.task.base_branch, "main");
        assert_eq!(input.run_id().as_str(), "implementation-PROJ-5-service");
        assert_eq!(input.plan.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_prepare_without_tracker_entry_uses_request() {
        let input = request("PROJ-6")
            .prepare(&FakeTracker::default(), &FakePlanner::default(), "develop")
            .await
            .unwrap();

        assert_eq!(input.task.title, "PROJ-6");
        assert_eq!(input.task.base_branch, "develop");
    }

    #[tokio::test]
    async fn test_planning_failure_falls_back_to_manual_plan() {
        let planner = FakePlanner {
            failing: ["PROJ-7".to_string()].into_iter().collect(),
            ..FakePlanner::default()
        };
        let input = request("PROJ-7")
            .prepare(&FakeTracker::default(), &planner, "main")
            .await
            .unwrap();

        assert_eq!(input.plan.summary, "Manual workflow trigger");
        assert!(input.plan.steps.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let tracker = FakeTracker::default();
        let planner = FakePlanner::default();

        let err = TriggerRequest::default()
            .prepare(&tracker, &planner, "main")
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::Missing("ticket_id")));

        let unknown = TriggerRequest {
            ticket_id: "PROJ-8".to_string(),
            ..TriggerRequest::default()
        };
        let err = unknown.prepare(&tracker, &planner, "main").await.unwrap_err();
        assert!(matches!(err, TriggerError::Missing("repo_owner")));
    }

    #[tokio::test]
    async fn test_path_like_values_are_rejected() {
        let tracker = FakeTracker::default();
        let planner = FakePlanner::default();

        let cases = [
            ("PROJ-1", "/tmp/x", "app", "repo_owner"),
            ("PROJ-1", "org", "..", "repo_name"),
            ("PROJ-1", "org", "app/../../etc", "repo_name"),
            ("../PROJ-1", "org", "app", "ticket_id"),
        ];
        for (ticket, owner, name, field) in cases {
            let req = TriggerRequest {
                ticket_id: ticket.to_string(),
                repo_owner: Some(owner.to_string()),
                repo_name: Some(name.to_string()),
                base_branch: None,
            };
            let err = req.prepare(&tracker, &planner, "main").await.unwrap_err();
            assert!(
                matches!(err, TriggerError::Invalid { field: f, .. } if f == field),
                "{} {} {}",
                ticket,
                owner,
                name
            );
        }
        assert!(planner.calls.snapshot().is_empty());
    }
}
