use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ImplementationPlan, RepositoryInfo};

/// A tracker ticket paired with the repository it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub ticket_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub repo_owner: String,
    pub repo_name: String,
    pub base_branch: String,
    /// Web URL of the repository, when the tracker supplied one
    #[serde(default)]
    pub repo_url: String,
    /// Browse URL of the originating ticket
    #[serde(default)]
    pub tracker_url: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }

    pub fn run_id(&self) -> RunId {
        RunId::for_task(&self.ticket_id, &self.repo_name)
    }
}

/// Identity of a pipeline run.
///
/// Derived only from the ticket and repository name, so dispatching the same
/// ticket twice lands on the same run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn for_task(ticket_id: &str, repo_name: &str) -> Self {
        Self(format!("implementation-{}-{}", ticket_id, repo_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short stable digest, used to give each run its own workspace directory
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        format!("{:x}", hash)[..12].to_string()
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a pipeline run needs, handed to the runtime at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInput {
    pub task: Task,
    pub plan: ImplementationPlan,
    pub repository: RepositoryInfo,
}

impl PipelineInput {
    pub fn new(task: Task, plan: ImplementationPlan) -> Self {
        let repository = RepositoryInfo::for_task(&task);
        Self {
            task,
            plan,
            repository,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.task.run_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_is_deterministic() {
        let a = RunId::for_task("PROJ-1", "app");
        let b = RunId::for_task("PROJ-1", "app");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "implementation-PROJ-1-app");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 12);
    }

    #[test]
    fn test_run_id_differs_per_ticket() {
        let a = RunId::for_task("PROJ-1", "app");
        let b = RunId::for_task("PROJ-2", "app");
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_run_id_serializes_as_plain_string() {
        let id = RunId::for_task("PROJ-1", "app");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"implementation-PROJ-1-app\"");
    }
}
