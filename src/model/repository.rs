use serde::{Deserialize, Serialize};

use super::Task;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub base_branch: String,
    /// Assigned once, by the branch-creation step
    #[serde(default)]
    pub feature_branch: Option<String>,
    pub clone_url: String,
}

impl RepositoryInfo {
    pub fn for_task(task: &Task) -> Self {
        let clone_url = if task.repo_url.is_empty() {
            format!("https://github.com/{}/{}", task.repo_owner, task.repo_name)
        } else {
            task.repo_url.clone()
        };
        Self {
            owner: task.repo_owner.clone(),
            name: task.repo_name.clone(),
            base_branch: task.base_branch.clone(),
            feature_branch: None,
            clone_url,
        }
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// An opened pull request (or the already-open one it was deduplicated against).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub number: u64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: String,
}
