mod jira;
mod reference;

pub use jira::JiraClient;
pub use reference::{is_valid_name, parse_repo_reference};

use crate::error::TrackerError;
use crate::model::Task;
use async_trait::async_trait;

/// The issue tracker, reduced to what intake and the pipeline need.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Tickets currently in `status` that name a resolvable repository
    async fn search_by_status(&self, status: &str) -> Result<Vec<Task>, TrackerError>;

    async fn get_by_id(&self, ticket_id: &str) -> Result<Task, TrackerError>;

    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<(), TrackerError>;

    async fn transition_status(
        &self,
        ticket_id: &str,
        target_status: &str,
    ) -> Result<(), TrackerError>;
}
