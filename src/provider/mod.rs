mod claude;
mod codex;

pub use claude::ClaudeCodegen;
pub use codex::CodexCodegen;

use crate::config::{CodegenConfig, Provider};
use crate::error::CodegenError;
use crate::model::{ImplementationPlan, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// What an agent did to the workspace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeChange {
    pub summary: String,
    pub modified_files: Vec<String>,
    pub created_files: Vec<String>,
}

impl CodeChange {
    pub fn is_empty(&self) -> bool {
        self.modified_files.is_empty() && self.created_files.is_empty()
    }
}

/// Applies a plan to a checked-out workspace
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(
        &self,
        task: &Task,
        plan: &ImplementationPlan,
        workspace: &Path,
    ) -> Result<CodeChange, CodegenError>;
}

pub fn create_codegen(config: &CodegenConfig) -> Arc<dyn CodeGenerator> {
    let timeout = Duration::from_secs(config.timeout_sec);
    match config.provider {
        Provider::ClaudeCli => Arc::new(ClaudeCodegen {
            binary: config.claude_cli.binary.clone(),
            model: config.claude_cli.model.clone(),
            tools: config.claude_cli.tools.clone(),
            permission_mode: config.claude_cli.permission_mode.clone(),
            timeout,
        }),
        Provider::CodexCli => Arc::new(CodexCodegen {
            binary: config.codex_cli.binary.clone(),
            model: config.codex_cli.model.clone(),
            timeout,
        }),
    }
}

/// Instructions handed to a coding agent
pub fn build_prompt(task: &Task, plan: &ImplementationPlan) -> String {
    let mut prompt = format!(
        "You are working in a checked-out copy of {repo}. Implement ticket {ticket}.\n\n\
         ## Ticket\n\n**{title}**\n\n{description}\n\n\
         ## Plan\n\n{summary}\n\nEstimated complexity: {complexity}\n\n",
        repo = task.repo_slug(),
        ticket = task.ticket_id,
        title = task.title,
        description = task.description,
        summary = plan.summary,
        complexity = plan.complexity,
    );

    if !plan.steps.is_empty() {
        prompt.push_str("## Steps\n\n");
        for step in &plan.steps {
            prompt.push_str(&format!(
                "{}. {} [{}]\n",
                step.order, step.description, step.activity_type
            ));
        }
        prompt.push('\n');
    }
    if !plan.files_to_modify.is_empty() {
        prompt.push_str(&format!(
            "Files likely to change: {}\n",
            plan.files_to_modify.join(", ")
        ));
    }
    if !plan.files_to_create.is_empty() {
        prompt.push_str(&format!(
            "Files likely to be created: {}\n",
            plan.files_to_create.join(", ")
        ));
    }

    prompt.push_str(
        "\nEdit the files directly. Do not commit, push or create branches; \
         finish with a short summary of what you changed.\n",
    );
    prompt
}

fn command_for(binary: &Path) -> Command {
    // Plain command names resolve through PATH
    let binary_str = binary.to_string_lossy();
    if binary_str.contains('/') || binary_str.contains('\\') {
        Command::new(binary)
    } else {
        Command::new(binary_str.as_ref())
    }
}

/// Collect the change set left behind by an agent
async fn collect_changes(workspace: &Path, summary: String) -> Result<CodeChange, CodegenError> {
    let (modified_files, created_files) = crate::github::working_tree_changes(workspace).await?;
    Ok(CodeChange {
        summary,
        modified_files,
        created_files,
    })
}
