use super::{build_prompt, collect_changes, command_for, CodeChange, CodeGenerator};
use crate::error::CodegenError;
use crate::model::{ImplementationPlan, Task};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, info};

/// Claude Code CLI in print mode with edit permissions
pub struct ClaudeCodegen {
    pub binary: PathBuf,
    pub model: String,
    pub tools: Vec<String>,
    pub permission_mode: String,
    pub timeout: Duration,
}

#[async_trait]
impl CodeGenerator for ClaudeCodegen {
    fn name(&self) -> &'static str {
        "claude_cli"
    }

    async fn apply(
        &self,
        task: &Task,
        plan: &ImplementationPlan,
        workspace: &Path,
    ) -> Result<CodeChange, CodegenError> {
        let prompt = build_prompt(task, plan);

        let mut cmd = command_for(&self.binary);
        cmd.current_dir(workspace).kill_on_drop(true);

        // Ensure subscription auth is used (not API key)
        cmd.env_remove("ANTHROPIC_API_KEY");

        cmd.arg("-p")
            .arg(&prompt)
            .arg("--model")
            .arg(&self.model)
            .arg("--output-format")
            .arg("json")
            .arg("--allowedTools")
            .arg(self.tools.join(","))
            .arg("--permission-mode")
            .arg(&self.permission_mode);

        let start = std::time::Instant::now();
        let output = tokio_timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| CodegenError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CodegenError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        debug!("claude finished {} in {:?}", task.ticket_id, start.elapsed());

        let summary = result_text(&String::from_utf8_lossy(&output.stdout));
        let change = collect_changes(workspace, summary).await?;
        info!(
            "claude changed {} file(s), created {} for {}",
            change.modified_files.len(),
            change.created_files.len(),
            task.ticket_id
        );
        Ok(change)
    }
}

/// The final assistant message from `--output-format json`
fn result_text(stdout: &str) -> String {
    serde_json::from_str::<Value>(stdout)
        .ok()
        .and_then(|v| v.get("result").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| stdout.to_string())
        .trim()
        .to_string()
}
