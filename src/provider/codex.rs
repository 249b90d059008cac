use super::{build_prompt, collect_changes, command_for, CodeChange, CodeGenerator};
use crate::error::CodegenError;
use crate::model::{ImplementationPlan, Task};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout as tokio_timeout;
use tracing::info;

/// Codex CLI `exec`, prompt on stdin, sandboxed to the workspace
pub struct CodexCodegen {
    pub binary: PathBuf,
    pub model: String,
    pub timeout: Duration,
}

#[async_trait]
impl CodeGenerator for CodexCodegen {
    fn name(&self) -> &'static str {
        "codex_cli"
    }

    async fn apply(
        &self,
        task: &Task,
        plan: &ImplementationPlan,
        workspace: &Path,
    ) -> Result<CodeChange, CodegenError> {
        let prompt = build_prompt(task, plan);

        // Capture the final assistant message to a temp file
        let out_file = NamedTempFile::new()?;

        let mut cmd = command_for(&self.binary);
        cmd.arg("exec")
            .arg("--model")
            .arg(&self.model)
            .arg("--full-auto")
            .arg("--output-last-message")
            .arg(out_file.path())
            .arg("-");

        cmd.current_dir(workspace)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = tokio_timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CodegenError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CodegenError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let summary = tokio::fs::read_to_string(out_file.path())
            .await
            .unwrap_or_default()
            .trim()
            .to_string();
        let change = collect_changes(workspace, summary).await?;
        info!(
            "codex changed {} file(s), created {} for {}",
            change.modified_files.len(),
            change.created_files.len(),
            task.ticket_id
        );
        Ok(change)
    }
}
