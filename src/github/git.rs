use crate::error::HostingError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Run a git command inside `dir`, returning stdout without trailing whitespace.
///
/// `secret` is masked in any error text surfaced to callers.
pub async fn run_git(dir: &Path, args: &[&str], secret: Option<&str>) -> Result<String, HostingError> {
    let output = git_command(dir, args).output().await?;

    if !output.status.success() {
        return Err(HostingError::Git {
            command: redact(&args.join(" "), secret),
            stderr: redact(String::from_utf8_lossy(&output.stderr).trim(), secret),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Run a git command whose exit status carries the answer (e.g. `diff --quiet`)
pub async fn git_succeeds(dir: &Path, args: &[&str]) -> Result<bool, HostingError> {
    let status = git_command(dir, args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    Ok(status.success())
}

fn git_command(dir: &Path, args: &[&str]) -> Command {
    debug!("git {} (in {:?})", args.first().copied().unwrap_or_default(), dir);
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null());
    cmd
}

/// Embed an access token into an https clone URL
pub fn authenticated_url(clone_url: &str, token: &str) -> String {
    if token.is_empty() {
        return clone_url.to_string();
    }
    match clone_url.strip_prefix("https://") {
        Some(rest) if !rest.contains('@') => {
            format!("https://x-access-token:{}@{}", token, rest)
        }
        _ => clone_url.to_string(),
    }
}

/// Paths touched in the working tree, split into (modified, created)
pub fn parse_porcelain(status: &str) -> (Vec<String>, Vec<String>) {
    let mut modified = Vec::new();
    let mut created = Vec::new();

    for line in status.lines() {
        if line.len() < 4 {
            continue;
        }
        let (code, path) = line.split_at(3);
        let path = match path.split_once(" -> ") {
            Some((_, renamed)) => renamed,
            None => path,
        }
        .trim_matches('"')
        .to_string();

        match code.trim() {
            "??" | "A" | "AM" => created.push(path),
            _ => modified.push(path),
        }
    }

    (modified, created)
}

fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => text.replace(s, "***"),
        _ => text.to_string(),
    }
}
