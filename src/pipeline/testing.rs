use crate::error::TestRunError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, info};

const OUTPUT_TAIL: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Rust,
    Go,
    Node,
    Python,
}

impl ProjectKind {
    /// Recognise a project by its marker file at the workspace root
    pub fn detect(workspace: &Path) -> Option<Self> {
        let markers: [(&str, ProjectKind); 5] = [
            ("Cargo.toml", ProjectKind::Rust),
            ("go.mod", ProjectKind::Go),
            ("package.json", ProjectKind::Node),
            ("pyproject.toml", ProjectKind::Python),
            ("setup.py", ProjectKind::Python),
        ];
        markers
            .iter()
            .find(|(marker, _)| workspace.join(marker).is_file())
            .map(|(_, kind)| *kind)
    }

    pub fn program(&self) -> &'static str {
        match self {
            ProjectKind::Rust => "cargo",
            ProjectKind::Go => "go",
            ProjectKind::Node => "npm",
            ProjectKind::Python => "pytest",
        }
    }

    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ProjectKind::Rust => &["test"],
            ProjectKind::Go => &["test", "./..."],
            ProjectKind::Node => &["test"],
            ProjectKind::Python => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// `None` when no recognisable project was found
    pub project: Option<ProjectKind>,
    pub passed: bool,
    pub output: String,
    pub failures: Vec<String>,
}

impl TestReport {
    pub fn vacuous() -> Self {
        Self {
            project: None,
            passed: true,
            output: String::new(),
            failures: Vec::new(),
        }
    }
}

#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, workspace: &Path) -> Result<TestReport, TestRunError>;
}

/// Runs the detected project's native test command
pub struct CommandTestRunner {
    pub timeout: Duration,
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, workspace: &Path) -> Result<TestReport, TestRunError> {
        let Some(kind) = ProjectKind::detect(workspace) else {
            debug!("No recognisable project in {:?}, skipping tests", workspace);
            return Ok(TestReport::vacuous());
        };

        let (program, args) = (kind.program(), kind.args());
        info!("Running {} {} in {:?}", program, args.join(" "), workspace);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workspace)
            .kill_on_drop(true)
            .stdin(Stdio::null());

        let output = tokio_timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| TestRunError::Timeout(self.timeout))??;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        Ok(TestReport {
            project: Some(kind),
            passed: output.status.success(),
            failures: failure_lines(&combined),
            output: tail(&combined, OUTPUT_TAIL),
        })
    }
}

/// Lines that name a failing test, across the supported runners
fn failure_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            (line.starts_with("test ") && line.ends_with("FAILED"))
                || line.starts_with("--- FAIL:")
                || line.starts_with("FAILED ")
                || line.starts_with("✕")
        })
        .map(str::to_string)
        .collect()
}

fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    s.chars().skip(count - max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_project_kind() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), None);

        std::fs::write(dir.path().join("setup.py"), "").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), Some(ProjectKind::Python));

        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), Some(ProjectKind::Go));

        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), Some(ProjectKind::Rust));
    }

    #[tokio::test]
    async fn test_unrecognised_project_passes_vacuously() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandTestRunner {
            timeout: Duration::from_secs(5),
        };
        let report = runner.run(dir.path()).await.unwrap();
        assert!(report.passed);
        assert_eq!(report.project, None);
    }

    #[test]
    fn test_failure_lines() {
        let output = "running 2 tests\ntest a::works ... ok\ntest a::breaks ... FAILED\n--- FAIL: TestX (0.00s)\nFAILED tests/test_api.py::test_login\n";
        assert_eq!(
            failure_lines(output),
            vec![
                "test a::breaks ... FAILED",
                "--- FAIL: TestX (0.00s)",
                "FAILED tests/test_api.py::test_login"
            ]
        );
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }
}
