mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use crate::pipeline::RetryPolicy;
use defaults::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            intake: IntakeConfig::default(),
            tracker: TrackerConfig::default(),
            planner: PlannerConfig::default(),
            github: GithubConfig::default(),
            codegen: CodegenConfig::default(),
            runtime: RuntimeConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay deployment settings from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("JIRA_BASE_URL") {
            self.tracker.base_url = v;
        }
        if let Some(v) = lookup("JIRA_USERNAME") {
            self.tracker.username = v;
        }
        if let Some(v) = lookup("JIRA_TOKEN") {
            self.tracker.token = v;
        }
        if let Some(v) = lookup("JIRA_PROJECT_KEY") {
            self.tracker.project_key = v;
        }
        if let Some(v) = lookup("JIRA_CUSTOM_FIELD") {
            self.tracker.custom_field = v;
        }
        if let Some(v) = lookup("JIRA_STATUS_FILTER") {
            self.intake.status_filter = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("JIRA_POLL_INTERVAL") {
            self.intake.poll_interval_sec =
                v.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "JIRA_POLL_INTERVAL",
                    reason: format!("expected seconds, got '{}'", v),
                })?;
        }
        if let Some(v) = lookup("GITHUB_TOKEN") {
            self.github.token = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.planner.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.planner.model = v;
        }
        if let Some(v) = lookup("WORKSPACE_DIR") {
            self.runtime.workspace_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("TASK_QUEUE") {
            self.runtime.task_queue = v;
        }
        if let Some(v) = lookup("KHITOMER_BIND") {
            self.api.bind = v;
        }
        Ok(())
    }

    /// Validate structural settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake.status_filter.is_empty() {
            return Err(ConfigError::Invalid {
                field: "intake.status_filter",
                reason: "at least one status is required".to_string(),
            });
        }
        if self.intake.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "intake.queue_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.intake.poll_interval_sec == 0 {
            return Err(ConfigError::Invalid {
                field: "intake.poll_interval_sec",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.runtime.retry.maximum_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.retry.maximum_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.runtime.retry.backoff_coefficient < 1.0 {
            return Err(ConfigError::Invalid {
                field: "runtime.retry.backoff_coefficient",
                reason: "must be at least 1.0".to_string(),
            });
        }
        if self.codegen.timeout_sec > self.runtime.step_timeout_sec
            || self.codegen.test_timeout_sec > self.runtime.step_timeout_sec
        {
            return Err(ConfigError::Invalid {
                field: "codegen.timeout_sec",
                reason: "agent and test timeouts must fit inside runtime.step_timeout_sec"
                    .to_string(),
            });
        }
        if self.runtime.max_concurrent_runs == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.max_concurrent_runs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Validate the credentials needed to talk to the external services
    pub fn validate_services(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let required = [
            ("tracker.base_url", &self.tracker.base_url),
            ("tracker.token", &self.tracker.token),
            ("tracker.project_key", &self.tracker.project_key),
            ("github.token", &self.github.token),
            ("planner.api_key", &self.planner.api_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.intake.poll_interval_sec)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.step_timeout_sec)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.runtime.retry;
        RetryPolicy {
            initial_interval: Duration::from_millis(retry.initial_interval_ms),
            backoff_coefficient: retry.backoff_coefficient,
            maximum_interval: Duration::from_millis(retry.maximum_interval_ms),
            maximum_attempts: retry.maximum_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_service_conventions() {
        let config = Config::default();
        assert_eq!(config.intake.queue_capacity, 10);
        assert_eq!(config.intake.status_filter, vec!["Ready for Development"]);
        assert_eq!(config.github.branch_prefix, "khitomer");
        assert_eq!(config.runtime.task_queue, "implementation-queue");
        assert_eq!(config.runtime.retry.maximum_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
intake:
  status_filter: ["Ready", "Selected"]
tracker:
  base_url: https://example.atlassian.net
  project_key: PROJ
runtime:
  retry:
    maximum_attempts: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.intake.status_filter, vec!["Ready", "Selected"]);
        assert_eq!(config.intake.poll_interval_sec, 300);
        assert_eq!(config.tracker.custom_field, "Repository");
        assert_eq!(config.runtime.retry.maximum_attempts, 5);
        assert_eq!(config.runtime.retry.initial_interval_ms, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("JIRA_TOKEN", "secret"),
            ("JIRA_STATUS_FILTER", "Ready, In Analysis ,"),
            ("JIRA_POLL_INTERVAL", "60"),
            ("GITHUB_TOKEN", "ghp_x"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.tracker.token, "secret");
        assert_eq!(config.intake.status_filter, vec!["Ready", "In Analysis"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.github.token, "ghp_x");
    }

    #[test]
    fn test_invalid_poll_interval_env() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| {
            (k == "JIRA_POLL_INTERVAL").then(|| "5m".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_status_filter() {
        let mut config = Config::default();
        config.intake.status_filter.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "intake.status_filter",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_services_requires_credentials() {
        let mut config = Config::default();
        config.tracker.base_url = "https://example.atlassian.net".to_string();
        config.tracker.token = "t".to_string();
        config.tracker.project_key = "PROJ".to_string();
        config.planner.api_key = "sk".to_string();

        assert!(matches!(
            config.validate_services(),
            Err(ConfigError::Missing("github.token"))
        ));

        config.github.token = "ghp_x".to_string();
        assert!(config.validate_services().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.version, 1);
    }
}
