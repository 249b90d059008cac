use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub intake: IntakeConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub codegen: CodegenConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct IntakeConfig {
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,

    /// Tracker statuses queried on every tick, in order
    #[serde(default = "default_status_filter")]
    pub status_filter: Vec<String>,

    /// Capacity of the queue between the poller and the orchestrator
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            poll_interval_sec: default_poll_interval_sec(),
            status_filter: default_status_filter(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct TrackerConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub project_key: String,

    /// Name of the custom field holding `owner/repo` or a repository URL
    #[serde(default = "default_custom_field")]
    pub custom_field: String,

    #[serde(default = "default_base_branch")]
    pub default_base_branch: String,

    /// Status to move a ticket to once its pull request is open
    #[serde(default)]
    pub review_status: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            token: String::new(),
            project_key: String::new(),
            custom_field: default_custom_field(),
            default_base_branch: default_base_branch(),
            review_status: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PlannerConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_openai_model(),
            temperature: default_temperature(),
            timeout_sec: default_request_timeout_sec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    #[serde(default = "default_git_host")]
    pub git_host: String,

    #[serde(default)]
    pub token: String,

    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Namespace prepended to every feature branch
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            git_host: default_git_host(),
            token: String::new(),
            author_name: default_author_name(),
            author_email: default_author_email(),
            branch_prefix: default_branch_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodegenConfig {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub claude_cli: ClaudeCliConfig,

    #[serde(default)]
    pub codex_cli: CodexCliConfig,

    #[serde(default = "default_codegen_timeout_sec")]
    pub timeout_sec: u64,

    #[serde(default = "default_test_timeout_sec")]
    pub test_timeout_sec: u64,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            claude_cli: ClaudeCliConfig::default(),
            codex_cli: CodexCliConfig::default(),
            timeout_sec: default_codegen_timeout_sec(),
            test_timeout_sec: default_test_timeout_sec(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    ClaudeCli,
    CodexCli,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::ClaudeCli => write!(f, "claude_cli"),
            Provider::CodexCli => write!(f, "codex_cli"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_claude_model")]
    pub model: String,

    #[serde(default = "default_claude_tools")]
    pub tools: Vec<String>,

    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: default_claude_binary(),
            model: default_claude_model(),
            tools: default_claude_tools(),
            permission_mode: default_permission_mode(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodexCliConfig {
    #[serde(default = "default_codex_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_codex_model")]
    pub model: String,
}

impl Default for CodexCliConfig {
    fn default() -> Self {
        Self {
            binary: default_codex_binary(),
            model: default_codex_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RuntimeConfig {
    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    /// Where finished run records are kept
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    #[serde(default = "default_step_timeout_sec")]
    pub step_timeout_sec: u64,

    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_queue: default_task_queue(),
            state_dir: default_state_dir(),
            workspace_root: default_workspace_root(),
            step_timeout_sec: default_step_timeout_sec(),
            max_concurrent_runs: default_max_concurrent_runs(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RetryConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,

    #[serde(default = "default_maximum_interval_ms")]
    pub maximum_interval_ms: u64,

    #[serde(default = "default_maximum_attempts")]
    pub maximum_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            backoff_coefficient: default_backoff_coefficient(),
            maximum_interval_ms: default_maximum_interval_ms(),
            maximum_attempts: default_maximum_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}
