use std::path::PathBuf;

pub fn default_version() -> u32 {
    1
}

pub fn default_poll_interval_sec() -> u64 {
    300
}

pub fn default_status_filter() -> Vec<String> {
    vec!["Ready for Development".to_string()]
}

pub fn default_queue_capacity() -> usize {
    10
}

pub fn default_custom_field() -> String {
    "Repository".to_string()
}

pub fn default_base_branch() -> String {
    "main".to_string()
}

pub fn default_page_size() -> u32 {
    50
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

pub fn default_temperature() -> f32 {
    0.7
}

pub fn default_request_timeout_sec() -> u64 {
    120
}

pub fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

pub fn default_git_host() -> String {
    "github.com".to_string()
}

pub fn default_author_name() -> String {
    "Khitomer Bot".to_string()
}

pub fn default_author_email() -> String {
    "khitomer@example.com".to_string()
}

pub fn default_branch_prefix() -> String {
    "khitomer".to_string()
}

pub fn default_claude_binary() -> PathBuf {
    // Check common install location first
    if let Some(home) = std::env::var_os("HOME") {
        let local_path = PathBuf::from(home).join(".claude/local/claude");
        if local_path.exists() {
            return local_path;
        }
    }
    PathBuf::from("claude")
}

pub fn default_claude_model() -> String {
    "sonnet".to_string()
}

pub fn default_claude_tools() -> Vec<String> {
    ["Read", "Grep", "Glob", "Edit", "Write", "MultiEdit"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

pub fn default_permission_mode() -> String {
    "acceptEdits".to_string()
}

pub fn default_codex_binary() -> PathBuf {
    PathBuf::from("codex")
}

pub fn default_codex_model() -> String {
    "gpt-4.1".to_string()
}

pub fn default_codegen_timeout_sec() -> u64 {
    540
}

pub fn default_test_timeout_sec() -> u64 {
    540
}

pub fn default_task_queue() -> String {
    "implementation-queue".to_string()
}

pub fn default_state_dir() -> PathBuf {
    PathBuf::from(".khitomer")
}

pub fn default_workspace_root() -> PathBuf {
    PathBuf::from("/tmp/khitomer-workspace")
}

pub fn default_step_timeout_sec() -> u64 {
    600
}

pub fn default_max_concurrent_runs() -> usize {
    4
}

pub fn default_initial_interval_ms() -> u64 {
    1000
}

pub fn default_backoff_coefficient() -> f64 {
    2.0
}

pub fn default_maximum_interval_ms() -> u64 {
    60_000
}

pub fn default_maximum_attempts() -> u32 {
    3
}

pub fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}
