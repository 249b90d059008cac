use super::{parse_repo_reference, Tracker};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::model::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Jira REST v2 client
pub struct JiraClient {
    http: reqwest::Client,
    config: TrackerConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    names: HashMap<String, String>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
struct Transition {
    id: String,
    name: String,
    #[serde(default)]
    to: Option<TransitionTarget>,
}

#[derive(Debug, Deserialize)]
struct TransitionTarget {
    name: String,
}

impl JiraClient {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("khitomer")
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Accept", "application/json");
        if self.config.username.is_empty() {
            builder.bearer_auth(&self.config.token)
        } else {
            builder.basic_auth(&self.config.username, Some(&self.config.token))
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, TrackerError> {
        let resp = self.authed(builder).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrackerError::Api {
            status: status.as_u16(),
            body,
        })
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.config.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl Tracker for JiraClient {
    async fn search_by_status(&self, status: &str) -> Result<Vec<Task>, TrackerError> {
        let jql = search_jql(&self.config.project_key, status);
        let mut tasks = Vec::new();
        let mut start_at = 0u32;

        let max_results = self.config.page_size.to_string();

        loop {
            let start = start_at.to_string();
            let page: SearchResponse = self
                .send(self.http.get(self.url("search")).query(&[
                    ("jql", jql.as_str()),
                    ("expand", "names"),
                    ("startAt", start.as_str()),
                    ("maxResults", max_results.as_str()),
                ]))
                .await?
                .json()
                .await?;

            let count = page.issues.len() as u32;
            for issue in &page.issues {
                match issue_to_task(issue, &page.names, &self.config) {
                    Ok(mut task) => {
                        task.tracker_url = self.browse_url(&task.ticket_id);
                        tasks.push(task);
                    }
                    Err(e) => debug!("Skipping issue: {}", e),
                }
            }

            start_at += count;
            if count == 0 || start_at >= page.total {
                break;
            }
        }

        debug!("Status '{}' matched {} task(s)", status, tasks.len());
        Ok(tasks)
    }

    async fn get_by_id(&self, ticket_id: &str) -> Result<Task, TrackerError> {
        let resp = self
            .authed(
                self.http
                    .get(self.url(&format!("issue/{}", ticket_id)))
                    .query(&[("expand", "names")]),
            )
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TrackerError::NotFound(ticket_id.to_string()));
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrackerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let issue: Value = resp.json().await?;
        let names: HashMap<String, String> = issue
            .get("names")
            .and_then(|n| serde_json::from_value(n.clone()).ok())
            .unwrap_or_default();

        let mut task = issue_to_task(&issue, &names, &self.config)?;
        task.tracker_url = self.browse_url(&task.ticket_id);
        Ok(task)
    }

    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<(), TrackerError> {
        self.send(
            self.http
                .post(self.url(&format!("issue/{}/comment", ticket_id)))
                .json(&json!({ "body": text })),
        )
        .await?;
        Ok(())
    }

    async fn transition_status(
        &self,
        ticket_id: &str,
        target_status: &str,
    ) -> Result<(), TrackerError> {
        let path = format!("issue/{}/transitions", ticket_id);
        let available: TransitionsResponse =
            self.send(self.http.get(self.url(&path))).await?.json().await?;

        let transition = find_transition(&available.transitions, target_status).ok_or_else(|| {
            TrackerError::NoTransition {
                ticket: ticket_id.to_string(),
                status: target_status.to_string(),
            }
        })?;

        self.send(
            self.http
                .post(self.url(&path))
                .json(&json!({ "transition": { "id": transition.id } })),
        )
        .await?;
        debug!("Moved {} to '{}'", ticket_id, target_status);
        Ok(())
    }
}

fn search_jql(project_key: &str, status: &str) -> String {
    format!(
        "project = {} AND status = \"{}\"",
        project_key,
        status.replace('"', "\\\"")
    )
}

fn find_transition<'a>(transitions: &'a [Transition], target: &str) -> Option<&'a Transition> {
    transitions.iter().find(|t| {
        t.to.as_ref()
            .map(|to| to.name.eq_ignore_ascii_case(target))
            .unwrap_or(false)
            || t.name.eq_ignore_ascii_case(target)
    })
}

/// Locate the field id holding the repository reference.
fn repository_field_id(names: &HashMap<String, String>, fields: &Value, wanted: &str) -> Option<String> {
    if let Some((id, _)) = names.iter().find(|(_, name)| name.eq_ignore_ascii_case(wanted)) {
        return Some(id.clone());
    }
    let wanted = wanted.to_lowercase();
    fields
        .as_object()?
        .keys()
        .find(|key| key.to_lowercase().contains(&wanted))
        .cloned()
}

/// Custom fields arrive as plain strings, option objects, or single-element arrays
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("name"))
            .and_then(field_text),
        Value::Array(items) => items.iter().find_map(field_text),
        _ => None,
    }
}

fn parse_created(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
    })
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(Utc::now)
}

/// Convert a Jira issue document into a task
fn issue_to_task(
    issue: &Value,
    names: &HashMap<String, String>,
    config: &TrackerConfig,
) -> Result<Task, TrackerError> {
    let key = issue
        .get("key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let fields = issue.get("fields").cloned().unwrap_or(Value::Null);

    let reference = repository_field_id(names, &fields, &config.custom_field)
        .and_then(|id| fields.get(&id).and_then(field_text));
    let (repo_owner, repo_name) = reference
        .as_deref()
        .and_then(parse_repo_reference)
        .ok_or_else(|| TrackerError::NoRepository(key.clone()))?;

    let repo_url = reference
        .filter(|r| r.starts_with("http"))
        .map(|r| r.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();

    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(Task {
        ticket_id: key,
        title: text("summary"),
        description: text("description"),
        status: fields
            .pointer("/status/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        assignee: fields
            .pointer("/assignee/displayName")
            .and_then(Value::as_str)
            .map(str::to_string),
        repo_owner,
        repo_name,
        base_branch: config.default_base_branch.clone(),
        repo_url,
        tracker_url: String::new(),
        created_at: parse_created(fields.get("created").and_then(Value::as_str)),
    })
}
