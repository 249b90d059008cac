use super::git::{authenticated_url, git_succeeds, run_git};
use super::{CommitOutcome, VcsHost};
use crate::config::GithubConfig;
use crate::error::HostingError;
use crate::model::{RepositoryInfo, ReviewRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// GitHub: git over https with a token, pull requests over REST
pub struct GitHubHost {
    http: reqwest::Client,
    config: GithubConfig,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    html_url: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
}

impl From<PullRequest> for ReviewRequest {
    fn from(pr: PullRequest) -> Self {
        ReviewRequest {
            number: pr.number,
            url: pr.html_url,
            title: pr.title,
            body: pr.body.unwrap_or_default(),
            state: pr.state,
        }
    }
}

impl GitHubHost {
    pub fn new(config: GithubConfig) -> Result<Self, HostingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("khitomer")
            .build()?;
        Ok(Self { http, config })
    }

    fn pulls_url(&self, repo: &RepositoryInfo) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.config.api_url.trim_end_matches('/'),
            repo.owner,
            repo.name
        )
    }

    fn api(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(&self.config.token)
    }

    fn secret(&self) -> Option<&str> {
        Some(self.config.token.as_str())
    }

    async fn find_open(
        &self,
        repo: &RepositoryInfo,
        head: &str,
    ) -> Result<Option<ReviewRequest>, HostingError> {
        let head_ref = format!("{}:{}", repo.owner, head);
        let resp = self
            .api(self.http.get(self.pulls_url(repo)).query(&[
                ("head", head_ref.as_str()),
                ("base", repo.base_branch.as_str()),
                ("state", "open"),
            ]))
            .send()
            .await?;
        let open: Vec<PullRequest> = check(resp).await?.json().await?;
        Ok(open.into_iter().next().map(ReviewRequest::from))
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, HostingError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(HostingError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl VcsHost for GitHubHost {
    async fn clone_repository(
        &self,
        repo: &RepositoryInfo,
        dest: &Path,
    ) -> Result<PathBuf, HostingError> {
        if dest.exists() {
            debug!("Removing stale workspace {:?}", dest);
            tokio::fs::remove_dir_all(dest).await?;
        }
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        let url = authenticated_url(&repo.clone_url, &self.config.token);
        let dest_str = dest.to_string_lossy();
        run_git(
            parent,
            &["clone", "--branch", &repo.base_branch, &url, &dest_str],
            self.secret(),
        )
        .await?;

        info!("Cloned {} ({}) into {:?}", repo.slug(), repo.base_branch, dest);
        Ok(dest.to_path_buf())
    }

    async fn create_branch(
        &self,
        workspace: &Path,
        base: &str,
        branch: &str,
    ) -> Result<(), HostingError> {
        run_git(workspace, &["checkout", "-B", branch, base], None).await?;
        Ok(())
    }

    async fn commit(&self, workspace: &Path, message: &str) -> Result<CommitOutcome, HostingError> {
        run_git(workspace, &["add", "-A"], None).await?;

        if git_succeeds(workspace, &["diff", "--cached", "--quiet"]).await? {
            return Ok(CommitOutcome::NoChanges);
        }

        let name = format!("user.name={}", self.config.author_name);
        let email = format!("user.email={}", self.config.author_email);
        run_git(
            workspace,
            &["-c", &name, "-c", &email, "commit", "-m", message],
            None,
        )
        .await?;
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self, workspace: &Path, branch: &str) -> Result<(), HostingError> {
        run_git(
            workspace,
            &["push", "--force", "-u", "origin", branch],
            self.secret(),
        )
        .await?;
        Ok(())
    }

    async fn open_review_request(
        &self,
        repo: &RepositoryInfo,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<ReviewRequest, HostingError> {
        if let Some(existing) = self.find_open(repo, head).await? {
            info!(
                "Reusing open pull request #{} for {}",
                existing.number, head
            );
            return Ok(existing);
        }

        let resp = self
            .api(self.http.post(self.pulls_url(repo)).json(&json!({
                "title": title,
                "head": head,
                "base": repo.base_branch,
                "body": body,
            })))
            .send()
            .await?;
        let created: PullRequest = check(resp).await?.json().await?;
        Ok(created.into())
    }
}
