pub mod github;
pub mod jira;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::source::{Repo, SourceComment, SourceIssue, SourceUser};
use crate::model::target::{IssueFields, TargetComment, TargetIssue};

/// Read-only access to the GitHub repository being mirrored.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Issues (never pull requests) updated since `since`.
    async fn list_issues(&self, repo: &Repo, since: Option<DateTime<Utc>>)
        -> Result<Vec<SourceIssue>>;
    /// Comments on one issue, oldest first.
    async fn list_comments(
        &self,
        repo: &Repo,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourceComment>>;
    async fn get_user(&self, login: &str) -> Result<SourceUser>;
}

/// The Jira project holding the mirrors.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Issues in the project whose GitHub-ID field is one of `github_ids`.
    async fn list_issues(&self, github_ids: &[i64]) -> Result<Vec<TargetIssue>>;
    async fn get_issue(&self, key: &str) -> Result<TargetIssue>;
    async fn create_issue(&self, fields: &IssueFields) -> Result<TargetIssue>;
    async fn update_issue(&self, key: &str, fields: &IssueFields) -> Result<()>;
    async fn create_comment(&self, issue_key: &str, body: &str) -> Result<TargetComment>;
    async fn update_comment(
        &self,
        issue_key: &str,
        comment_id: &str,
        body: &str,
    ) -> Result<TargetComment>;
    /// True when writes are only logged. Write results then echo the
    /// request and nothing exists on the server.
    fn dry_run(&self) -> bool {
        false
    }
}
