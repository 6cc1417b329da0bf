pub mod comments;
pub mod fields;
pub mod header;
pub mod issues;

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::fields::FieldIds;
use crate::model::source::{Repo, SourceIssue, SourceUser};
use crate::model::target::TargetIssue;
use crate::providers::{SourceClient, TargetClient};
use crate::util::clock::Clock;
use issues::IssueAction;

#[derive(Debug, Error, PartialEq)]
pub enum SyncError {
    #[error("comment header carries an invalid GitHub comment ID '{value}'")]
    InvalidCommentId { value: String },
    #[error("Jira comment {comment_id} matched a GitHub comment but its header could not be parsed")]
    UnparseableComment { comment_id: String },
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub repo: Repo,
    /// Issue type for newly created Jira issues.
    pub issue_type: String,
}

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Issues whose processing stopped on an error.
    pub failed: usize,
    /// GitHub numbers of the failed issues.
    pub failed_issues: Vec<u64>,
    pub comments_created: usize,
    pub comments_updated: usize,
}

pub struct Syncer {
    source: Box<dyn SourceClient>,
    target: Box<dyn TargetClient>,
    fields: FieldIds,
    clock: Box<dyn Clock>,
    options: SyncOptions,
}

impl Syncer {
    pub fn new(
        source: Box<dyn SourceClient>,
        target: Box<dyn TargetClient>,
        fields: FieldIds,
        clock: Box<dyn Clock>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            target,
            fields,
            clock,
            options,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mirror every GitHub issue updated since `since` into Jira.
    ///
    /// Failing to list either side aborts the pass. Any other failure is
    /// logged against its issue and the pass moves on.
    pub async fn run_pass(&self, since: Option<DateTime<Utc>>) -> Result<PassReport> {
        let mut report = PassReport::default();

        let issues = self
            .source
            .list_issues(&self.options.repo, since)
            .await
            .context("listing GitHub issues")?;
        if issues.is_empty() {
            info!(repo = %self.options.repo, "no GitHub issues to sync");
            return Ok(report);
        }

        let ids: Vec<i64> = issues.iter().map(|i| i.id).collect();
        let existing = self
            .target
            .list_issues(&ids)
            .await
            .context("listing Jira issues")?;
        debug!(github = issues.len(), jira = existing.len(), "collected issues");

        let plan = issues::compare(&issues, &existing, &self.fields);
        debug!(
            create = plan.to_create().len(),
            update = plan.to_update().len(),
            "planned issue actions"
        );
        for action in &plan.actions {
            let (gh, outcome) = match *action {
                IssueAction::Create(gh) => (gh, self.create_issue(gh, since, &mut report).await),
                IssueAction::Update(gh, jira) => {
                    (gh, self.update_issue(gh, jira, since, &mut report).await)
                }
            };
            if let Err(err) = outcome {
                report.failed += 1;
                report.failed_issues.push(gh.number);
                error!(issue = gh.number, error = %format!("{err:#}"), "failed to sync issue");
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            comments_created = report.comments_created,
            comments_updated = report.comments_updated,
            "sync pass finished"
        );
        Ok(report)
    }

    async fn create_issue(
        &self,
        gh: &SourceIssue,
        since: Option<DateTime<Utc>>,
        report: &mut PassReport,
    ) -> Result<()> {
        let fields =
            fields::create_fields(gh, &self.fields, &self.options.issue_type, self.clock.now());
        let created = self
            .target
            .create_issue(&fields)
            .await
            .with_context(|| format!("creating Jira issue for #{}", gh.number))?;
        report.created += 1;
        info!(issue = gh.number, key = %created.key, "created Jira issue");

        // A dry-run create leaves nothing on the server to read back.
        let current = if self.target.dry_run() {
            created
        } else {
            self.refetch(&created.key).await?
        };
        self.sync_comments(gh, &current, since, report).await
    }

    async fn update_issue(
        &self,
        gh: &SourceIssue,
        jira: &TargetIssue,
        since: Option<DateTime<Utc>>,
        report: &mut PassReport,
    ) -> Result<()> {
        if fields::issue_changed(gh, jira, &self.fields) {
            let fields = fields::update_fields(
                gh,
                jira,
                &self.fields,
                &self.options.issue_type,
                self.clock.now(),
            );
            self.target
                .update_issue(&jira.key, &fields)
                .await
                .with_context(|| format!("updating Jira issue {}", jira.key))?;
            report.updated += 1;
            info!(issue = gh.number, key = %jira.key, "updated Jira issue");
        } else {
            report.unchanged += 1;
            debug!(issue = gh.number, key = %jira.key, "Jira issue already up to date");
        }

        let current = self.refetch(&jira.key).await?;
        self.sync_comments(gh, &current, since, report).await
    }

    async fn refetch(&self, key: &str) -> Result<TargetIssue> {
        self.target
            .get_issue(key)
            .await
            .with_context(|| format!("fetching Jira issue {key}"))
    }

    async fn sync_comments(
        &self,
        gh: &SourceIssue,
        jira: &TargetIssue,
        since: Option<DateTime<Utc>>,
        report: &mut PassReport,
    ) -> Result<()> {
        if gh.comments == 0 {
            debug!(issue = gh.number, "issue has no comments");
            return Ok(());
        }

        let comments = self
            .source
            .list_comments(&self.options.repo, gh.number, since)
            .await
            .with_context(|| format!("listing comments on #{}", gh.number))?;
        let plan = comments::reconcile(&comments, &jira.comments)
            .with_context(|| format!("comparing comments of {}", jira.key))?;
        if plan.is_empty() {
            debug!(issue = gh.number, key = %jira.key, unchanged = plan.unchanged, "comments up to date");
            return Ok(());
        }

        let mut authors = HashMap::new();
        for comment in &plan.to_create {
            let author = self.author(&mut authors, &comment.author).await?;
            let body = header::format_comment(comment, &author);
            let created = self
                .target
                .create_comment(&jira.key, &body)
                .await
                .with_context(|| format!("creating comment on {}", jira.key))?;
            report.comments_created += 1;
            debug!(key = %jira.key, comment = comment.id, jira_comment = %created.id, "created comment");
        }

        for pair in &plan.to_update {
            let author = self.author(&mut authors, &pair.source.author).await?;
            let body = header::format_comment(pair.source, &author);
            self.target
                .update_comment(&jira.key, &pair.target.id, &body)
                .await
                .with_context(|| format!("updating comment {} on {}", pair.target.id, jira.key))?;
            report.comments_updated += 1;
            debug!(key = %jira.key, comment = pair.source.id, jira_comment = %pair.target.id, "updated comment");
        }

        Ok(())
    }

    async fn author(
        &self,
        cache: &mut HashMap<String, SourceUser>,
        login: &str,
    ) -> Result<SourceUser> {
        if let Some(user) = cache.get(login) {
            return Ok(user.clone());
        }
        let user = self
            .source
            .get_user(login)
            .await
            .with_context(|| format!("looking up GitHub user {login}"))?;
        cache.insert(login.to_string(), user.clone());
        Ok(user)
    }
}
