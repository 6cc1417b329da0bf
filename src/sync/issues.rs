use tracing::{debug, warn};

use crate::model::fields::{FieldIds, FieldKey};
use crate::model::source::SourceIssue;
use crate::model::target::TargetIssue;

/// What to do with one GitHub issue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IssueAction<'a> {
    Create(&'a SourceIssue),
    Update(&'a SourceIssue, &'a TargetIssue),
}

/// Per-issue decisions, in the order the GitHub issues were listed.
#[derive(Debug, Default, PartialEq)]
pub struct IssuePlan<'a> {
    pub actions: Vec<IssueAction<'a>>,
}

impl<'a> IssuePlan<'a> {
    pub fn to_create(&self) -> Vec<&'a SourceIssue> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                IssueAction::Create(s) => Some(*s),
                IssueAction::Update(..) => None,
            })
            .collect()
    }

    pub fn to_update(&self) -> Vec<(&'a SourceIssue, &'a TargetIssue)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                IssueAction::Update(s, t) => Some((*s, *t)),
                IssueAction::Create(_) => None,
            })
            .collect()
    }
}

/// Pair each GitHub issue with the Jira issue whose GitHub-ID field holds
/// its ID. Jira issues with a missing or non-numeric ID never match.
pub fn compare<'a>(
    source: &'a [SourceIssue],
    target: &'a [TargetIssue],
    ids: &FieldIds,
) -> IssuePlan<'a> {
    let id_key = ids.key(FieldKey::GitHubId);
    let mut actions = Vec::with_capacity(source.len());

    for gh in source {
        let matched = target.iter().find(|jira| {
            let value = jira.field(&id_key);
            match value.as_i64() {
                Some(id) => id == gh.id,
                None => {
                    if value.is_missing() {
                        debug!(key = %jira.key, "GitHub ID field is not set");
                    } else {
                        warn!(key = %jira.key, value = ?value, "GitHub ID field is not numeric");
                    }
                    false
                }
            }
        });

        match matched {
            Some(jira) => {
                debug!(issue = gh.number, key = %jira.key, "matched existing Jira issue");
                actions.push(IssueAction::Update(gh, jira));
            }
            None => {
                debug!(issue = gh.number, "no Jira issue yet");
                actions.push(IssueAction::Create(gh));
            }
        }
    }

    IssuePlan { actions }
}
