use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::fields::{FieldIds, FieldKey};
use crate::model::source::SourceIssue;
use crate::model::target::{FieldValue, IssueFields, TargetIssue};

/// Last-sync field value, e.g. `2024-01-31T09:15:00.0+0000`.
pub fn format_sync_time(at: DateTime<Utc>) -> String {
    format!(
        "{}.{}{}",
        at.format("%Y-%m-%dT%H:%M:%S"),
        at.timestamp_subsec_millis() / 100,
        at.format("%z")
    )
}

/// GitHub labels as Jira accepts them: Jira label values cannot contain
/// spaces.
pub fn jira_labels(labels: &[String]) -> Vec<String> {
    labels.iter().map(|l| l.replace(' ', "-")).collect()
}

fn string_field_differs(value: &FieldValue, expected: &str) -> bool {
    value.as_str() != Some(expected)
}

/// Whether any tracked attribute of the GitHub issue differs from its
/// Jira mirror.
///
/// A missing or wrongly typed custom field counts as different. Labels
/// are only checked when the GitHub issue has any; each must appear in
/// the Jira label field. Labels present only in Jira never force an update.
pub fn issue_changed(source: &SourceIssue, target: &TargetIssue, ids: &FieldIds) -> bool {
    let title = source.title != target.summary;
    let body = source.body != target.description;
    let state = string_field_differs(target.field(&ids.key(FieldKey::GitHubStatus)), &source.state);
    let reporter = string_field_differs(
        target.field(&ids.key(FieldKey::GitHubReporter)),
        &source.reporter,
    );

    let labels = if source.labels.is_empty() {
        false
    } else {
        match target.field(&ids.key(FieldKey::GitHubLabels)).as_str_list() {
            Some(existing) => jira_labels(&source.labels)
                .iter()
                .any(|label| !existing.contains(label)),
            None => true,
        }
    };

    let changed = title || body || state || reporter || labels;
    debug!(
        issue = source.number,
        key = %target.key,
        title,
        body,
        state,
        reporter,
        labels,
        "compared issue fields"
    );
    changed
}

fn tracked_fields(
    source: &SourceIssue,
    ids: &FieldIds,
    now: DateTime<Utc>,
) -> BTreeMap<String, FieldValue> {
    BTreeMap::from([
        (
            ids.key(FieldKey::GitHubStatus),
            FieldValue::from(source.state.as_str()),
        ),
        (
            ids.key(FieldKey::GitHubReporter),
            FieldValue::from(source.reporter.as_str()),
        ),
        (
            ids.key(FieldKey::GitHubLabels),
            FieldValue::from(jira_labels(&source.labels)),
        ),
        (
            ids.key(FieldKey::LastSync),
            FieldValue::from(format_sync_time(now)),
        ),
    ])
}

/// Fields for a new Jira issue mirroring `source`. The GitHub ID and number
/// are only ever written here.
pub fn create_fields(
    source: &SourceIssue,
    ids: &FieldIds,
    issue_type: &str,
    now: DateTime<Utc>,
) -> IssueFields {
    let mut custom = tracked_fields(source, ids, now);
    custom.insert(ids.key(FieldKey::GitHubId), FieldValue::from(source.id));
    custom.insert(
        ids.key(FieldKey::GitHubNumber),
        FieldValue::from(source.number as i64),
    );
    IssueFields {
        summary: source.title.clone(),
        description: source.body.clone(),
        issue_type: issue_type.to_string(),
        custom,
    }
}

/// Full overwrite of every tracked field on an existing mirror.
pub fn update_fields(
    source: &SourceIssue,
    target: &TargetIssue,
    ids: &FieldIds,
    default_type: &str,
    now: DateTime<Utc>,
) -> IssueFields {
    IssueFields {
        summary: source.title.clone(),
        description: source.body.clone(),
        issue_type: target
            .issue_type
            .clone()
            .unwrap_or_else(|| default_type.to_string()),
        custom: tracked_fields(source, ids, now),
    }
}
