use tracing::debug;

use super::header::{extract_fields, extract_id, has_header, MAX_BODY_LENGTH};
use super::SyncError;
use crate::model::source::SourceComment;
use crate::model::target::TargetComment;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentPair<'a> {
    pub source: &'a SourceComment,
    pub target: &'a TargetComment,
}

/// Writes needed to bring a Jira issue's comments in line with GitHub.
#[derive(Debug, Default, PartialEq)]
pub struct CommentPlan<'a> {
    pub to_create: Vec<&'a SourceComment>,
    pub to_update: Vec<CommentPair<'a>>,
    /// Matched pairs whose bodies already agree.
    pub unchanged: usize,
}

impl CommentPlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

/// Match each GitHub comment to the Jira comment carrying its ID.
///
/// Unmatched comments are created. Matched comments are updated only when
/// the body below the header differs from the GitHub body. Jira comments
/// without a generated header are ignored.
pub fn reconcile<'a>(
    source: &'a [SourceComment],
    target: &'a [TargetComment],
) -> Result<CommentPlan<'a>, SyncError> {
    let mut plan = CommentPlan::default();
    let foreign = target.iter().filter(|c| !has_header(&c.body)).count();
    if foreign > 0 {
        debug!(foreign, "ignoring Jira comments not mirrored from GitHub");
    }

    for gh in source {
        match find_match(gh, target)? {
            Some(jira) => {
                if needs_update(gh, jira)? {
                    plan.to_update.push(CommentPair {
                        source: gh,
                        target: jira,
                    });
                } else {
                    debug!(comment = gh.id, jira_comment = %jira.id, "comment up to date");
                    plan.unchanged += 1;
                }
            }
            None => plan.to_create.push(gh),
        }
    }

    Ok(plan)
}

fn find_match<'a>(
    gh: &SourceComment,
    target: &'a [TargetComment],
) -> Result<Option<&'a TargetComment>, SyncError> {
    for jira in target {
        if extract_id(&jira.body)? == Some(gh.id) {
            return Ok(Some(jira));
        }
    }
    Ok(None)
}

/// Whether the mirrored body differs from GitHub's current body.
///
/// A mirror cut at `MAX_BODY_LENGTH` is current as long as GitHub's body
/// still starts with the part that was kept.
pub fn needs_update(gh: &SourceComment, jira: &TargetComment) -> Result<bool, SyncError> {
    let parsed = extract_fields(&jira.body)?.ok_or_else(|| SyncError::UnparseableComment {
        comment_id: jira.id.clone(),
    })?;
    if parsed.body == gh.body {
        return Ok(false);
    }
    let truncated = jira.body.chars().count() >= MAX_BODY_LENGTH;
    Ok(!(truncated && gh.body.starts_with(&parsed.body)))
}
