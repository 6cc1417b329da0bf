//! The header prepended to every Jira comment mirrored from GitHub.
//!
//! Jira comments carry no metadata of their own, so the GitHub comment ID
//! lives inside the body:
//!
//! ```text
//! Comment [(ID 484163403)|<comment url>] from GitHub user [bob|<profile url>] (Bob) at 12:00 PM, January 1 2020:
//!
//! <original body>
//! ```
//!
//! Comments created by earlier releases use the same grammar, so it must
//! not change.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::SyncError;
use crate::model::source::{SourceComment, SourceUser};
use crate::util::text::truncate_chars;

/// Jira rejects comment bodies longer than this many characters.
pub const MAX_BODY_LENGTH: usize = 32767;

/// Format of the posting time inside the header.
pub const COMMENT_DATE_FORMAT: &str = "%H:%M %p, %B %-d %Y";

static ID_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\AComment \[\(ID (\d+)\)\|").expect("comment id pattern is valid")
});

static FULL_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)\AComment \[\(ID (\d+)\)\|[^\]]*\] from GitHub user \[([^|\]]+)\|[^\]]*\](?: \((.*?)\))? at (.*?):\n\n(.*)\z",
    )
    .expect("comment header pattern is valid")
});

/// A Jira comment body split back into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedComment {
    pub source_id: i64,
    pub login: String,
    pub display_name: Option<String>,
    pub timestamp: String,
    pub body: String,
}

fn parse_id(digits: &str) -> Result<i64, SyncError> {
    digits.parse().map_err(|_| SyncError::InvalidCommentId {
        value: digits.to_string(),
    })
}

/// Whether `body` starts with a generated header.
pub fn has_header(body: &str) -> bool {
    ID_PREFIX.is_match(body)
}

/// GitHub comment ID from the start of a generated comment.
///
/// `Ok(None)` when the body does not start with a header. An ID that does
/// not fit in an `i64` is an error: the header has been tampered with.
pub fn extract_id(body: &str) -> Result<Option<i64>, SyncError> {
    match ID_PREFIX.captures(body) {
        Some(caps) => parse_id(&caps[1]).map(Some),
        None => Ok(None),
    }
}

/// Full decomposition of a generated comment. `None` when the body as a
/// whole does not match the header grammar.
pub fn extract_fields(body: &str) -> Result<Option<ParsedComment>, SyncError> {
    let Some(caps) = FULL_HEADER.captures(body) else {
        return Ok(None);
    };
    Ok(Some(ParsedComment {
        source_id: parse_id(&caps[1])?,
        login: caps[2].to_string(),
        display_name: caps.get(3).map(|m| m.as_str().to_string()),
        timestamp: caps[4].to_string(),
        body: caps[5].to_string(),
    }))
}

/// Header and body for a Jira comment mirroring `comment`, cut to
/// `MAX_BODY_LENGTH` from the tail.
pub fn format_comment(comment: &SourceComment, author: &SourceUser) -> String {
    let mut body = format!(
        "Comment [(ID {})|{}] from GitHub user [{}|{}]",
        comment.id, comment.html_url, author.login, author.html_url
    );
    if let Some(name) = author.display_name() {
        body.push_str(&format!(" ({name})"));
    }
    body.push_str(&format!(
        " at {}:\n\n{}",
        format_timestamp(&comment.created_at),
        comment.body
    ));
    truncate_chars(&mut body, MAX_BODY_LENGTH);
    body
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(COMMENT_DATE_FORMAT).to_string()
}
