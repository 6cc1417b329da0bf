use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub issue as read at the start of a pass. Never mutated by the sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceIssue {
    pub id: i64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: String,
    pub reporter: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Comment count reported by the listing; zero means the comment
    /// listing can be skipped entirely.
    #[serde(default)]
    pub comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComment {
    pub id: i64,
    #[serde(default)]
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUser {
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

impl SourceUser {
    /// Display name, or `None` when GitHub has none or it is blank.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// `owner/repo` pair identifying the mirrored repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    /// Parse `owner/repo`. Exactly one slash, both halves non-empty.
    pub fn parse(path: &str) -> Option<Self> {
        let (owner, name) = path.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
