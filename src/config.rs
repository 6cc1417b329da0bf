use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::model::source::Repo;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PERIOD_SECS: u64 = 3600;
const DEFAULT_ISSUE_TYPE: &str = "Task";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JiraConfig {
    pub uri: Option<String>,
    pub project: Option<String>,
    pub user: Option<String>,
    pub api_token: Option<String>,
    pub issue_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SyncConfig {
    pub since: Option<String>,
    pub timeout_secs: Option<u64>,
    pub period_secs: Option<u64>,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GitHub token required")]
    MissingGitHubToken,
    #[error("GitHub repository required")]
    MissingRepo,
    #[error("GitHub repository must be of form user/repo, got '{0}'")]
    InvalidRepo(String),
    #[error("Jira URI required")]
    MissingJiraUri,
    #[error("Jira URI must be a valid http(s) URL, got '{0}'")]
    InvalidJiraUri(String),
    #[error("Jira project required")]
    MissingJiraProject,
    #[error("Jira username required")]
    MissingJiraUser,
    #[error("Jira API token required")]
    MissingJiraToken,
    #[error("since date must be in ISO-8601 format, got '{0}'")]
    InvalidSince(String),
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".issue-sync")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn default_state_path() -> PathBuf {
    data_dir().join("state.json")
}

/// Read the config file. A missing file is an empty config.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Fully validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_token: String,
    pub repo: Repo,
    pub jira_uri: String,
    pub jira_project: String,
    pub jira_user: String,
    pub jira_token: String,
    pub issue_type: String,
    pub since: Option<DateTime<Utc>>,
    pub timeout: Duration,
    /// Zero means run once and exit.
    pub period: Duration,
    pub confirm: bool,
    pub state_file: PathBuf,
}

impl Settings {
    /// Merge the config file with command-line flags (flags win) and check
    /// every value.
    pub fn resolve(file: AppConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let github_token = required(cli.github_token.clone(), file.github.token)
            .ok_or(ConfigError::MissingGitHubToken)?;

        let repo_path =
            required(cli.repo.clone(), file.github.repo).ok_or(ConfigError::MissingRepo)?;
        let repo = Repo::parse(&repo_path).ok_or(ConfigError::InvalidRepo(repo_path))?;

        let jira_uri =
            required(cli.jira_uri.clone(), file.jira.uri).ok_or(ConfigError::MissingJiraUri)?;
        validate_uri(&jira_uri)?;

        let jira_project = required(cli.jira_project.clone(), file.jira.project)
            .ok_or(ConfigError::MissingJiraProject)?;
        let jira_user =
            required(cli.jira_user.clone(), file.jira.user).ok_or(ConfigError::MissingJiraUser)?;
        let jira_token = required(cli.jira_token.clone(), file.jira.api_token)
            .ok_or(ConfigError::MissingJiraToken)?;

        let since = match required(cli.since.clone(), file.sync.since) {
            Some(raw) => Some(parse_since(&raw)?),
            None => None,
        };

        Ok(Self {
            github_token,
            repo,
            jira_uri,
            jira_project,
            jira_user,
            jira_token,
            issue_type: file
                .jira
                .issue_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
            since,
            timeout: Duration::from_secs(
                cli.timeout
                    .or(file.sync.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            period: Duration::from_secs(
                cli.period
                    .or(file.sync.period_secs)
                    .unwrap_or(DEFAULT_PERIOD_SECS),
            ),
            confirm: cli.confirm || file.sync.confirm,
            state_file: cli.state_file.clone().unwrap_or_else(default_state_path),
        })
    }
}

/// First non-blank value, trimmed.
fn required(flag: Option<String>, file: Option<String>) -> Option<String> {
    flag.into_iter()
        .chain(file)
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn validate_uri(raw: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidJiraUri(raw.to_string());
    let url = reqwest::Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}

/// RFC 3339, or the `2006-01-02T15:04:05-0700` form with a compact offset.
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ConfigError::InvalidSince(raw.to_string()))
}
