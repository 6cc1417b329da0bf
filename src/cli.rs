use std::path::PathBuf;

use clap::Parser;

/// Command-line flags. Each one overrides the matching config file key.
#[derive(Debug, Default, Parser)]
#[command(
    name = "issue-sync",
    version,
    about = "Mirror GitHub issues and their comments into a Jira project"
)]
pub struct Cli {
    /// Config file (default: ~/.issue-sync/config.toml)
    #[arg(long, env = "ISSUE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where the last successful sync time is kept (default: ~/.issue-sync/state.json)
    #[arg(long, env = "ISSUE_SYNC_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, env = "ISSUE_SYNC_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository to mirror, as owner/repo
    #[arg(long, env = "ISSUE_SYNC_REPO")]
    pub repo: Option<String>,

    /// Base URL of the Jira instance
    #[arg(long, env = "ISSUE_SYNC_JIRA_URI")]
    pub jira_uri: Option<String>,

    /// Key of the Jira project receiving the mirrors
    #[arg(long, env = "ISSUE_SYNC_JIRA_PROJECT")]
    pub jira_project: Option<String>,

    #[arg(long, env = "ISSUE_SYNC_JIRA_USER")]
    pub jira_user: Option<String>,

    #[arg(long, env = "ISSUE_SYNC_JIRA_TOKEN", hide_env_values = true)]
    pub jira_token: Option<String>,

    /// Only sync issues updated after this time (RFC 3339)
    #[arg(long, env = "ISSUE_SYNC_SINCE")]
    pub since: Option<String>,

    /// Per-request retry budget in seconds
    #[arg(long, env = "ISSUE_SYNC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Seconds between passes; 0 runs a single pass
    #[arg(long, env = "ISSUE_SYNC_PERIOD")]
    pub period: Option<u64>,

    /// Write to Jira. Without this flag changes are only logged.
    #[arg(long, env = "ISSUE_SYNC_CONFIRM")]
    pub confirm: bool,

    #[arg(
        long,
        env = "ISSUE_SYNC_LOG_LEVEL",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,
}
