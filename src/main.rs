mod cli;
mod config;
mod logging;
mod model;
mod providers;
mod state;
mod sync;
mod util;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, warn};

use cli::Cli;
use config::Settings;
use providers::github::GitHubClient;
use providers::jira::{JiraClient, JiraOptions};
use state::{FileStore, SyncState};
use sync::{PassReport, SyncOptions, Syncer};
use util::clock::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let file = config::load_config(&config_path)?;
    let settings = Settings::resolve(file, &cli).context("Invalid configuration")?;

    if !settings.confirm {
        warn!("dry run: Jira will not be modified; pass --confirm to write changes");
    }

    let github = GitHubClient::new(settings.github_token.clone(), settings.timeout)?;
    let jira = JiraClient::connect(JiraOptions {
        base_url: settings.jira_uri.clone(),
        user: settings.jira_user.clone(),
        api_token: settings.jira_token.clone(),
        project_key: settings.jira_project.clone(),
        timeout: settings.timeout,
        dry_run: !settings.confirm,
    })
    .await?;
    let fields = jira.field_ids().clone();

    let syncer = Syncer::new(
        Box::new(github),
        Box::new(jira),
        fields,
        Box::new(SystemClock),
        SyncOptions {
            repo: settings.repo.clone(),
            issue_type: settings.issue_type.clone(),
        },
    );
    let mut state = SyncState::load(Box::new(FileStore::new(&settings.state_file)))?;

    loop {
        let started = syncer.now();
        let since = state.since(settings.since);
        info!(repo = %settings.repo, since = ?since, "starting sync pass");

        let outcome = syncer.run_pass(since).await;
        finish_pass(
            outcome,
            &mut state,
            started,
            settings.confirm,
            settings.period.is_zero(),
        )?;

        if settings.period.is_zero() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(settings.period) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; exiting");
                break;
            }
        }
    }

    Ok(())
}

/// Record the outcome of one pass. Only a one-shot run returns errors; the
/// daemon logs them and waits for the next period.
fn finish_pass(
    outcome: Result<PassReport>,
    state: &mut SyncState,
    started: DateTime<Utc>,
    confirm: bool,
    one_shot: bool,
) -> Result<()> {
    let result = match outcome {
        // Failed issues keep the old cutoff so the next pass retries them.
        Ok(report) if !report.failed_issues.is_empty() => {
            if confirm {
                warn!(
                    issues = ?report.failed_issues,
                    "sync cutoff not advanced until these issues sync"
                );
            }
            Ok(())
        }
        Ok(_) if confirm => state
            .advance(started)
            .context("Failed to save sync state"),
        Ok(_) => Ok(()),
        Err(err) => Err(err),
    };

    match result {
        Err(err) if !one_shot => {
            error!(error = %format!("{err:#}"), "sync pass failed");
            Ok(())
        }
        other => other,
    }
}
