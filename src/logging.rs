use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(level)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(env_filter).with(fmt_layer),
    )?;
    Ok(())
}

fn default_filter(level: &str) -> String {
    format!("issue_sync={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_this_crate() {
        assert_eq!(default_filter("debug"), "issue_sync=debug");
        assert!(EnvFilter::try_new(default_filter("trace")).is_ok());
    }
}
