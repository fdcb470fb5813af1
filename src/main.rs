//! Main entry point for credvault.

use anyhow::Context;
use clap::Parser;
use credvault::cli::Cli;
use credvault::utils::error_exit;
use tracing_subscriber::EnvFilter;

/// Log filter when neither `RUST_LOG` nor the configuration sets one.
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error_exit(&format!("{e:#}"), 1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.load_config().context("failed to load configuration")?;
    init_tracing(config.log_level.as_deref());
    cli.execute(&config)?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level; logs go to stderr.
fn init_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or(DEFAULT_LOG_FILTER)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        // Test that CLI can be parsed without panicking
        let cli = Cli::try_parse_from(["credvault", "group", "tree"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["credvault", "-o", "json", "entry", "list"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["credvault", "entry", "show"]);
        assert!(cli.is_err());
    }
}
