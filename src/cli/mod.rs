//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// Foreman - background task processing engine
#[derive(Debug, Parser)]
#[command(name = "foreman", version, about)]
pub struct Cli {
    /// Path to a configuration file (default: foreman.yaml + FOREMAN_* env)
    #[arg(short, long, env = "FOREMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured worker count
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from(["foreman", "--workers", "4", "--config", "custom.yaml"]);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.config.unwrap(), PathBuf::from("custom.yaml"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["foreman"]);
        assert!(cli.workers.is_none());
        assert!(cli.config.is_none());
    }
}
