//! Command-line interface definitions for the story miner.
//!
//! Everything except the config path and a couple of overrides lives in the
//! YAML configuration file.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the story miner.
///
/// ```sh
/// # Poll forever with the built-in Hacker News defaults
/// story_miner
///
/// # Use a config file and run a single cycle
/// story_miner -c config/default.yaml --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "STORY_MINER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Override the ledger directory
    #[arg(long, env = "STORY_MINER_LEDGER_DIR")]
    pub ledger_dir: Option<PathBuf>,

    /// Override the upload endpoint
    #[arg(long, env = "STORY_MINER_UPLOAD_URL")]
    pub upload_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["story_miner"]);
        assert!(!cli.once);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "story_miner",
            "-c",
            "/etc/miner.yaml",
            "--once",
            "--ledger-dir",
            "/var/lib/miner",
            "--upload-url",
            "https://ingest.example.com/stories",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/etc/miner.yaml")));
        assert!(cli.once);
        assert_eq!(cli.ledger_dir, Some(PathBuf::from("/var/lib/miner")));
        assert_eq!(
            cli.upload_url.as_deref(),
            Some("https://ingest.example.com/stories")
        );
    }
}
