//! Command-line interface argument parsing.
//!
//! Every audit setting can come from `rolecheck.toml`; flags given here
//! override the file.

use clap::Parser;
use std::path::PathBuf;

/// rolecheck - find inactive holders of a Discord role
///
/// Lists which members of a role posted in the given channels within the
/// lookback window and which did not. Run it with a bot that is not
/// currently in use elsewhere.
///
/// Examples:
///   rolecheck --guild-id 197038439483310086 --role Helpers --channels general,help
///   rolecheck --config audit.toml --days 30
///   rolecheck --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for rolecheck.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Server (guild) id to audit
    #[arg(short, long, value_name = "ID", env = "ROLECHECK_GUILD_ID")]
    pub guild_id: Option<u64>,

    /// Role whose members are audited (case sensitive)
    #[arg(short, long, value_name = "NAME")]
    pub role: Option<String>,

    /// Number of days to look back for activity
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Channels to scan (comma-separated)
    ///
    /// Example: --channels general,shitposts
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub channels: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (no progress spinner, errors only in the log)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default rolecheck.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.days == Some(0) {
            return Err("Days must be at least 1".to_string());
        }

        Ok(())
    }

    /// A copy that is safe to log: the token is masked.
    pub fn clone_redacted(&self) -> Self {
        let mut args = self.clone();
        if args.token.is_some() {
            args.token = Some("***".to_string());
        }
        args
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
