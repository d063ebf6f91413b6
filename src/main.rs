//! rolecheck - Discord role activity auditor
//!
//! Finds the members of a role, scans selected channels for their messages
//! within a lookback window, and prints who was active and who was not.
//!
//! Exit codes:
//!   0 - Report printed
//!   1 - Setup failure (guild, role, channel or access), config or runtime error

mod audit;
mod cli;
mod config;
mod discord;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use discord::DiscordClient;
use error::AuditError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("rolecheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.clone_redacted());

    match run_check(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Audit failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default rolecheck.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Fill in the guild id, role and channels; keep the token in DISCORD_TOKEN.");
    Ok(())
}

/// Initialize logging based on verbosity settings. Logs go to stderr so
/// stdout carries only the report.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the audit end to end. Returns the process exit code.
async fn run_check(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    println!("--- User activity check ---");

    let client = DiscordClient::connect(&config.discord.token)
        .await
        .context("Failed to connect to Discord")?;
    println!("\nConnected as {}.", client.bot_user());

    let settings = config.audit_settings(!args.quiet);
    match audit::run_audit(&client, &settings, Utc::now()).await {
        Ok(outcome) => {
            println!("Server: {}", outcome.guild.name);
            println!(
                "Found {} members with the role '{}'.",
                outcome.active.len() + outcome.inactive.len(),
                outcome.role.name
            );
            print!("{}", report::generate_text_report(&outcome));
            println!(
                "\nScanned {} messages in {} channels of {}.",
                outcome.messages_scanned,
                outcome.channels_scanned.len(),
                outcome.guild.name
            );
            Ok(0)
        }
        Err(AuditError::Setup(failure)) => {
            warn!("Setup failed: {}", failure);
            println!("{}", failure);
            Ok(1)
        }
        Err(e) => Err(e).context("Failed while collecting messages"),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
