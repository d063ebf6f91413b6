//! Configuration file handling.
//!
//! This module handles loading `rolecheck.toml`, layering CLI arguments on
//! top of it, and validating the result before any request is made.

use crate::audit::AuditSettings;
use crate::models::GuildId;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rolecheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    #[serde(default)]
    pub discord: DiscordSection,

    /// What to audit.
    #[serde(default)]
    pub audit: AuditSection,
}

/// Discord connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordSection {
    /// Bot token. Prefer the DISCORD_TOKEN environment variable.
    #[serde(default)]
    pub token: String,

    /// Server (guild) to audit.
    #[serde(default)]
    pub guild_id: u64,
}

/// Audit scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// Role name, case sensitive.
    #[serde(default)]
    pub role: String,

    /// Number of days to look back for activity.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Channels to scan.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Messages fetched per channel to verify access.
    #[serde(default = "default_probe_limit")]
    pub probe_limit: u8,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            role: String::new(),
            lookback_days: default_lookback_days(),
            channels: Vec::new(),
            probe_limit: default_probe_limit(),
        }
    }
}

fn default_lookback_days() -> u32 {
    60
}

fn default_probe_limit() -> u8 {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the CLI (or its environment variables) actually provides
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref token) = args.token {
            self.discord.token = token.clone();
        }
        if let Some(guild_id) = args.guild_id {
            self.discord.guild_id = guild_id;
        }

        if let Some(ref role) = args.role {
            self.audit.role = role.clone();
        }
        if let Some(days) = args.days {
            self.audit.lookback_days = days;
        }
        if let Some(ref channels) = args.channels {
            self.audit.channels = channels.clone();
        }
    }

    /// Check that the merged configuration describes a runnable audit.
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            bail!("No bot token configured. Set DISCORD_TOKEN or [discord].token.");
        }
        if self.discord.guild_id == 0 {
            bail!("No server configured. Set --guild-id or [discord].guild_id.");
        }
        if self.audit.role.is_empty() {
            bail!("No role configured. Set --role or [audit].role.");
        }
        if self.audit.channels.is_empty() {
            bail!("No channels configured. Set --channels or [audit].channels.");
        }
        if self.audit.channels.iter().any(|c| c.trim().is_empty()) {
            bail!("Channel names must not be empty");
        }
        if self.audit.lookback_days == 0 {
            bail!("Lookback window must be at least 1 day");
        }
        if self.audit.probe_limit == 0 || self.audit.probe_limit > 100 {
            bail!("Probe limit must be between 1 and 100");
        }

        Ok(())
    }

    /// Audit scope for the runner. Call after [`Config::validate`].
    pub fn audit_settings(&self, show_progress: bool) -> AuditSettings {
        AuditSettings {
            guild_id: GuildId::new(self.discord.guild_id),
            role_name: self.audit.role.clone(),
            lookback_days: self.audit.lookback_days,
            channel_names: self
                .audit
                .channels
                .iter()
                .map(|c| c.trim().trim_start_matches('#').to_string())
                .collect(),
            probe_limit: self.audit.probe_limit,
            show_progress,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let mut config = Config::default();
        config.audit.role = "Role".to_string();
        config.audit.channels = vec!["general".to_string()];
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
