//! Error types for the audit.
//!
//! Setup failures are expected outcomes of a misconfigured run and carry the
//! message shown to the operator. Platform failures come from serenity, with
//! the HTTP statuses the audit reacts to pulled out into their own variants.

use crate::models::GuildId;

/// A failure while resolving what to audit. Always ends the run before any
/// report is printed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Guild {0} not found, or the bot is not a member of it.")]
    GuildNotFound(GuildId),

    #[error("Role '{0}' not found on server, or roles are inaccessible to the bot.")]
    RoleNotFound(String),

    #[error("No members with the role '{0}', or members are inaccessible to the bot.")]
    NoMembers(String),

    #[error("Channel '{0}' not found on server, or channels are inaccessible to the bot.")]
    ChannelNotFound(String),

    #[error("Failed to fetch messages for '{0}' - bot is probably missing permissions.")]
    ChannelAccessDenied(String),
}

/// A failure reported by the chat platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("authentication failed: the bot token was rejected")]
    Unauthorized,

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Discord API error on {resource}: {source}")]
    Api {
        resource: String,
        #[source]
        source: serenity::Error,
    },
}

impl PlatformError {
    /// The error for an HTTP status the audit treats specially, if any.
    pub fn for_status(status: u16, resource: &str) -> Option<Self> {
        match status {
            401 => Some(PlatformError::Unauthorized),
            403 => Some(PlatformError::Forbidden(resource.to_string())),
            404 => Some(PlatformError::NotFound(resource.to_string())),
            _ => None,
        }
    }

    /// Classify a serenity error raised while accessing `resource`.
    pub fn from_serenity(err: serenity::Error, resource: &str) -> Self {
        let status = match &err {
            serenity::Error::Http(http) => http.status_code().map(|s| s.as_u16()),
            _ => None,
        };

        status
            .and_then(|s| Self::for_status(s, resource))
            .unwrap_or_else(|| PlatformError::Api {
                resource: resource.to_string(),
                source: err,
            })
    }

    /// Whether the error means the bot may not see the resource.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_) | PlatformError::NotFound(_))
    }
}

/// Anything that stops an audit run.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
