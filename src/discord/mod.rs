//! Chat platform access.
//!
//! The audit talks to the platform only through the [`Platform`] trait, so the
//! runner can be driven by the serenity-backed client or by an in-memory guild
//! in tests.

pub mod client;
pub mod history;

pub use client::DiscordClient;
pub use history::{history_since, probe_history};

use crate::error::PlatformResult;
use crate::models::{Channel, ChannelId, Guild, GuildId, Member, Message, Role};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Read-only view of a chat platform, as consumed by the audit.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Look up a guild by id. `None` if it does not exist or is not visible.
    async fn resolve_guild(&self, id: GuildId) -> PlatformResult<Option<Guild>>;

    /// All roles defined in the guild.
    async fn roles(&self, guild: GuildId) -> PlatformResult<Vec<Role>>;

    /// Every member of the guild.
    async fn members(&self, guild: GuildId) -> PlatformResult<Vec<Member>>;

    /// Every channel of the guild, of any kind.
    async fn channels(&self, guild: GuildId) -> PlatformResult<Vec<Channel>>;

    /// The newest `limit` messages of a channel.
    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> PlatformResult<Vec<Message>>;

    /// The channel's whole history, newest first, fetched page by page as
    /// the stream is polled.
    fn history(&self, channel: ChannelId) -> BoxStream<'_, PlatformResult<Message>>;
}
