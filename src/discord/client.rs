//! Discord access through serenity's HTTP client.
//!
//! Authentication, rate limiting and history paging are serenity's. This
//! module only converts its models into the audit's own and classifies its
//! errors.

use crate::discord::Platform;
use crate::error::{PlatformError, PlatformResult};
use crate::models::{Channel, ChannelId, ChannelKind, Guild, GuildId, Member, Message, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serenity::builder::GetMessages;
use serenity::http::Http;
use serenity::model::channel::{ChannelType, GuildChannel, Message as DiscordMessage};
use serenity::model::guild::{Member as DiscordMember, PartialGuild, Role as DiscordRole};
use serenity::model::Timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// An authenticated session against the Discord API.
pub struct DiscordClient {
    http: Arc<Http>,
    bot_user: String,
}

impl DiscordClient {
    /// Build the HTTP client and verify the token by fetching the bot user.
    pub async fn connect(token: &str) -> PlatformResult<Self> {
        let http = Arc::new(Http::new(token.trim()));

        let me = http
            .get_current_user()
            .await
            .map_err(|e| PlatformError::from_serenity(e, "current user"))?;
        info!("Authenticated as {} ({})", me.name, me.id);

        Ok(Self {
            http,
            bot_user: me.name.clone(),
        })
    }

    /// Username of the authenticated bot.
    pub fn bot_user(&self) -> &str {
        &self.bot_user
    }
}

/// A lookup the bot may not see resolves to `None`.
fn visible<T>(result: PlatformResult<T>) -> PlatformResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_access_denied() => Ok(None),
        Err(e) => Err(e),
    }
}

fn to_utc(timestamp: &Timestamp) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&timestamp.to_string())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_default()
        })
}

impl From<PartialGuild> for Guild {
    fn from(guild: PartialGuild) -> Self {
        Guild {
            id: guild.id,
            name: guild.name,
        }
    }
}

impl From<DiscordRole> for Role {
    fn from(role: DiscordRole) -> Self {
        Role {
            id: role.id,
            name: role.name,
        }
    }
}

impl From<ChannelType> for ChannelKind {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Text => ChannelKind::Text,
            ChannelType::News => ChannelKind::Announcement,
            _ => ChannelKind::Other,
        }
    }
}

impl From<GuildChannel> for Channel {
    fn from(channel: GuildChannel) -> Self {
        Channel {
            id: channel.id,
            kind: channel.kind.into(),
            name: channel.name,
        }
    }
}

impl From<DiscordMember> for Member {
    fn from(member: DiscordMember) -> Self {
        // Nickname, then global name, then username.
        let display_name = member.display_name().to_string();
        Member {
            id: member.user.id,
            username: member.user.name,
            display_name,
            roles: member.roles,
        }
    }
}

impl From<DiscordMessage> for Message {
    fn from(message: DiscordMessage) -> Self {
        Message {
            author: message.author.id,
            created_at: to_utc(&message.timestamp),
        }
    }
}

#[async_trait]
impl Platform for DiscordClient {
    async fn resolve_guild(&self, id: GuildId) -> PlatformResult<Option<Guild>> {
        let guild = self
            .http
            .get_guild(id)
            .await
            .map(Guild::from)
            .map_err(|e| PlatformError::from_serenity(e, &format!("guild {}", id)));
        visible(guild)
    }

    async fn roles(&self, guild: GuildId) -> PlatformResult<Vec<Role>> {
        let roles = self
            .http
            .get_guild_roles(guild)
            .await
            .map_err(|e| PlatformError::from_serenity(e, &format!("roles of guild {}", guild)))?;
        Ok(roles.into_iter().map(Role::from).collect())
    }

    async fn members(&self, guild: GuildId) -> PlatformResult<Vec<Member>> {
        let members: Vec<Member> = guild
            .members_iter(Arc::clone(&self.http))
            .map_ok(Member::from)
            .map_err(|e| PlatformError::from_serenity(e, &format!("members of guild {}", guild)))
            .try_collect()
            .await?;

        debug!("Fetched {} members of guild {}", members.len(), guild);
        Ok(members)
    }

    async fn channels(&self, guild: GuildId) -> PlatformResult<Vec<Channel>> {
        let channels = self
            .http
            .get_channels(guild)
            .await
            .map_err(|e| PlatformError::from_serenity(e, &format!("channels of guild {}", guild)))?;
        Ok(channels.into_iter().map(Channel::from).collect())
    }

    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> PlatformResult<Vec<Message>> {
        let messages = channel
            .messages(self.http.as_ref(), GetMessages::new().limit(limit))
            .await
            .map_err(|e| PlatformError::from_serenity(e, &format!("channel {}", channel)))?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    fn history(&self, channel: ChannelId) -> BoxStream<'_, PlatformResult<Message>> {
        channel
            .messages_iter(Arc::clone(&self.http))
            .map_ok(Message::from)
            .map_err(move |e| PlatformError::from_serenity(e, &format!("channel {}", channel)))
            .boxed()
    }
}
