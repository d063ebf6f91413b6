//! Data models for the role activity audit.
//!
//! This module contains the platform entities (guilds, roles, members,
//! channels, messages) as seen by the auditor, plus the per-member
//! activity record that the aggregator mutates.

use chrono::{DateTime, Utc};

pub use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};

/// The server being audited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
}

/// A named role within a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// Kind of a guild channel, as far as the auditor cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Regular text channel
    Text,
    /// Announcement channel
    Announcement,
    /// Voice, category, forum, thread and anything newer
    Other,
}

impl ChannelKind {
    /// Whether the channel has a readable message history.
    pub fn is_text(&self) -> bool {
        matches!(self, ChannelKind::Text | ChannelKind::Announcement)
    }
}

/// A guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

/// A guild member. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    /// Unique account name.
    pub username: String,
    /// Name shown in the guild (nickname, global name or username).
    pub display_name: String,
    pub roles: Vec<RoleId>,
}

impl Member {
    /// Whether the member holds the given role.
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// A single channel message, reduced to what the audit needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

/// Activity accumulated for one member of interest.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub member: Member,
    pub message_count: u64,
    pub latest_message_time: Option<DateTime<Utc>>,
}

impl ActivityRecord {
    /// Creates an empty record for a member.
    pub fn new(member: Member) -> Self {
        Self {
            member,
            message_count: 0,
            latest_message_time: None,
        }
    }

    /// Counts one qualifying message and keeps the latest timestamp.
    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        self.message_count += 1;
        self.latest_message_time = Some(match self.latest_message_time {
            Some(current) if current >= timestamp => current,
            _ => timestamp,
        });
    }
}

/// An active member in report order, with the age of their latest message.
#[derive(Debug, Clone)]
pub struct RankedActive {
    pub record: ActivityRecord,
    /// Whole days between the latest message and the report time.
    pub age_days: i64,
}

/// Everything the report needs from a completed audit.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub guild: Guild,
    pub role: Role,
    pub lookback_days: u32,
    pub channels_scanned: Vec<String>,
    pub messages_scanned: u64,
    pub active: Vec<RankedActive>,
    pub inactive: Vec<Member>,
}
