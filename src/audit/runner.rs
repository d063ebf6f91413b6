//! The audit sequence.
//!
//! Resolves the guild, role, members and channels, checks read access, then
//! scans each channel's history since the cutoff, one channel and one page at
//! a time, and ranks the result.

use crate::audit::{rank_active, rank_inactive, ActivityTracker};
use crate::discord::{history_since, probe_history, Platform};
use crate::error::{AuditError, SetupError};
use crate::models::{AuditOutcome, Channel, Guild, GuildId, Member, Role};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01).
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// What to audit.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub guild_id: GuildId,
    /// Exact, case-sensitive role name.
    pub role_name: String,
    pub lookback_days: u32,
    /// Channel names to scan, in order.
    pub channel_names: Vec<String>,
    /// Messages fetched per channel to verify read access.
    pub probe_limit: u8,
    /// Show a spinner while collecting messages.
    pub show_progress: bool,
}

/// Run a complete audit against `platform` as of `now`.
pub async fn run_audit<P: Platform + ?Sized>(
    platform: &P,
    settings: &AuditSettings,
    now: DateTime<Utc>,
) -> Result<AuditOutcome, AuditError> {
    let guild = platform
        .resolve_guild(settings.guild_id)
        .await?
        .ok_or(SetupError::GuildNotFound(settings.guild_id))?;
    info!("Server: {}", guild.name);

    let role = resolve_role(platform, &guild, &settings.role_name).await?;
    let members = role_members(platform, &guild, &role).await?;
    info!(
        "Found {} members with the role '{}'",
        members.len(),
        role.name
    );

    let channels = resolve_channels(platform, &guild, &settings.channel_names).await?;
    verify_access(platform, &channels, settings.probe_limit).await?;
    info!("Verified access to channels. Collecting messages may take a while.");

    let cutoff = cutoff(now, settings.lookback_days);
    info!("Collecting messages posted since {}", cutoff);

    let mut tracker = ActivityTracker::new(members);
    for channel in &channels {
        collect_channel(platform, channel, cutoff, &mut tracker, settings.show_progress).await?;
    }

    let (active, inactive) = tracker.partition();
    info!(
        "{} active, {} inactive out of {} messages scanned",
        active.len(),
        inactive.len(),
        tracker.observed()
    );

    Ok(AuditOutcome {
        guild,
        role,
        lookback_days: settings.lookback_days,
        channels_scanned: channels.into_iter().map(|c| c.name).collect(),
        messages_scanned: tracker.observed(),
        active: rank_active(active, now),
        inactive: rank_inactive(inactive),
    })
}

/// Start of the lookback window. Windows reaching past the Discord epoch
/// start there, since no message can be older.
fn cutoff(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    let epoch = DateTime::from_timestamp_millis(DISCORD_EPOCH_MS).unwrap_or_default();
    now.checked_sub_signed(Duration::days(i64::from(lookback_days)))
        .map_or(epoch, |start| start.max(epoch))
}

async fn resolve_role<P: Platform + ?Sized>(
    platform: &P,
    guild: &Guild,
    name: &str,
) -> Result<Role, AuditError> {
    let roles = platform.roles(guild.id).await?;
    debug!("Guild {} has {} roles", guild.id, roles.len());

    roles
        .into_iter()
        .find(|r| r.name == name)
        .ok_or_else(|| AuditError::from(SetupError::RoleNotFound(name.to_string())))
}

async fn role_members<P: Platform + ?Sized>(
    platform: &P,
    guild: &Guild,
    role: &Role,
) -> Result<Vec<Member>, AuditError> {
    let members: Vec<Member> = platform
        .members(guild.id)
        .await?
        .into_iter()
        .filter(|m| m.has_role(role.id))
        .collect();

    if members.is_empty() {
        return Err(SetupError::NoMembers(role.name.clone()).into());
    }

    Ok(members)
}

async fn resolve_channels<P: Platform + ?Sized>(
    platform: &P,
    guild: &Guild,
    names: &[String],
) -> Result<Vec<Channel>, AuditError> {
    let available = platform.channels(guild.id).await?;

    names
        .iter()
        .map(|name| {
            available
                .iter()
                .find(|c| c.kind.is_text() && &c.name == name)
                .cloned()
                .ok_or_else(|| AuditError::from(SetupError::ChannelNotFound(name.clone())))
        })
        .collect()
}

/// A channel passes only if its newest `limit` messages can all be read.
/// Quiet channels and missing permissions fail alike.
async fn verify_access<P: Platform + ?Sized>(
    platform: &P,
    channels: &[Channel],
    limit: u8,
) -> Result<(), AuditError> {
    for channel in channels {
        let denied = || SetupError::ChannelAccessDenied(channel.name.clone());

        match probe_history(platform, channel, limit).await {
            Ok(sample) if sample.len() == limit as usize => {
                debug!("Access check of #{} returned {} messages", channel.name, sample.len());
            }
            Ok(_) => return Err(denied().into()),
            Err(e) if e.is_access_denied() => return Err(denied().into()),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

async fn collect_channel<P: Platform + ?Sized>(
    platform: &P,
    channel: &Channel,
    cutoff: DateTime<Utc>,
    tracker: &mut ActivityTracker,
    show_progress: bool,
) -> Result<(), AuditError> {
    info!("Collecting #{}", channel.name);

    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] #{prefix}: {pos} messages",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(channel.name.clone());
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut from_members = 0u64;
    let mut history = Box::pin(history_since(platform, channel, cutoff));
    while let Some(message) = history.try_next().await? {
        if tracker.observe(&message) {
            from_members += 1;
        }
        spinner.inc(1);
    }

    spinner.finish_and_clear();
    info!(
        "#{}: {} messages since cutoff, {} from role members",
        channel.name,
        spinner.position(),
        from_members
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlatformError, PlatformResult};
    use crate::models::{ChannelId, ChannelKind, Message, RoleId, UserId};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use futures::stream::{self, BoxStream, StreamExt};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const GUILD: u64 = 100;
    const ROLE: u64 = 200;
    const OTHER_ROLE: u64 = 201;

    /// An in-memory guild with per-channel histories.
    #[derive(Default)]
    struct FakeGuild {
        guild: Option<Guild>,
        roles: Vec<Role>,
        members: Vec<Member>,
        channels: Vec<Channel>,
        history: HashMap<ChannelId, Vec<Message>>,
        forbidden: Vec<ChannelId>,
        message_calls: Mutex<Vec<ChannelId>>,
    }

    #[async_trait]
    impl Platform for FakeGuild {
        async fn resolve_guild(&self, id: GuildId) -> PlatformResult<Option<Guild>> {
            Ok(self.guild.clone().filter(|g| g.id == id))
        }

        async fn roles(&self, _guild: GuildId) -> PlatformResult<Vec<Role>> {
            Ok(self.roles.clone())
        }

        async fn members(&self, _guild: GuildId) -> PlatformResult<Vec<Member>> {
            Ok(self.members.clone())
        }

        async fn channels(&self, _guild: GuildId) -> PlatformResult<Vec<Channel>> {
            Ok(self.channels.clone())
        }

        async fn recent_messages(
            &self,
            channel: ChannelId,
            limit: u8,
        ) -> PlatformResult<Vec<Message>> {
            self.message_calls.lock().unwrap().push(channel);
            if self.forbidden.contains(&channel) {
                return Err(PlatformError::Forbidden(format!("channel {}", channel)));
            }

            let mut page = self.newest_first(channel);
            page.truncate(limit as usize);
            Ok(page)
        }

        fn history(&self, channel: ChannelId) -> BoxStream<'_, PlatformResult<Message>> {
            self.message_calls.lock().unwrap().push(channel);
            stream::iter(self.newest_first(channel).into_iter().map(Ok)).boxed()
        }
    }

    impl FakeGuild {
        fn newest_first(&self, channel: ChannelId) -> Vec<Message> {
            let mut messages = self.history.get(&channel).cloned().unwrap_or_default();
            messages.sort_by_key(|m| std::cmp::Reverse(m.created_at));
            messages
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn member(id: u64, username: &str, role: u64) -> Member {
        Member {
            id: UserId::new(id),
            username: username.to_string(),
            display_name: username.to_uppercase(),
            roles: vec![RoleId::new(role)],
        }
    }

    fn text_channel(id: u64, name: &str) -> Channel {
        Channel {
            id: ChannelId::new(id),
            name: name.to_string(),
            kind: ChannelKind::Text,
        }
    }

    fn message(author: u64, days_ago: i64, seq: u64) -> Message {
        let created_at = now() - Duration::days(days_ago) + Duration::seconds(seq as i64);
        Message {
            author: UserId::new(author),
            created_at,
        }
    }

    fn settings(channels: &[&str]) -> AuditSettings {
        AuditSettings {
            guild_id: GuildId::new(GUILD),
            role_name: "Helpers".to_string(),
            lookback_days: 30,
            channel_names: channels.iter().map(|c| c.to_string()).collect(),
            probe_limit: 3,
            show_progress: false,
        }
    }

    /// alice, bob and carol hold the role; mallory does not.
    fn fake_guild() -> FakeGuild {
        let mut history = HashMap::new();
        history.insert(
            ChannelId::new(1),
            vec![
                message(1, 2, 1),
                message(4, 3, 2),
                message(3, 40, 3),
                message(1, 5, 4),
            ],
        );
        history.insert(
            ChannelId::new(2),
            vec![message(3, 9, 5), message(4, 1, 6), message(4, 60, 7)],
        );

        FakeGuild {
            guild: Some(Guild {
                id: GuildId::new(GUILD),
                name: "Test Server".to_string(),
            }),
            roles: vec![
                Role {
                    id: RoleId::new(ROLE),
                    name: "Helpers".to_string(),
                },
                Role {
                    id: RoleId::new(OTHER_ROLE),
                    name: "helpers".to_string(),
                },
            ],
            members: vec![
                member(1, "alice", ROLE),
                member(2, "bob", ROLE),
                member(3, "carol", ROLE),
                member(4, "mallory", OTHER_ROLE),
            ],
            channels: vec![
                text_channel(1, "general"),
                text_channel(2, "projects"),
                Channel {
                    id: ChannelId::new(3),
                    name: "voice".to_string(),
                    kind: ChannelKind::Other,
                },
            ],
            history,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_audit_ranks_active_and_inactive() {
        let platform = fake_guild();

        let outcome = run_audit(&platform, &settings(&["general", "projects"]), now())
            .await
            .unwrap();

        let active: Vec<(&str, u64, i64)> = outcome
            .active
            .iter()
            .map(|r| {
                (
                    r.record.member.username.as_str(),
                    r.record.message_count,
                    r.age_days,
                )
            })
            .collect();
        assert_eq!(active, vec![("alice", 2, 1), ("carol", 1, 8)]);

        let inactive: Vec<&str> = outcome.inactive.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(inactive, vec!["bob"]);

        assert_eq!(outcome.role.name, "Helpers");
        assert_eq!(outcome.channels_scanned, vec!["general", "projects"]);
        assert_eq!(outcome.messages_scanned, 5);
    }

    #[tokio::test]
    async fn test_missing_guild() {
        let mut platform = fake_guild();
        platform.guild = None;

        let err = run_audit(&platform, &settings(&["general"]), now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuditError::Setup(SetupError::GuildNotFound(id)) if id == GuildId::new(GUILD)
        ));
    }

    #[tokio::test]
    async fn test_role_lookup_is_case_sensitive() {
        let platform = fake_guild();
        let mut settings = settings(&["general"]);
        settings.role_name = "HELPERS".to_string();

        let err = run_audit(&platform, &settings, now()).await.unwrap_err();

        assert!(matches!(err, AuditError::Setup(SetupError::RoleNotFound(ref r)) if r == "HELPERS"));
    }

    #[tokio::test]
    async fn test_role_without_members() {
        let mut platform = fake_guild();
        platform.members.retain(|m| !m.has_role(RoleId::new(ROLE)));

        let err = run_audit(&platform, &settings(&["general"]), now())
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Setup(SetupError::NoMembers(_))));
    }

    #[tokio::test]
    async fn test_missing_channel_stops_before_any_history_request() {
        let platform = fake_guild();

        let err = run_audit(&platform, &settings(&["general", "nope"]), now())
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Setup(SetupError::ChannelNotFound(ref c)) if c == "nope"));
        assert!(platform.message_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_text_channel_is_not_matched() {
        let platform = fake_guild();

        let err = run_audit(&platform, &settings(&["voice"]), now())
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Setup(SetupError::ChannelNotFound(_))));
    }

    #[tokio::test]
    async fn test_short_history_denies_access() {
        let mut platform = fake_guild();
        platform.history.insert(ChannelId::new(2), vec![message(1, 1, 9)]);

        let err = run_audit(&platform, &settings(&["general", "projects"]), now())
            .await
            .unwrap_err();

        assert!(
            matches!(err, AuditError::Setup(SetupError::ChannelAccessDenied(ref c)) if c == "projects")
        );
        // Only the two access checks ran; no history scan started.
        assert_eq!(platform.message_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_forbidden_channel_denies_access() {
        let mut platform = fake_guild();
        platform.forbidden.push(ChannelId::new(1));

        let err = run_audit(&platform, &settings(&["general"]), now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuditError::Setup(SetupError::ChannelAccessDenied(_))
        ));
    }

    #[test]
    fn test_messages_before_cutoff_are_ignored() {
        let platform = fake_guild();
        let mut settings = settings(&["general"]);
        settings.lookback_days = 4;

        let outcome = tokio_test::block_on(run_audit(&platform, &settings, now())).unwrap();

        let alice = &outcome.active[0].record;
        assert_eq!(alice.member.username, "alice");
        assert_eq!(alice.message_count, 1);
        let inactive: Vec<&str> = outcome.inactive.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(inactive, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_lookback_past_discord_epoch_scans_everything() {
        let platform = fake_guild();
        let mut settings = settings(&["general", "projects"]);
        settings.lookback_days = 100_000_000;

        let outcome = run_audit(&platform, &settings, now()).await.unwrap();

        // Every message is inside the window, including mallory's 60-day-old one.
        assert_eq!(outcome.messages_scanned, 7);
        let carol = outcome
            .active
            .iter()
            .find(|r| r.record.member.username == "carol")
            .unwrap();
        assert_eq!(carol.record.message_count, 2);
    }

    #[test]
    fn test_cutoff_clamps_to_discord_epoch() {
        let epoch = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(cutoff(now(), 30), now() - Duration::days(30));
        assert_eq!(cutoff(now(), 100_000_000), epoch);
        assert_eq!(cutoff(now(), u32::MAX), epoch);
        assert_eq!(cutoff(now(), 365 * 20), epoch);
    }
}
