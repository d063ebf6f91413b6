//! Channel history traversal.

use crate::discord::Platform;
use crate::error::PlatformResult;
use crate::models::{Channel, Message};
use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{Stream, TryStreamExt};
use tracing::debug;

/// Fetch the newest `limit` messages of a channel.
///
/// Used to check read access before the full scan.
pub async fn probe_history<P: Platform + ?Sized>(
    platform: &P,
    channel: &Channel,
    limit: u8,
) -> PlatformResult<Vec<Message>> {
    platform.recent_messages(channel.id, limit).await
}

/// Lazily stream every message posted in `channel` at or after `cutoff`.
///
/// The history is walked newest first and the stream ends at the first
/// older message, so no page beyond the cutoff is requested.
pub fn history_since<'a, P: Platform + ?Sized>(
    platform: &'a P,
    channel: &'a Channel,
    cutoff: DateTime<Utc>,
) -> impl Stream<Item = PlatformResult<Message>> + Send + 'a {
    debug!("Walking #{} back to {}", channel.name, cutoff);

    platform
        .history(channel.id)
        .try_take_while(move |message| future::ready(Ok(message.created_at >= cutoff)))
}
