//! Activity aggregation and ranking.
//!
//! This module accumulates per-member message activity and turns it into
//! the ordered active/inactive lists the report prints.

use crate::models::{ActivityRecord, Member, Message, RankedActive, UserId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Tracks activity for a fixed set of members while messages stream past.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    members: Vec<Member>,
    records: HashMap<UserId, ActivityRecord>,
    posted: HashSet<UserId>,
    observed: u64,
}

impl ActivityTracker {
    /// Start tracking the given members, each with an empty record.
    pub fn new(members: Vec<Member>) -> Self {
        let records = members
            .iter()
            .map(|m| (m.id, ActivityRecord::new(m.clone())))
            .collect();

        Self {
            members,
            records,
            posted: HashSet::new(),
            observed: 0,
        }
    }

    /// Feed one message. Returns true if its author is a tracked member.
    pub fn observe(&mut self, message: &Message) -> bool {
        self.observed += 1;

        match self.records.get_mut(&message.author) {
            Some(record) => {
                record.record(message.created_at);
                self.posted.insert(message.author);
                true
            }
            None => false,
        }
    }

    /// Total messages seen, tracked or not.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Split the tracked members into active records and inactive members.
    pub fn partition(&self) -> (Vec<ActivityRecord>, Vec<Member>) {
        partition(&self.members, &self.records, &self.posted)
    }
}

/// Split `members` by whether they appear in `posted`.
///
/// Active entries are the members' records; inactive entries are the members
/// themselves. Every member lands in exactly one list, in input order.
pub fn partition(
    members: &[Member],
    records: &HashMap<UserId, ActivityRecord>,
    posted: &HashSet<UserId>,
) -> (Vec<ActivityRecord>, Vec<Member>) {
    let mut active = Vec::new();
    let mut inactive = Vec::new();

    for member in members {
        if posted.contains(&member.id) {
            let record = records
                .get(&member.id)
                .cloned()
                .unwrap_or_else(|| ActivityRecord::new(member.clone()));
            active.push(record);
        } else {
            inactive.push(member.clone());
        }
    }

    (active, inactive)
}

/// Order active members by message count (most first), then username
/// case-insensitively, and compute how many whole days ago each last posted.
pub fn rank_active(active: Vec<ActivityRecord>, now: DateTime<Utc>) -> Vec<RankedActive> {
    let mut ranked: Vec<RankedActive> = active
        .into_iter()
        .map(|record| {
            let age_days = record
                .latest_message_time
                .map(|latest| (now - latest).num_days())
                .unwrap_or_default();
            RankedActive { record, age_days }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.record
            .message_count
            .cmp(&a.record.message_count)
            .then_with(|| {
                a.record
                    .member
                    .username
                    .to_lowercase()
                    .cmp(&b.record.member.username.to_lowercase())
            })
    });

    ranked
}

/// Order inactive members by username, then display name, both
/// case-insensitively.
pub fn rank_inactive(mut inactive: Vec<Member>) -> Vec<Member> {
    inactive.sort_by_cached_key(|m| (m.username.to_lowercase(), m.display_name.to_lowercase()));
    inactive
}
