//! Per-channel unread counts derived from cumulative feed totals.

use std::collections::HashMap;

use chattier_shared::types::ChannelId;

#[derive(Debug, Default, Clone, Copy)]
struct Counter {
    last_seen_total: usize,
    last_known_total: usize,
    count: usize,
}

/// Derives unread counts from the message-added stream of every known
/// channel. `last_known_total` tracks the feed's cumulative count on
/// every event; `count` is the excess over `last_seen_total` and is only
/// ever nonzero while the channel is inactive. Counts are recomputed
/// synchronously in event dispatch.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    counters: HashMap<ChannelId, Counter>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message-added event for `channel` whose feed now holds
    /// `live_total` messages. While the channel is active the user is
    /// watching the log, so arrivals are read on sight and the baseline
    /// advances with the total.
    pub fn record(&mut self, channel: &ChannelId, live_total: usize, channel_is_active: bool) {
        let counter = self
            .counters
            .entry(channel.clone())
            .or_insert_with(|| Counter {
                last_seen_total: live_total,
                last_known_total: live_total,
                count: 0,
            });
        counter.last_known_total = live_total;
        if channel_is_active {
            counter.last_seen_total = live_total;
            counter.count = 0;
        } else {
            counter.count = live_total.saturating_sub(counter.last_seen_total);
        }
    }

    /// Establish a baseline for a channel whose feed is about to be
    /// subscribed: `total` messages already exist and none of them is
    /// unread. Known channels keep their counter.
    pub fn seed(&mut self, channel: &ChannelId, total: usize) {
        self.counters.entry(channel.clone()).or_insert(Counter {
            last_seen_total: total,
            last_known_total: total,
            count: 0,
        });
    }

    /// Mark `channel` as read: the live total becomes the seen total and
    /// the unread count drops to zero.
    pub fn mark_read(&mut self, channel: &ChannelId) {
        let counter = self.counters.entry(channel.clone()).or_default();
        counter.last_seen_total = counter.last_known_total;
        counter.count = 0;
    }

    /// Unread count exposed to the UI; zero for unseen channels.
    pub fn unread_count(&self, channel: &ChannelId) -> usize {
        self.counters.get(channel).map(|c| c.count).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }
}
