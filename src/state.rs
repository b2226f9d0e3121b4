use chrono::{DateTime, Utc};

use crate::helix::Stream;
use crate::types::{ExitSummary, WatchEventKind};

/// Tracks the watched channel's state across polls.
pub struct WatchState {
    pub started_at: DateTime<Utc>,
    pub online: bool,
    /// When the current online session was first observed.
    pub online_since: Option<DateTime<Utc>>,
    pub total_polls: u64,
    pub failed_polls: u64,
    pub went_online: u64,
    pub went_offline: u64,
    /// Online time of completed sessions.
    pub total_online_secs: i64,
    pub chat_joins: u64,
}

impl WatchState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            online: false,
            online_since: None,
            total_polls: 0,
            failed_polls: 0,
            went_online: 0,
            went_offline: 0,
            total_online_secs: 0,
            chat_joins: 0,
        }
    }

    /// Record one successful poll. Returns an event only when the channel
    /// changed state; an offline channel on the first poll is not a change.
    pub fn observe(
        &mut self,
        stream: Option<&Stream>,
        now: DateTime<Utc>,
    ) -> Option<WatchEventKind> {
        self.total_polls += 1;
        match (self.online, stream) {
            (false, Some(stream)) => {
                self.online = true;
                self.online_since = Some(now);
                self.went_online += 1;
                Some(WatchEventKind::StreamOnline {
                    title: stream.title.clone(),
                    game_name: stream.game_name.clone(),
                    viewer_count: stream.viewer_count,
                })
            }
            (true, None) => {
                self.online = false;
                let online_secs = self
                    .online_since
                    .take()
                    .map(|since| (now - since).num_seconds().max(0));
                self.total_online_secs += online_secs.unwrap_or(0);
                self.went_offline += 1;
                Some(WatchEventKind::StreamOffline { online_secs })
            }
            _ => None,
        }
    }

    pub fn record_failure(&mut self) {
        self.total_polls += 1;
        self.failed_polls += 1;
    }

    pub fn record_chat_join(&mut self) {
        self.chat_joins += 1;
    }

    /// Summary at `now`, counting an ongoing online session up to `now`.
    pub fn exit_summary(&self, username: &str, channel: &str, now: DateTime<Utc>) -> ExitSummary {
        let ongoing = self
            .online_since
            .map(|since| (now - since).num_seconds().max(0))
            .unwrap_or(0);

        ExitSummary {
            username: username.to_string(),
            channel: channel.to_string(),
            started_at: self.started_at.to_rfc3339(),
            stopped_at: now.to_rfc3339(),
            total_polls: self.total_polls,
            failed_polls: self.failed_polls,
            went_online: self.went_online,
            went_offline: self.went_offline,
            total_online_secs: self.total_online_secs + ongoing,
            chat_joins: self.chat_joins,
            currently_online: self.online,
        }
    }
}
