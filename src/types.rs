use serde::Serialize;

/// What happened to the watched channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchEventKind {
    StreamOnline {
        title: String,
        game_name: String,
        viewer_count: u64,
    },
    StreamOffline {
        /// Length of the session that just ended, if it was observed starting.
        online_secs: Option<i64>,
    },
    ChatJoined,
    ChatLeft,
}

/// One JSON line on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct WatchEvent {
    pub timestamp: String,
    pub channel: String,
    #[serde(flatten)]
    pub kind: WatchEventKind,
}

/// Printed once on shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct ExitSummary {
    pub username: String,
    pub channel: String,
    pub started_at: String,
    pub stopped_at: String,
    pub total_polls: u64,
    pub failed_polls: u64,
    pub went_online: u64,
    pub went_offline: u64,
    pub total_online_secs: i64,
    pub chat_joins: u64,
    pub currently_online: bool,
}
