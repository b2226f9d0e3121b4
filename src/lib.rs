pub mod auth;
pub mod chat;
pub mod config;
pub mod env;
pub mod error;
pub mod helix;
pub mod logging;
pub mod miner;
pub mod reporter;
pub mod state;
pub mod types;
pub mod watcher;

/// Channel watched when `TARGET_CHANNEL` is not set.
pub const DEFAULT_TARGET_CHANNEL: &str = "Yugi2x";

/// Twitch identity service base URL (token exchange + validation)
pub const ID_API_BASE: &str = "https://id.twitch.tv";

/// Helix REST API base URL
pub const HELIX_API_BASE: &str = "https://api.twitch.tv/helix";

/// Chat (IRC over WebSocket) endpoint
pub const CHAT_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Upper bound for any single platform HTTP request.
pub const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Shared HTTP client settings for platform requests.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Resolve `path` against an API base URL, tolerating a missing trailing slash.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<url::Url, url::ParseError> {
    let mut base = url::Url::parse(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
}
