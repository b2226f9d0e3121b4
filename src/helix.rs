use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Credential, TokenInfo};
use crate::{endpoint, http_client};

/// A live stream as returned by `GET /streams`.
#[derive(Debug, Clone, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

/// Authenticated Helix client.
///
/// Helix wants the `Client-Id` the token was issued to, so it is taken from
/// the token validation result rather than from the environment.
pub struct HelixClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    bearer: String,
}

impl HelixClient {
    pub fn new(base_url: &str, credential: &Credential, token: &TokenInfo) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.to_string(),
            client_id: token.client_id.clone(),
            bearer: format!("Bearer {}", credential.bearer()),
        }
    }

    /// Current stream for `login`, or `None` when the channel is offline.
    pub async fn fetch_stream(&self, login: &str) -> Result<Option<Stream>> {
        let url = endpoint(&self.base_url, "streams")?;
        let login = login.to_lowercase();
        let page: Page<Stream> = self
            .http
            .get(url)
            .query(&[("user_login", login.as_str()), ("first", "1")])
            .header("Client-Id", &self.client_id)
            .header("Authorization", &self.bearer)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("stream lookup for {login} failed"))?
            .json()
            .await
            .context("malformed streams response")?;

        let stream = page.data.into_iter().next();
        debug!(
            "Stream lookup for {login}: {}",
            if stream.is_some() { "online" } else { "offline" }
        );
        Ok(stream)
    }
}
