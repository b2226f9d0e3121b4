use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::auth::IdentityClient;
use crate::chat::ChatSession;
use crate::config::{ColorPalette, SettingsConfig};
use crate::helix::HelixClient;
use crate::miner::{ChatPresence, MinerConfig};
use crate::reporter;
use crate::state::WatchState;
use crate::types::{ExitSummary, WatchEvent, WatchEventKind};
use crate::{CHAT_WS_URL, HELIX_API_BASE};

/// Where the watcher talks to. Overridden in tests.
#[derive(Debug, Clone)]
pub struct WatchEndpoints {
    pub helix_base: String,
    pub chat_url: String,
}

impl Default for WatchEndpoints {
    fn default() -> Self {
        Self {
            helix_base: HELIX_API_BASE.to_string(),
            chat_url: CHAT_WS_URL.to_string(),
        }
    }
}

/// The long-running loop: poll stream state, keep chat presence in line
/// with the configured policy, report transitions.
pub struct Watcher {
    config: MinerConfig,
    helix: HelixClient,
    chat_url: String,
    chat_enabled: bool,
    poll_interval: Duration,
    state: WatchState,
    chat: Option<ChatSession>,
    palette: Option<ColorPalette>,
}

impl Watcher {
    /// Validate the credential and prepare the API clients.
    pub async fn connect(
        config: MinerConfig,
        settings: &SettingsConfig,
        identity: &IdentityClient,
        endpoints: WatchEndpoints,
    ) -> Result<Self> {
        let token = identity
            .validate(&config.credential)
            .await
            .context("access token validation failed")?;

        match &token.login {
            Some(login) if !login.eq_ignore_ascii_case(&config.username) => {
                warn!("Token belongs to {login}, not {}", config.username);
            }
            Some(login) => info!("Authenticated as {login}"),
            None => warn!("App access token in use, chat presence is unavailable"),
        }
        info!("Token expires in {}s", token.expires_in);

        let chat_enabled =
            token.is_user_token() && config.streamer_settings.chat != ChatPresence::Never;
        let helix = HelixClient::new(&endpoints.helix_base, &config.credential, &token);

        Ok(Self {
            config,
            helix,
            chat_url: endpoints.chat_url,
            chat_enabled,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            state: WatchState::new(Utc::now()),
            chat: None,
            palette: None,
        })
    }

    /// Colour the online/offline log lines.
    pub fn with_palette(mut self, palette: ColorPalette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Run until Ctrl+C. Returns an error only if the platform stops
    /// accepting the access token.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Run until `shutdown` resolves. An in-flight poll is abandoned when it
    /// does.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> Result<()> {
        info!(
            "Entering watch loop (interval: {}s). Press Ctrl+C to stop.",
            self.poll_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Bot stopped by user (Ctrl+C)");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("Bot stopped by user (Ctrl+C)");
                            break Ok(());
                        }
                        result = self.poll_cycle() => {
                            if let Err(e) = result {
                                break Err(e);
                            }
                        }
                    }
                }
            }
        };

        self.leave_chat().await;
        outcome
    }

    /// One poll with the loop's error policy applied: a rejected token is
    /// returned as an error, anything else is counted and logged.
    pub async fn poll_cycle(&mut self) -> Result<()> {
        match self.poll_once().await {
            Ok(()) => Ok(()),
            Err(e) if is_unauthorized(&e) => Err(e.context("access token was rejected")),
            Err(e) => {
                self.state.record_failure();
                warn!("Poll cycle error: {e:#}");
                Ok(())
            }
        }
    }

    /// One cycle: look up the stream, report a transition, fix up chat.
    pub async fn poll_once(&mut self) -> Result<()> {
        let stream = self
            .helix
            .fetch_stream(&self.config.target_channel)
            .await?;
        let now = Utc::now();

        if let Some(kind) = self.state.observe(stream.as_ref(), now) {
            match &kind {
                WatchEventKind::StreamOnline {
                    title, game_name, ..
                } => {
                    let line = format!(
                        "{} is online: {title} ({game_name})",
                        self.config.target_channel
                    );
                    info!("{}", self.highlight(&line, true));
                }
                WatchEventKind::StreamOffline { .. } => {
                    let line = format!("{} went offline", self.config.target_channel);
                    info!("{}", self.highlight(&line, false));
                }
                _ => {}
            }
            self.emit(kind, now);
        }

        self.reconcile_chat().await;
        Ok(())
    }

    async fn reconcile_chat(&mut self) {
        if !self.chat_enabled {
            return;
        }

        if self.chat.as_ref().is_some_and(|session| !session.is_alive()) {
            if let Some(session) = self.chat.take() {
                if let Err(e) = session.leave().await {
                    warn!("Chat session ended: {e:#}");
                }
                self.emit(WatchEventKind::ChatLeft, Utc::now());
            }
        }

        let wanted = self
            .config
            .streamer_settings
            .chat
            .wants_chat(self.state.online);

        if wanted && self.chat.is_none() {
            match ChatSession::join(
                &self.chat_url,
                &self.config.username,
                &self.config.credential,
                &self.config.target_channel,
            )
            .await
            {
                Ok(session) => {
                    self.chat = Some(session);
                    self.state.record_chat_join();
                    self.emit(WatchEventKind::ChatJoined, Utc::now());
                }
                Err(e) => warn!("Could not join chat: {e:#}"),
            }
        } else if !wanted {
            self.leave_chat().await;
        }
    }

    async fn leave_chat(&mut self) {
        if let Some(session) = self.chat.take() {
            if let Err(e) = session.leave().await {
                warn!("Chat session ended with error: {e:#}");
            }
            self.emit(WatchEventKind::ChatLeft, Utc::now());
        }
    }

    fn highlight(&self, text: &str, online: bool) -> String {
        match &self.palette {
            Some(palette) => palette.for_status(online).paint(text),
            None => text.to_string(),
        }
    }

    fn emit(&self, kind: WatchEventKind, at: DateTime<Utc>) {
        reporter::report_event(&WatchEvent {
            timestamp: at.to_rfc3339(),
            channel: self.config.target_channel.clone(),
            kind,
        });
    }

    pub fn exit_summary(&self) -> ExitSummary {
        self.state
            .exit_summary(&self.config.username, &self.config.target_channel, Utc::now())
    }
}

/// True when the error chain holds an HTTP 401 from the platform.
pub fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .and_then(|e| e.status())
        .is_some_and(|status| status == StatusCode::UNAUTHORIZED)
}
