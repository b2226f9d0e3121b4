//! The miner configuration record and the startup pipeline that builds it.
//!
//! Credentials and the target channel come from the environment; every
//! feature flag is a literal chosen here.

use tracing::{info, warn};

use crate::DEFAULT_TARGET_CHANNEL;
use crate::auth::{Credential, IdentityClient, OAUTH_PREFIX};
use crate::env::{
    CLIENT_ID, CLIENT_SECRET, EnvSource, TARGET_CHANNEL, TWITCH_PASSWORD, TWITCH_USERNAME,
};
use crate::error::ConfigError;

/// When the bot should sit in the streamer's chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPresence {
    Always,
    Never,
    Online,
    Offline,
}

impl ChatPresence {
    pub fn wants_chat(self, stream_online: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Online => stream_online,
            Self::Offline => !stream_online,
        }
    }
}

/// Order in which watch targets are picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Catch the watch-streak bonus first.
    Streak,
    Drops,
    /// Fall back to the configured streamer order.
    Order,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerSettings {
    pub make_predictions: bool,
    pub follow_raid: bool,
    pub claim_drops: bool,
    pub watch_streak: bool,
    pub chat: ChatPresence,
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            make_predictions: false,
            follow_raid: true,
            claim_drops: true,
            watch_streak: true,
            chat: ChatPresence::Online,
        }
    }
}

impl StreamerSettings {
    /// Names of the enabled features, for the startup log line.
    pub fn enabled_features(&self) -> Vec<&'static str> {
        let mut features = Vec::new();
        if self.make_predictions {
            features.push("predictions");
        }
        if self.watch_streak {
            features.push("watch_streak");
        }
        if self.claim_drops {
            features.push("claim_drops");
        }
        if self.follow_raid {
            features.push("follow_raid");
        }
        if self.chat != ChatPresence::Never {
            features.push("chat_presence");
        }
        features
    }
}

/// Everything the watcher needs. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub username: String,
    pub credential: Credential,
    pub target_channel: String,
    pub claim_drops_startup: bool,
    pub priority: Vec<Priority>,
    pub streamer_settings: StreamerSettings,
}

impl MinerConfig {
    /// Build the config from the environment.
    ///
    /// The username is checked before anything else, so a missing or
    /// malformed username never reaches the network. The only request this
    /// can make is the client-credentials exchange, and only when no direct
    /// password is set.
    pub async fn resolve(env: &EnvSource, identity: &IdentityClient) -> Result<Self, ConfigError> {
        let username = env.get(TWITCH_USERNAME).ok_or(ConfigError::MissingUsername)?;
        validate_username(username)?;

        let credential = resolve_credential(env, identity).await?;

        let target_channel = env
            .get(TARGET_CHANNEL)
            .unwrap_or(DEFAULT_TARGET_CHANNEL)
            .to_string();

        Ok(Self {
            username: username.to_string(),
            credential,
            target_channel,
            claim_drops_startup: false,
            priority: vec![Priority::Streak, Priority::Drops, Priority::Order],
            streamer_settings: StreamerSettings::default(),
        })
    }
}

/// Usernames are restricted to ASCII letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<(), ConfigError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUsername(username.to_string()))
    }
}

async fn resolve_credential(
    env: &EnvSource,
    identity: &IdentityClient,
) -> Result<Credential, ConfigError> {
    if let Some(password) = env.get(TWITCH_PASSWORD) {
        if !password.starts_with(OAUTH_PREFIX) {
            warn!("TWITCH_PASSWORD has no '{OAUTH_PREFIX}' prefix, adding it");
        }
        return Credential::from_raw(password);
    }

    match (env.get(CLIENT_ID), env.get(CLIENT_SECRET)) {
        (Some(client_id), Some(client_secret)) => {
            info!("TWITCH_PASSWORD not set, requesting a token with CLIENT_ID/CLIENT_SECRET");
            identity
                .exchange_client_credentials(client_id, client_secret)
                .await
        }
        _ => Err(ConfigError::MissingCredential),
    }
}
