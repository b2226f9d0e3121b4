//! Snapshot of the environment variables the bot reads.

use std::collections::HashMap;

pub const TWITCH_USERNAME: &str = "TWITCH_USERNAME";
pub const TWITCH_PASSWORD: &str = "TWITCH_PASSWORD";
pub const TARGET_CHANNEL: &str = "TARGET_CHANNEL";
pub const CLIENT_ID: &str = "CLIENT_ID";
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";

const KNOWN_KEYS: [&str; 5] = [
    TWITCH_USERNAME,
    TWITCH_PASSWORD,
    TARGET_CHANNEL,
    CLIENT_ID,
    CLIENT_SECRET,
];

/// Values are trimmed on read; blank values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Capture the known keys from the process environment.
    ///
    /// Call after `dotenvy::dotenv()` so `.env` values are visible.
    pub fn from_process() -> Self {
        let vars = KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { vars }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_trims_whitespace() {
        let env = EnvSource::from_pairs(&[(TWITCH_USERNAME, "  viewer_01 \n")]);
        assert_eq!(env.get(TWITCH_USERNAME), Some("viewer_01"));
    }

    #[test]
    fn blank_value_is_unset() {
        let env = EnvSource::from_pairs(&[(TWITCH_PASSWORD, "   ")]);
        assert_eq!(env.get(TWITCH_PASSWORD), None);
    }

    #[test]
    fn missing_key_is_none() {
        let env = EnvSource::default();
        assert_eq!(env.get(TARGET_CHANNEL), None);
    }

    #[test]
    fn set_overrides_existing_value() {
        let mut env = EnvSource::from_pairs(&[(TWITCH_PASSWORD, "old")]);
        env.set(TWITCH_PASSWORD, "new");
        assert_eq!(env.get(TWITCH_PASSWORD), Some("new"));
    }
}
