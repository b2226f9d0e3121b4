use thiserror::Error;

const ENV_HINT: &str = "Create a .env file with:\n  \
    TWITCH_USERNAME=your_username\n  \
    TWITCH_PASSWORD=your_token\n  \
    TARGET_CHANNEL=Yugi2x";

/// Startup failures: bad or missing environment values, or a rejected token call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TWITCH_USERNAME is not set.\n{}", ENV_HINT)]
    MissingUsername,

    #[error("TWITCH_USERNAME {0:?} may only contain letters, digits and underscores")]
    InvalidUsername(String),

    #[error("TWITCH_PASSWORD is not set and no CLIENT_ID/CLIENT_SECRET pair is available.\n{}", ENV_HINT)]
    MissingCredential,

    #[error("token endpoint returned {status}: {body}")]
    TokenRejected { status: u16, body: String },

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected identity response: {0}")]
    MalformedResponse(String),
}
