use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::{ID_API_BASE, endpoint, http_client};

/// Prefix chat login expects in front of the raw access token.
pub const OAUTH_PREFIX: &str = "oauth:";

/// Scopes requested by the client-credentials exchange.
pub const OAUTH_SCOPES: [&str; 3] = ["chat:read", "chat:edit", "channel:read:redemptions"];

/// An access token, always stored with the `oauth:` prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Normalize a raw token, adding the `oauth:` prefix when it is missing.
    ///
    /// Fails with `MissingCredential` when nothing is left after the prefix.
    pub fn from_raw(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let token = raw.strip_prefix(OAUTH_PREFIX).unwrap_or(raw).trim();
        if token.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(Self(format!("{OAUTH_PREFIX}{token}")))
    }

    /// Prefixed form, as sent in the chat `PASS` line.
    pub fn irc_pass(&self) -> &str {
        &self.0
    }

    /// Bare token for `Authorization` headers.
    pub fn bearer(&self) -> &str {
        &self.0[OAUTH_PREFIX.len()..]
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"oauth:***").finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Result of validating an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub client_id: String,
    /// Absent for app access tokens.
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// `null` for app tokens without scopes.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub expires_in: u64,
}

impl TokenInfo {
    /// App tokens carry no user and cannot log into chat.
    pub fn is_user_token(&self) -> bool {
        self.login.is_some()
    }
}

/// Client for the identity service (token exchange and validation).
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for IdentityClient {
    fn default() -> Self {
        Self::new(ID_API_BASE)
    }
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Exchange a client id/secret pair for an app access token.
    ///
    /// Issues exactly one POST. Any status other than 200 is returned as
    /// `TokenRejected` with the response body attached.
    pub async fn exchange_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Credential, ConfigError> {
        let url = endpoint(&self.base_url, "oauth2/token")?;
        let scope = OAUTH_SCOPES.join(" ");
        let resp = self
            .http
            .post(url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;

        let body = read_ok_body(resp).await?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ConfigError::MalformedResponse(format!("token response: {e}")))?;
        debug!(
            "Exchanged client credentials for access token (expires in {}s)",
            token.expires_in
        );
        Credential::from_raw(&token.access_token)
    }

    /// Ask the identity service who the token belongs to.
    pub async fn validate(&self, credential: &Credential) -> Result<TokenInfo, ConfigError> {
        let url = endpoint(&self.base_url, "oauth2/validate")?;
        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("OAuth {}", credential.bearer()))
            .send()
            .await?;

        let body = read_ok_body(resp).await?;
        serde_json::from_str(&body)
            .map_err(|e| ConfigError::MalformedResponse(format!("validate response: {e}")))
    }
}

async fn read_ok_body(resp: reqwest::Response) -> Result<String, ConfigError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status != StatusCode::OK {
        return Err(ConfigError::TokenRejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
