//! Client-credential token acquisition against the identity provider.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::Credentials;
use crate::contract::CredentialProvider;
use crate::error::{DocError, Result};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Opaque bearer credential held in memory for the duration of a run.
#[derive(Clone)]
pub struct BearerToken {
    value: String,
    expires_at: Instant,
}

impl BearerToken {
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + lifetime,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_SKEW >= self.expires_at
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Client-credential grant (`grant_type=client_credentials`) with a fixed scope.
pub struct ClientCredentialProvider {
    http: reqwest::Client,
    credentials: Credentials,
    authority: String,
    scope: String,
}

impl ClientCredentialProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_authority(credentials, DEFAULT_AUTHORITY)
    }

    pub fn with_authority(credentials: Credentials, authority: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            authority: authority.into().trim_end_matches('/').to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority, self.credentials.tenant_id
        )
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialProvider {
    async fn acquire(&self) -> Result<BearerToken> {
        let url = self.token_url();
        info!(
            tenant_id = %self.credentials.tenant_id,
            client_id = %self.credentials.client_id,
            "Requesting bearer token"
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Token endpoint rejected the request");
            return Err(DocError::Token(format!("{status}: {body}")));
        }
        let token = parse_token_response(&body)?;
        info!(token_len = token.value().len(), "Bearer token acquired");
        Ok(token)
    }
}

fn parse_token_response(body: &str) -> Result<BearerToken> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| DocError::Token(format!("unexpected token response: {e}")))?;
    Ok(BearerToken::new(
        parsed.access_token,
        Duration::from_secs(parsed.expires_in),
    ))
}
