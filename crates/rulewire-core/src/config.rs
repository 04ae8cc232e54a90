//! Connection configuration: target URL, credentials, TLS verify policy.

use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::connect::ClientError;

/// TLS peer verification policy, parsed from the operator-facing
/// `(yes|true) | (no|false) | <path to a CA bundle>` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SslVerify {
    #[default]
    Yes,
    No,
    CaBundle(PathBuf),
}

impl FromStr for SslVerify {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" | "yes" | "true" => SslVerify::Yes,
            "no" | "false" => SslVerify::No,
            _ => SslVerify::CaBundle(PathBuf::from(s.trim())),
        })
    }
}

/// Settings for the controller WebSocket link.
///
/// Immutable per connection attempt; the access token is the one field the
/// connection manager replaces, at most once per attempt cycle, when the
/// server rejects it.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Target URL, scheme `ws` or `wss`.
    pub url: String,
    /// Static bearer token presented on the upgrade request.
    pub access_token: Option<String>,
    /// Refresh token exchanged for a new access token on a 403.
    pub refresh_token: Option<String>,
    /// Endpoint that issues fresh access tokens.
    pub token_url: Option<String>,
    /// TLS verification policy for `wss` URLs and the token endpoint.
    pub ssl_verify: SslVerify,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse and validate the target URL. A failure here is a configuration
    /// error: the manager fails fast and never retries it.
    pub fn validated_url(&self) -> Result<Url, ClientError> {
        let parsed =
            Url::parse(&self.url).map_err(|_| ClientError::InvalidUrl(self.url.clone()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") || parsed.host_str().is_none() {
            return Err(ClientError::InvalidUrl(self.url.clone()));
        }
        Ok(parsed)
    }

    /// `Authorization` header value for the next attempt, if a token is set.
    pub fn bearer_header(&self) -> Option<String> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"))
    }
}
