//! Access-token renewal against the controller's token endpoint.
//!
//! Uses the curl crate (libcurl) for the form POST; runs under
//! `spawn_blocking` so the connection loop stays async.

use std::time::Duration;

use thiserror::Error;

use crate::config::{ConnectionConfig, SslVerify};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token renewal is not configured (refresh token and token url required)")]
    NotConfigured,
    #[error("token request failed: {0}")]
    Http(#[from] curl::Error),
    #[error("token endpoint returned HTTP {0}")]
    Status(u32),
    #[error("token endpoint did not return the expected format: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("token response does not contain an access token")]
    MissingAccess,
    #[error("token renewal task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Exchange the configured refresh token for a freshly issued access token.
pub async fn renew_token(config: &ConnectionConfig) -> Result<String, TokenError> {
    let token_url = config
        .token_url
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(TokenError::NotConfigured)?;
    let refresh = config
        .refresh_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(TokenError::NotConfigured)?;
    let ssl_verify = config.ssl_verify.clone();

    tracing::info!("renewing access token from {}", token_url);
    tokio::task::spawn_blocking(move || post_refresh(&token_url, &refresh, &ssl_verify)).await?
}

/// Blocking POST of `refresh=<token>`, form-encoded. Runs in a blocking task.
fn post_refresh(url: &str, refresh: &str, ssl_verify: &SslVerify) -> Result<String, TokenError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.post(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    match ssl_verify {
        SslVerify::Yes => {}
        SslVerify::No => {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }
        SslVerify::CaBundle(path) => easy.cainfo(path)?,
    }

    let form = format!("refresh={}", easy.url_encode(refresh.as_bytes()));
    easy.post_fields_copy(form.as_bytes())?;

    let mut body: Vec<u8> = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        tracing::error!("failed to renew token: HTTP {}", code);
        return Err(TokenError::Status(code));
    }
    extract_access(&body)
}

/// Pull the `access` field out of the endpoint's JSON response.
fn extract_access(body: &[u8]) -> Result<String, TokenError> {
    let parsed: serde_json::Value = serde_json::from_slice(body)?;
    match parsed.get("access").and_then(|v| v.as_str()) {
        Some(access) => Ok(access.to_string()),
        None => {
            tracing::error!("failed to renew token: {}", parsed);
            Err(TokenError::MissingAccess)
        }
    }
}
