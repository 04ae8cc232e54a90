//! `rulewire check` – validate the connection configuration.

use anyhow::{Context, Result};

use rulewire_core::config::ConnectionConfig;
use rulewire_core::token::renew_token;

pub async fn run_check(config: ConnectionConfig) -> Result<()> {
    let url = config.validated_url().context("websocket url")?;
    println!("websocket url ok: {url}");

    if config.refresh_token.is_some() && config.token_url.is_some() {
        let access = renew_token(&config).await.context("token renewal")?;
        println!("token renewal ok ({} byte access token)", access.len());
    } else {
        println!("token renewal not configured; skipped");
    }
    Ok(())
}
