//! CLI for the rulewire worker client.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use rulewire_core::config::{ConnectionConfig, SslVerify};

use commands::{run_check, run_fetch, run_ship};

/// Top-level CLI for the rulewire worker client.
#[derive(Debug, Parser)]
#[command(name = "rulewire")]
#[command(about = "rulewire: resilient controller link for rule-execution workers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Connection flags shared by every subcommand. Each falls back to its
/// `RULEWIRE_WEBSOCKET_*` environment variable when omitted.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Controller websocket URL (RULEWIRE_WEBSOCKET_URL).
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Static bearer token for the upgrade request
    /// (RULEWIRE_WEBSOCKET_ACCESS_TOKEN).
    #[arg(long, value_name = "TOKEN")]
    access_token: Option<String>,

    /// Refresh token used to renew the access token on a 403
    /// (RULEWIRE_WEBSOCKET_REFRESH_TOKEN).
    #[arg(long, value_name = "TOKEN")]
    refresh_token: Option<String>,

    /// Token renewal endpoint (RULEWIRE_WEBSOCKET_TOKEN_URL).
    #[arg(long, value_name = "URL")]
    token_url: Option<String>,

    /// TLS verification: (yes|true) | (no|false) | path to a CA bundle
    /// (RULEWIRE_WEBSOCKET_SSL_VERIFY).
    #[arg(long, value_name = "POLICY")]
    ssl_verify: Option<String>,
}

impl ConnectionArgs {
    fn flag_or_env(flag: Option<String>, var: &str) -> Option<String> {
        flag.or_else(|| std::env::var(var).ok())
            .filter(|v| !v.is_empty())
    }

    pub fn into_config(self) -> Result<ConnectionConfig> {
        let url = Self::flag_or_env(self.url, "RULEWIRE_WEBSOCKET_URL")
            .context("websocket url is required (--url or RULEWIRE_WEBSOCKET_URL)")?;
        let ssl_verify = Self::flag_or_env(self.ssl_verify, "RULEWIRE_WEBSOCKET_SSL_VERIFY")
            .and_then(|v| v.parse::<SslVerify>().ok())
            .unwrap_or_default();
        Ok(ConnectionConfig {
            url,
            access_token: Self::flag_or_env(self.access_token, "RULEWIRE_WEBSOCKET_ACCESS_TOKEN"),
            refresh_token: Self::flag_or_env(
                self.refresh_token,
                "RULEWIRE_WEBSOCKET_REFRESH_TOKEN",
            ),
            token_url: Self::flag_or_env(self.token_url, "RULEWIRE_WEBSOCKET_TOKEN_URL"),
            ssl_verify,
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the execution workload and print a summary.
    Fetch {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Activation instance id sent in the worker handshake.
        #[arg(long)]
        id: String,
    },

    /// Ship newline-delimited JSON events to the controller.
    Ship {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Read events from this file instead of stdin.
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Validate the configured URL and token renewal endpoint.
    Check {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Fetch { conn, id } => run_fetch(conn.into_config()?, &id).await,
            CliCommand::Ship { conn, file } => run_ship(conn.into_config()?, file).await,
            CliCommand::Check { conn } => run_check(conn.into_config()?).await,
        }
    }
}
