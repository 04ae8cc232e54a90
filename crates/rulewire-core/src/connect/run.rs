//! Connection loop: connect, classify failures, refresh credentials, back off.

use std::time::Duration;

use futures_util::{Sink, Stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::backoff::Backoff;
use super::classify::{classify, decide, ErrorKind, RetryDecision};
use super::error::ClientError;
use crate::config::ConnectionConfig;
use crate::{tls, token};

/// Live client connection handed to handlers.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Deadline for the TCP connect plus WebSocket upgrade.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Message stream/sink bounds a handler runs against. Production code uses
/// [`WsStream`]; tests substitute scripted fakes.
pub trait WsLink:
    Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send
{
}

impl<T> WsLink for T where
    T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send
{
}

/// Per-connection protocol logic invoked by the manager after a successful
/// connect. Runs to completion (returning its output) or fails, which
/// re-enters the manager's retry/abort decision.
#[allow(async_fn_in_trait)]
pub trait Handler {
    type Output;

    async fn on_connection<L: WsLink>(&mut self, link: &mut L)
        -> Result<Self::Output, ClientError>;
}

/// Open the stream for one attempt: TLS context from the URL scheme, bearer
/// header if configured, bounded by [`CONNECT_TIMEOUT`].
async fn open_stream(
    config: &ConnectionConfig,
    url: &Url,
    auth_header: Option<&str>,
) -> Result<WsStream, ClientError> {
    let connector = tls::connector_for(url, &config.ssl_verify)?;
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(ClientError::from_ws)?;
    if let Some(header) = auth_header {
        let value = HeaderValue::from_str(header)
            .map_err(|e| ClientError::Decode(format!("authorization header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let connect =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);
    match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(err)) => Err(ClientError::from_ws(err)),
        Err(_) => Err(ClientError::Timeout),
    }
}

/// One full attempt: connect, reset the backoff and refresh state, run the
/// handler to completion.
async fn run_attempt<H: Handler>(
    config: &ConnectionConfig,
    url: &Url,
    auth_header: Option<&str>,
    handler: &mut H,
    backoff: &mut Backoff,
    refresh_available: &mut bool,
) -> Result<H::Output, ClientError> {
    let mut stream = open_stream(config, url, auth_header).await?;
    backoff.reset();
    *refresh_available = true;
    handler.on_connection(&mut stream).await
}

/// Run `handler` over a connection to `config.url`, reconnecting until the
/// handler completes or a failure classifies as fatal.
///
/// `retry_on_close` is the flow's tolerance for remote closes: the workload
/// download treats a close as fatal, the event shipper reconnects and
/// resumes. Cancellation interrupts connects, handler I/O, and backoff
/// waits, and is returned immediately without further attempts.
pub async fn connect_with_retry<H: Handler>(
    config: &ConnectionConfig,
    handler: &mut H,
    retry_on_close: bool,
    cancel: &CancellationToken,
) -> Result<H::Output, ClientError> {
    let url = config.validated_url()?;
    tracing::info!("websocket {}", url);

    let mut auth_header = config.bearer_header();
    let mut refresh_available = true;
    let mut backoff = Backoff::new();

    loop {
        tracing::info!("attempt websocket connection");
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = run_attempt(
                config,
                &url,
                auth_header.as_deref(),
                handler,
                &mut backoff,
                &mut refresh_available,
            ) => result,
        };

        let err = match result {
            Ok(output) => return Ok(output),
            Err(err) => err,
        };
        if matches!(err, ClientError::Cancelled) {
            tracing::warn!("websocket aborted by cancellation");
            return Err(err);
        }

        let kind = classify(&err);
        match decide(kind, retry_on_close, refresh_available) {
            RetryDecision::Abort => {
                match kind {
                    ErrorKind::Unclassified => tracing::error!("websocket error: {err}"),
                    _ => tracing::warn!("websocket aborted: {err}"),
                }
                return Err(err);
            }
            RetryDecision::RefreshAndRetry => {
                let access = token::renew_token(config)
                    .await
                    .map_err(ClientError::Token)?;
                auth_header = Some(format!("Bearer {access}"));
                refresh_available = false;
            }
            RetryDecision::RetryAfterBackoff => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    _ = backoff.wait() => {}
                }
            }
        }
    }
}
