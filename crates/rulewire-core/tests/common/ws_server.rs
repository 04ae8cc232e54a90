//! Minimal WebSocket server for integration tests.
//!
//! Accepts connections one at a time and hands each to a caller-supplied
//! session, along with the zero-based connection number so reconnect tests
//! can script different behavior per connection.

use std::future::Future;

use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::WebSocketStream;

pub type ServerWs = WebSocketStream<TcpStream>;

/// Start a server in a background task. Returns the `ws://` URL to dial.
pub async fn start<F, Fut>(mut session: F) -> String
where
    F: FnMut(usize, ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut n = 0usize;
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                session(n, ws).await;
                n += 1;
            }
        }
    });
    format!("ws://127.0.0.1:{port}/api/ws")
}

/// Start a server that rejects every upgrade with the given HTTP status.
pub async fn start_rejecting(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let reject = move |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
                let mut resp = ErrorResponse::new(None);
                *resp.status_mut() = status.try_into().expect("status");
                Err(resp)
            };
            let _ = tokio_tungstenite::accept_hdr_async(stream, reject).await;
        }
    });
    format!("ws://127.0.0.1:{port}/api/ws")
}

/// Send one JSON record as a text frame.
pub async fn send_json(ws: &mut ServerWs, value: Value) {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    ws.send(Message::Text(value.to_string())).await.expect("send");
}
