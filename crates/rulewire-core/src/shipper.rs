//! Outbound event shipping: at-least-once delivery over the feedback socket.
//!
//! The queue is externally owned; the shipper holds the single in-flight
//! slot, so a record whose send fails is retransmitted verbatim on the next
//! connection and never silently dropped.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionConfig;
use crate::connect::{connect_with_retry, ClientError, Handler, WsLink};

/// Local sentinel that terminates the shipping loop. Never transmitted.
pub fn exit_sentinel() -> Value {
    json!({"type": "Exit"})
}

/// Externally owned queue of outbound event records plus the in-flight slot
/// that survives reconnects within one shipper lifetime.
pub struct EventLogQueue {
    rx: mpsc::UnboundedReceiver<Value>,
    pending: Option<Value>,
}

impl EventLogQueue {
    pub fn new(rx: mpsc::UnboundedReceiver<Value>) -> Self {
        Self { rx, pending: None }
    }

    /// The record sent but not yet acknowledged by a successful transmission.
    pub fn pending(&self) -> Option<&Value> {
        self.pending.as_ref()
    }
}

/// Ship queued event records: connect with tolerance for remote closes and
/// run the shipper until the exit sentinel (or the last producer) closes
/// the loop.
pub async fn send_event_log(
    config: &ConnectionConfig,
    queue: EventLogQueue,
    cancel: &CancellationToken,
) -> Result<(), ClientError> {
    let mut shipper = EventLogShipper::new(queue);
    connect_with_retry(config, &mut shipper, true, cancel).await
}

/// Handler that ships queued records on a live connection.
pub struct EventLogShipper {
    logs: EventLogQueue,
}

impl EventLogShipper {
    pub fn new(queue: EventLogQueue) -> Self {
        Self { logs: queue }
    }
}

impl Handler for EventLogShipper {
    type Output = ();

    async fn on_connection<L: WsLink>(&mut self, link: &mut L) -> Result<(), ClientError> {
        tracing::info!("feedback websocket connected");

        if let Some(event) = self.logs.pending.clone() {
            tracing::info!("resending last event");
            link.send(Message::Text(event.to_string()))
                .await
                .map_err(ClientError::from_ws)?;
            self.logs.pending = None;
        }

        loop {
            // Wait for the next record while watching the stream, so a
            // remote close while idle surfaces with its real close code.
            let event = 'idle: loop {
                tokio::select! {
                    maybe = self.logs.rx.recv() => break 'idle maybe,
                    incoming = link.next() => match incoming {
                        Some(Ok(Message::Close(frame))) => {
                            return Err(ClientError::from_close(frame))
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(ClientError::from_ws(err)),
                        None => {
                            return Err(ClientError::Closed {
                                code: None,
                                reason: String::new(),
                            })
                        }
                    },
                }
            };
            let Some(event) = event else {
                tracing::info!("event queue closed; exiting feedback websocket task");
                break;
            };
            tracing::debug!("event received: {}", event);
            if event == exit_sentinel() {
                tracing::info!("exiting feedback websocket task");
                break;
            }

            let text = event.to_string();
            self.logs.pending = Some(event);
            link.send(Message::Text(text))
                .await
                .map_err(ClientError::from_ws)?;
            self.logs.pending = None;
        }
        Ok(())
    }
}
