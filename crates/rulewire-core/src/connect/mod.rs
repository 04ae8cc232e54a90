//! Connection lifecycle: retry loop, error classification, backoff.
//!
//! This module owns the reconnect state machine shared by both flows. The
//! workload download and the event shipper plug in as [`Handler`]s; the loop
//! classifies every failure (retry with backoff, refresh credentials once,
//! or abort) so the handlers never see a recoverable error.

mod backoff;
mod classify;
mod error;
mod run;

pub use backoff::{next_delay, Backoff, BACKOFF_FACTOR, BACKOFF_INITIAL, BACKOFF_MAX, BACKOFF_MIN};
pub use classify::{classify, decide, ErrorKind, RetryDecision};
pub use error::ClientError;
pub use run::{connect_with_retry, Handler, WsLink, WsStream};
