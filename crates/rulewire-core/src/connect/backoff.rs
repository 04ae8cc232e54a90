//! Reconnect backoff: truncated exponential growth with a jittered first wait.

use rand::Rng;
use std::time::Duration;

/// Delay floor in seconds; also the "no failures yet" sentinel value.
pub const BACKOFF_MIN: f64 = 1.92;
/// Delay ceiling in seconds.
pub const BACKOFF_MAX: f64 = 60.0;
/// Growth factor applied after every wait.
pub const BACKOFF_FACTOR: f64 = 1.618;
/// Upper bound in seconds for the random delay before the first retry.
pub const BACKOFF_INITIAL: f64 = 5.0;

/// Delay that follows `delay` in the backoff sequence.
pub fn next_delay(delay: f64) -> f64 {
    (delay * BACKOFF_FACTOR).min(BACKOFF_MAX)
}

/// Reconnect delay state for one connection loop.
///
/// The delay never decreases between resets and never exceeds
/// [`BACKOFF_MAX`]; a successful connect resets it to [`BACKOFF_MIN`].
#[derive(Debug)]
pub struct Backoff {
    delay: f64,
}

impl Backoff {
    pub fn new() -> Self {
        Self { delay: BACKOFF_MIN }
    }

    /// Call on every successful connect.
    pub fn reset(&mut self) {
        self.delay = BACKOFF_MIN;
    }

    /// Sleep before the next attempt, then advance the delay.
    ///
    /// The first wait after a success is a uniform random duration in
    /// `[0, BACKOFF_INITIAL)` seconds (abnormal-closure recovery, RFC 6455
    /// §7.2.3); subsequent waits truncate the delay to whole seconds.
    /// No side effects besides the sleep and a warning log; callers race
    /// this future against their cancellation signal.
    pub async fn wait(&mut self) {
        if self.delay == BACKOFF_MIN {
            let initial = rand::thread_rng().gen_range(0.0..BACKOFF_INITIAL);
            tracing::warn!("websocket connect failed; reconnecting in {:.1} seconds", initial);
            tokio::time::sleep(Duration::from_secs_f64(initial)).await;
        } else {
            let whole = self.delay.floor() as u64;
            tracing::warn!("websocket connect failed again; retrying in {} seconds", whole);
            tokio::time::sleep(Duration::from_secs(whole)).await;
        }
        self.delay = next_delay(self.delay);
    }

    /// Current delay in seconds.
    pub fn delay(&self) -> f64 {
        self.delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
