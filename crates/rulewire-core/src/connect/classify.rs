//! Classify connection errors and decide retry behavior.

use super::error::ClientError;

/// Close code the controller uses to signal an internal error.
const CLOSE_CODE_INTERNAL_ERROR: u16 = 1011;

/// High-level classification of a connection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration (bad URL). Fatal before any attempt is made.
    Configuration,
    /// Transient transport failure, retried with backoff. `gated` failures
    /// (remote closes, malformed handshakes, connect timeouts) retry only
    /// when the flow tolerates remote closes.
    TransientTransport { gated: bool },
    /// Server rejected the upgrade with 403; recoverable once per attempt
    /// cycle by renewing the credential.
    AuthExpired,
    /// Remote closed with the internal-error code. Always fatal.
    RemoteFatal,
    /// Everything else: logged in full detail and fatal.
    Unclassified,
}

/// Decision for a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Propagate the error to the caller unchanged.
    Abort,
    /// Renew the credential and retry immediately, without a backoff wait.
    RefreshAndRetry,
    /// Wait out the backoff delay, then retry.
    RetryAfterBackoff,
}

/// Classify a connection error.
///
/// `Cancelled` never reaches this function; the manager short-circuits it
/// before classification.
pub fn classify(err: &ClientError) -> ErrorKind {
    match err {
        ClientError::InvalidUrl(_) => ErrorKind::Configuration,
        ClientError::Handshake(403) => ErrorKind::AuthExpired,
        ClientError::Refused(_) => ErrorKind::TransientTransport { gated: false },
        ClientError::Closed {
            code: Some(CLOSE_CODE_INTERNAL_ERROR),
            ..
        } => ErrorKind::RemoteFatal,
        ClientError::Closed { .. } => ErrorKind::TransientTransport { gated: true },
        ClientError::Timeout | ClientError::Protocol(_) => {
            ErrorKind::TransientTransport { gated: true }
        }
        _ => ErrorKind::Unclassified,
    }
}

/// Decide what to do with a classified failure.
///
/// `refresh_available` is true until the first credential renewal of the
/// current attempt cycle; it resets on every successful connect.
pub fn decide(kind: ErrorKind, retry_on_close: bool, refresh_available: bool) -> RetryDecision {
    match kind {
        ErrorKind::Configuration | ErrorKind::RemoteFatal | ErrorKind::Unclassified => {
            RetryDecision::Abort
        }
        ErrorKind::AuthExpired => {
            if refresh_available {
                RetryDecision::RefreshAndRetry
            } else {
                RetryDecision::Abort
            }
        }
        ErrorKind::TransientTransport { gated: false } => RetryDecision::RetryAfterBackoff,
        ErrorKind::TransientTransport { gated: true } => {
            if retry_on_close {
                RetryDecision::RetryAfterBackoff
            } else {
                RetryDecision::Abort
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_configuration() {
        assert_eq!(
            classify(&ClientError::InvalidUrl("x".into())),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn http_403_is_auth_expired_other_statuses_are_not() {
        assert_eq!(classify(&ClientError::Handshake(403)), ErrorKind::AuthExpired);
        assert_eq!(classify(&ClientError::Handshake(500)), ErrorKind::Unclassified);
        assert_eq!(classify(&ClientError::Handshake(404)), ErrorKind::Unclassified);
    }

    #[test]
    fn refused_retries_regardless_of_close_tolerance() {
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let kind = classify(&ClientError::Refused(io));
        assert_eq!(kind, ErrorKind::TransientTransport { gated: false });
        assert_eq!(decide(kind, false, true), RetryDecision::RetryAfterBackoff);
        assert_eq!(decide(kind, true, true), RetryDecision::RetryAfterBackoff);
    }

    #[test]
    fn internal_error_close_is_fatal_even_with_tolerance() {
        let kind = classify(&ClientError::Closed {
            code: Some(1011),
            reason: String::new(),
        });
        assert_eq!(kind, ErrorKind::RemoteFatal);
        assert_eq!(decide(kind, true, true), RetryDecision::Abort);
    }

    #[test]
    fn other_closes_are_gated_by_close_tolerance() {
        for code in [None, Some(1000), Some(1001), Some(4000)] {
            let kind = classify(&ClientError::Closed {
                code,
                reason: String::new(),
            });
            assert_eq!(kind, ErrorKind::TransientTransport { gated: true });
            assert_eq!(decide(kind, true, true), RetryDecision::RetryAfterBackoff);
            assert_eq!(decide(kind, false, true), RetryDecision::Abort);
        }
    }

    #[test]
    fn timeout_and_protocol_errors_are_gated() {
        for err in [ClientError::Timeout] {
            let kind = classify(&err);
            assert_eq!(kind, ErrorKind::TransientTransport { gated: true });
        }
    }

    #[test]
    fn auth_refresh_happens_at_most_once_per_cycle() {
        assert_eq!(
            decide(ErrorKind::AuthExpired, false, true),
            RetryDecision::RefreshAndRetry
        );
        assert_eq!(decide(ErrorKind::AuthExpired, false, false), RetryDecision::Abort);
    }

    #[test]
    fn unclassified_aborts() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(classify(&ClientError::Io(io)), ErrorKind::Unclassified);
        assert_eq!(decide(ErrorKind::Unclassified, true, true), RetryDecision::Abort);
    }
}
