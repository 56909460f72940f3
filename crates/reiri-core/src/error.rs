// ── Core error types ──
//
// Host-facing errors from reiri-core. Consumers see whether to retry later
// or ask for new credentials, never raw socket or cipher failures. The
// `From<reiri_api::Error>` impl does the translation.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// Controller unreachable or not answering the key exchange. Retry later.
    #[error("Controller not ready: {reason}")]
    NotReady { reason: String },

    /// Controller reachable but rejected the username/password.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Controller did not answer within {timeout:?}")]
    Timeout { timeout: Duration },

    /// Connection dropped and the single retry failed too.
    #[error("Connection to controller lost: {reason}")]
    ConnectionLost { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Point not found: {id}")]
    PointNotFound { id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for conditions a host should retry later rather
    /// than surface as a permanent failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. } | Self::Timeout { .. } | Self::ConnectionLost { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<reiri_api::Error> for CoreError {
    fn from(err: reiri_api::Error) -> Self {
        use reiri_api::Error as Api;

        match err {
            Api::Connect { url, reason } => CoreError::NotReady {
                reason: format!("cannot connect to {url}: {reason}"),
            },
            Api::Handshake { reason } => CoreError::NotReady {
                reason: format!("key exchange failed: {reason}"),
            },
            Api::NotConnected => CoreError::NotReady {
                reason: "no connection established".into(),
            },
            Api::Transport(reason) | Api::Closed { reason } => {
                CoreError::ConnectionLost { reason }
            }
            Api::Timeout { timeout } => CoreError::Timeout { timeout },
            Api::Authentication { message } => CoreError::InvalidCredentials { message },
            Api::Reconnect { source } => CoreError::from(*source),
            Api::Crypto(message) => CoreError::Protocol {
                message: format!("session key mismatch: {message}"),
            },
            Api::Deserialization { message, body: _ } => CoreError::Protocol { message },
            Api::UnexpectedReply { keyword } => CoreError::Protocol {
                message: format!("controller answered '{keyword}' unencrypted"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid controller address: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_failures_are_classified_by_their_cause() {
        let auth = CoreError::from(reiri_api::Error::Reconnect {
            source: Box::new(reiri_api::Error::Authentication {
                message: "rejected".into(),
            }),
        });
        assert!(matches!(auth, CoreError::InvalidCredentials { .. }));
        assert!(!auth.is_transient());

        let refused = CoreError::from(reiri_api::Error::Reconnect {
            source: Box::new(reiri_api::Error::Connect {
                url: "ws://10.0.0.5:52001/".into(),
                reason: "refused".into(),
            }),
        });
        assert!(matches!(refused, CoreError::NotReady { .. }));
        assert!(refused.is_transient());
    }

    #[test]
    fn dropped_sockets_and_timeouts_are_transient() {
        let closed = CoreError::from(reiri_api::Error::Closed {
            reason: "reset".into(),
        });
        assert!(matches!(closed, CoreError::ConnectionLost { .. }));
        assert!(closed.is_transient());

        let timeout = CoreError::from(reiri_api::Error::Timeout {
            timeout: Duration::from_millis(300),
        });
        assert_eq!(timeout.to_string(), "Controller did not answer within 300ms");
        assert!(timeout.is_transient());
    }

    #[test]
    fn cipher_failures_are_protocol_errors() {
        let err = CoreError::from(reiri_api::Error::Crypto("bad padding".into()));
        assert!(matches!(err, CoreError::Protocol { .. }));
        assert!(!err.is_transient());
    }
}
