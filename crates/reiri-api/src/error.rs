use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `reiri-api` crate.
///
/// Covers every failure mode of a controller session: socket setup and
/// teardown, the RSA key exchange, the AES envelope codec, and login.
/// `reiri-core` maps these into host-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// WebSocket connection could not be established.
    #[error("Cannot connect to controller at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Socket-level failure while sending or receiving.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// Connection dropped mid-exchange (close frame, reset, broken pipe).
    #[error("Connection closed by controller: {reason}")]
    Closed { reason: String },

    /// No matching frame arrived within the receive deadline.
    #[error("No reply from controller within {timeout:?}")]
    Timeout { timeout: Duration },

    /// Controller URL could not be built from host and port.
    #[error("Invalid controller URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Session ─────────────────────────────────────────────────────
    /// Key exchange did not complete (no common key before the deadline).
    #[error("Handshake failed: {reason}")]
    Handshake { reason: String },

    /// Key generation, RSA-OAEP unwrap, or AES decrypt/padding failure.
    /// Implies the session key is wrong; never retried in place.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Controller rejected the username/password.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Operation needs a session that has completed the handshake.
    #[error("Not connected -- call connect() first")]
    NotConnected,

    /// Transparent reconnection (close → connect → handshake → login) failed.
    #[error("Reconnection failed: {source}")]
    Reconnect {
        #[source]
        source: Box<Error>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// Reply frame or decrypted body was not the expected JSON shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A frame carrying the expected keyword arrived unencrypted.
    #[error("Unexpected unencrypted '{keyword}' reply from controller")]
    UnexpectedReply { keyword: String },
}

impl Error {
    /// The innermost error, looking through [`Reconnect`](Self::Reconnect).
    pub fn root(&self) -> &Error {
        match self {
            Self::Reconnect { source } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if an established socket dropped, so a fresh
    /// connection may succeed. Drives the reconnect-and-retry-once policy.
    /// A failed connect does not count.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self.root(), Self::Transport(_) | Self::Closed { .. })
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        self.is_connection_lost()
            || matches!(
                self.root(),
                Self::Connect { .. }
                    | Self::Timeout { .. }
                    | Self::Handshake { .. }
                    | Self::NotConnected
            )
    }

    /// Returns `true` if the controller rejected the credentials.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self.root(), Self::Authentication { .. })
    }
}
