// WebSocket transport for a single controller connection.
//
// Owns the socket and nothing else: raw text frames in and out, with a
// per-receive deadline. Framing, crypto and keyword matching live above.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message, error::ProtocolError};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open WebSocket to the controller.
///
/// After any close or socket failure the transport reports itself as not
/// open; the engine then rebuilds it rather than reusing it.
pub struct Transport {
    stream: WsStream,
    open: bool,
}

impl Transport {
    /// Open a WebSocket to `url`.
    pub async fn connect(url: &Url) -> Result<Self, Error> {
        debug!(url = %url, "connecting to controller");

        let (stream, _response) =
            tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| Error::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        debug!("WebSocket connected");
        Ok(Self { stream, open: true })
    }

    /// Whether the socket has not seen a close or failure.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Send one text frame.
    pub async fn send(&mut self, text: String) -> Result<(), Error> {
        if !self.open {
            return Err(Error::Closed {
                reason: "send on closed connection".into(),
            });
        }
        trace!(len = text.len(), "sending frame");
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| self.fail(e))
    }

    /// Wait up to `timeout` for the next text frame.
    ///
    /// Control and binary frames are skipped without resetting the deadline.
    /// A timeout leaves the connection open; a close does not.
    pub async fn receive(&mut self, timeout: Duration) -> Result<String, Error> {
        if !self.open {
            return Err(Error::Closed {
                reason: "receive on closed connection".into(),
            });
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .map_err(|_| Error::Timeout { timeout })?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "received frame");
                    return Ok(text.to_string());
                }
                Some(Ok(Message::Close(frame))) => {
                    self.open = false;
                    let reason = frame.map_or_else(
                        || "close frame (no payload)".to_owned(),
                        |cf| format!("close frame {}: {}", cf.code, cf.reason),
                    );
                    debug!(%reason, "controller closed the connection");
                    return Err(Error::Closed { reason });
                }
                Some(Ok(_)) => {
                    // Ping/Pong/Binary -- tungstenite answers pings itself
                }
                Some(Err(e)) => return Err(self.fail(e)),
                None => {
                    self.open = false;
                    return Err(Error::Closed {
                        reason: "stream ended".into(),
                    });
                }
            }
        }
    }

    /// Close the socket. Idempotent; errors are swallowed.
    pub async fn close(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.stream.close(None).await {
                trace!(error = %e, "ignoring error while closing");
            }
        }
    }

    /// Mark the transport dead and classify the socket error.
    fn fail(&mut self, err: tungstenite::Error) -> Error {
        self.open = false;
        classify(err)
    }
}

/// Map a tungstenite error to `Closed` (peer went away) or `Transport`.
pub(crate) fn classify(err: tungstenite::Error) -> Error {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => Error::Closed {
            reason: err.to_string(),
        },
        tungstenite::Error::Protocol(
            ProtocolError::ResetWithoutClosingHandshake | ProtocolError::SendAfterClosing,
        ) => Error::Closed {
            reason: err.to_string(),
        },
        tungstenite::Error::Io(ref io_err) if is_disconnect(io_err.kind()) => Error::Closed {
            reason: err.to_string(),
        },
        other => Error::Transport(other.to_string()),
    }
}

fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}
