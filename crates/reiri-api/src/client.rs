// Host-facing controller client.
//
// One connection, one lock. Every public call takes the lock for its whole
// ensure-connected + send + receive cycle, so at most one request is in
// flight and replies can be matched by keyword alone. Reconnection happens
// inside that critical section, never in the background.

use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::frame;
use crate::model::{ConnectionState, PointTable};
use crate::session::{Request, Session};

/// Default controller WebSocket port.
pub const DEFAULT_PORT: u16 = 52001;

/// Default per-receive deadline.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings and credentials, fixed for the client's lifetime.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// How long a single receive may wait for the controller.
    pub receive_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// `ws://<host>:<port>/`
    pub fn url(&self) -> Result<Url, Error> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(Url::parse(&format!("ws://{host}:{}/", self.port))?)
    }
}

/// Async client for a Reiri controller.
///
/// Safe to share between tasks (wrap in `Arc`); concurrent calls queue on
/// an internal lock.
pub struct ReiriClient {
    config: ClientConfig,
    session: Mutex<Option<Session>>,
}

impl ReiriClient {
    /// Create a client. Does not connect.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current position in the connection lifecycle.
    pub async fn state(&self) -> ConnectionState {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(ConnectionState::Disconnected, Session::state)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open a fresh connection and run the key exchange.
    ///
    /// Any existing connection is closed first.
    pub async fn connect(&self) -> Result<(), Error> {
        let mut slot = self.session.lock().await;
        close_slot(&mut slot).await;
        *slot = Some(self.open_session().await?);
        Ok(())
    }

    /// Log in on the current connection.
    ///
    /// Returns `Ok(false)` when the controller rejects the credentials so
    /// the caller can decide whether to abort setup.
    pub async fn login(&self) -> Result<bool, Error> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(Error::NotConnected)?;
        session
            .login(&self.config.username, &self.config.password)
            .await
    }

    /// Close the connection. Idempotent.
    pub async fn close(&self) {
        let mut slot = self.session.lock().await;
        close_slot(&mut slot).await;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Fetch the full point table.
    pub async fn get_point_list(&self) -> Result<PointTable, Error> {
        let body = self.call(Request::PointList).await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("point list: {e}"),
            body,
        })
    }

    /// Submit an operate command and return the controller's acknowledgement.
    pub async fn operate(&self, command: &PointTable) -> Result<serde_json::Value, Error> {
        let body = frame::compact(command)?;
        debug!(points = command.len(), "submitting operate command");
        let reply = self.call(Request::Operate(body)).await?;
        info!(reply = %reply, "operate acknowledged");
        serde_json::from_str(&reply).map_err(|e| Error::Deserialization {
            message: format!("operate reply: {e}"),
            body: reply,
        })
    }

    // ── Engine ───────────────────────────────────────────────────────

    /// Run `request` under the lock, reconnecting and retrying exactly once
    /// if the connection turns out to be gone.
    async fn call(&self, request: Request) -> Result<String, Error> {
        let mut slot = self.session.lock().await;

        let result = match self.attempt(&mut slot, &request).await {
            Err(e) if e.is_connection_lost() => {
                warn!(
                    error = %e,
                    request = ?request,
                    "connection lost, reconnecting and retrying once"
                );
                close_slot(&mut slot).await;
                self.attempt(&mut slot, &request).await
            }
            other => other,
        };

        // A key mismatch poisons the session; the next call re-handshakes.
        if let Err(Error::Crypto(_)) = &result {
            close_slot(&mut slot).await;
        }
        result
    }

    async fn attempt(
        &self,
        slot: &mut Option<Session>,
        request: &Request,
    ) -> Result<String, Error> {
        let session = self.ensure_connected(slot).await?;
        session.run(request).await
    }

    /// Reuse the open session, or rebuild close → connect → handshake → login.
    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<Session>,
    ) -> Result<&'a mut Session, Error> {
        let reusable = slot.as_ref().is_some_and(Session::is_open);
        if !reusable {
            info!("connection lost or not established, reconnecting");
            close_slot(slot).await;
            let session = self.reconnect().await.map_err(|e| {
                warn!(error = %e, "reconnection failed");
                Error::Reconnect {
                    source: Box::new(e),
                }
            })?;
            *slot = Some(session);
        }
        slot.as_mut().ok_or(Error::NotConnected)
    }

    async fn reconnect(&self) -> Result<Session, Error> {
        let mut session = self.open_session().await?;
        match session
            .login(&self.config.username, &self.config.password)
            .await
        {
            Ok(true) => Ok(session),
            Ok(false) => {
                session.close().await;
                Err(Error::Authentication {
                    message: "login rejected during reconnection".into(),
                })
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    async fn open_session(&self) -> Result<Session, Error> {
        let url = self.config.url()?;
        Session::open(&url, self.config.receive_timeout).await
    }
}

async fn close_slot(slot: &mut Option<Session>) {
    if let Some(mut session) = slot.take() {
        session.close().await;
    }
}
