// ── Controller abstraction ──
//
// Lifecycle for one Reiri controller: setup with the not-ready versus
// bad-credentials distinction hosts need, typed reads and writes, and an
// optional background refresh that publishes point snapshots.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reiri_api::{ConnectionState, PointTable, ReiriClient};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{Point, PointSnapshot};

const CREDENTIALS_REJECTED: &str = "controller rejected the username or password";

/// Latest published snapshot; `None` until the first successful fetch.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<PointSnapshot>>>;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. All clones share one
/// client, so calls from any clone are serialized on one connection.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: ReiriClient,
    snapshot: watch::Sender<Option<Arc<PointSnapshot>>>,
    refresh: Mutex<Option<RefreshTask>>,
}

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Controller {
    /// Create a controller. Does NOT connect -- call [`setup()`](Self::setup).
    pub fn new(config: ControllerConfig) -> Self {
        let client = ReiriClient::new(config.client_config());
        let (snapshot, _) = watch::channel(None);
        Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                snapshot,
                refresh: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.client.state().await
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect, log in, load the point table and start background refresh.
    ///
    /// Fails with [`CoreError::NotReady`] when the controller cannot be
    /// reached or the exchange breaks down (retry later), and with
    /// [`CoreError::InvalidCredentials`] when it answers but refuses the
    /// login (ask for new credentials).
    pub async fn setup(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        info!(host = %config.host, port = config.port, "connecting to controller");

        if let Err(e) = self.inner.client.connect().await {
            warn!(error = %e, "controller not reachable");
            return Err(not_ready(&e));
        }

        match self.inner.client.login().await {
            Ok(true) => debug!("login accepted"),
            Ok(false) => {
                self.inner.client.close().await;
                return Err(CoreError::InvalidCredentials {
                    message: CREDENTIALS_REJECTED.into(),
                });
            }
            Err(e) => {
                warn!(error = %e, "login exchange failed");
                self.inner.client.close().await;
                return Err(not_ready(&e));
            }
        }

        // Initial data load; a controller that cannot serve its point
        // table yet is not ready.
        let snapshot = match self.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "initial point list failed");
                self.inner.client.close().await;
                return Err(CoreError::NotReady {
                    reason: format!("initial point list failed: {e}"),
                });
            }
        };
        info!(points = snapshot.len(), "controller ready");

        self.start_refresh().await;
        Ok(())
    }

    /// Check credentials without keeping a connection.
    ///
    /// Any failure before login is [`CoreError::NotReady`]; a rejected or
    /// failed login is [`CoreError::InvalidCredentials`]. The probe
    /// connection is always closed.
    pub async fn validate_credentials(config: &ControllerConfig) -> Result<(), CoreError> {
        let client = ReiriClient::new(config.client_config());

        if let Err(e) = client.connect().await {
            warn!(host = %config.host, error = %e, "credential check: controller not reachable");
            return Err(not_ready(&e));
        }

        let result = match client.login().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CoreError::InvalidCredentials {
                message: CREDENTIALS_REJECTED.into(),
            }),
            Err(e) => {
                warn!(error = %e, "credential check: login exchange failed");
                Err(CoreError::InvalidCredentials {
                    message: format!("login failed: {e}"),
                })
            }
        };

        client.close().await;
        result
    }

    /// Stop background refresh and close the connection.
    pub async fn shutdown(&self) {
        self.stop_refresh().await;
        self.inner.client.close().await;
        debug!("controller shut down");
    }

    /// Setup, run `f`, shut down. Background refresh is disabled.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval = Duration::ZERO;

        let controller = Controller::new(cfg);
        controller.setup().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Fetch the point table now and publish it to subscribers.
    pub async fn snapshot(&self) -> Result<PointSnapshot, CoreError> {
        let snapshot = self.refresh().await?;
        Ok(PointSnapshot::clone(&snapshot))
    }

    /// Fetch one point by id.
    pub async fn point(&self, id: &str) -> Result<Point, CoreError> {
        let snapshot = self.refresh().await?;
        snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::PointNotFound { id: id.to_owned() })
    }

    /// Last published snapshot, without a controller round-trip.
    pub fn latest(&self) -> Option<Arc<PointSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Last published snapshot, or [`CoreError::NotReady`] before setup.
    pub fn current(&self) -> Result<Arc<PointSnapshot>, CoreError> {
        self.latest().ok_or_else(|| CoreError::NotReady {
            reason: "no point table loaded yet".into(),
        })
    }

    /// Look up one point in the last published snapshot.
    pub fn cached_point(&self, id: &str) -> Result<Point, CoreError> {
        self.current()?
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::PointNotFound { id: id.to_owned() })
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.inner.snapshot.subscribe()
    }

    async fn refresh(&self) -> Result<Arc<PointSnapshot>, CoreError> {
        let table = self.inner.client.get_point_list().await?;
        let snapshot = Arc::new(PointSnapshot::new(table, Utc::now()));
        debug!(points = snapshot.len(), "point table refreshed");
        self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Execute a typed command and return the controller's reply.
    pub async fn execute(&self, command: Command) -> Result<serde_json::Value, CoreError> {
        let point = command.point().map(str::to_owned);
        let table = command.into_table()?;
        debug!(point = ?point, "executing command");
        self.operate(&table).await
    }

    /// Send an operate table as-is.
    ///
    /// The controller applies changes with a delay, so no refresh follows.
    pub async fn operate(&self, table: &PointTable) -> Result<serde_json::Value, CoreError> {
        Ok(self.inner.client.operate(table).await?)
    }

    // ── Background refresh ───────────────────────────────────────

    async fn start_refresh(&self) {
        let interval = self.inner.config.refresh_interval;
        if interval.is_zero() {
            return;
        }

        let mut slot = self.inner.refresh.lock().await;
        if let Some(task) = slot.take() {
            task.cancel.cancel();
            task.handle.abort();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(refresh_task(self.clone(), interval, cancel.clone()));
        *slot = Some(RefreshTask { cancel, handle });
        debug!(interval_secs = interval.as_secs(), "background refresh started");
    }

    async fn stop_refresh(&self) {
        let task = self.inner.refresh.lock().await.take();
        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
    }
}

fn not_ready(err: &reiri_api::Error) -> CoreError {
    CoreError::NotReady {
        reason: err.to_string(),
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically re-fetch the point table.
async fn refresh_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
