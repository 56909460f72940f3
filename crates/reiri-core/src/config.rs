// ── Runtime connection configuration ──
//
// Describes how to reach one Reiri controller. Carries credentials and
// timing, never touches disk; the CLI (via reiri-config) builds one and
// hands it in.

use std::time::Duration;

use reiri_api::{ClientConfig, DEFAULT_PORT, DEFAULT_RECEIVE_TIMEOUT};
use secrecy::SecretString;

/// Default interval between background point-table refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for connecting to a single controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller IP address or hostname.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Per-receive deadline.
    pub timeout: Duration,
    /// How often to re-fetch the point table after setup. Zero disables.
    pub refresh_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: SecretString::from(String::new()),
            timeout: DEFAULT_RECEIVE_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl ControllerConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// The transport-level view of this configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .with_port(self.port)
        .with_receive_timeout(self.timeout)
    }
}
