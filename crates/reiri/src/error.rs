//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a distinct exit code per failure class.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use reiri_config::ConfigError;
use reiri_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Controller not ready: {reason}")]
    #[diagnostic(
        code(reiri::not_ready),
        help(
            "Check that the controller is powered on and reachable.\n\
             The WebSocket port defaults to 52001; override with --port."
        )
    )]
    NotReady { reason: String },

    #[error("Connection to controller lost: {reason}")]
    #[diagnostic(
        code(reiri::connection_lost),
        help("The connection dropped twice in a row. Try again shortly.")
    )]
    ConnectionLost { reason: String },

    #[error("Controller did not answer within {timeout:?}")]
    #[diagnostic(
        code(reiri::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.")
    )]
    Timeout { timeout: Duration },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(reiri::auth_failed),
        help(
            "Verify the username and password.\n\
             Run: reiri config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No {what} configured for profile '{profile}'")]
    #[diagnostic(
        code(reiri::no_credentials),
        help(
            "Configure credentials with: reiri config init\n\
             Or set REIRI_USERNAME / REIRI_PASSWORD."
        )
    )]
    NoCredentials { profile: String, what: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Point '{id}' not found")]
    #[diagnostic(
        code(reiri::not_found),
        help("Run: reiri points list to see available points")
    )]
    PointNotFound { id: String },

    // ── Controller replies ───────────────────────────────────────────
    #[error("Protocol error: {message}")]
    #[diagnostic(code(reiri::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(reiri::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(reiri::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: reiri config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(reiri::no_config),
        help(
            "Create a profile with: reiri config init\n\
             Expected at: {path}\n\
             Or pass --host (REIRI_HOST) with REIRI_USERNAME / REIRI_PASSWORD."
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(reiri::config))]
    Config { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(reiri::keyring),
        help("Store the password in the profile or REIRI_PASSWORD instead.")
    )]
    Keyring { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(reiri::json), help("Check the JSON contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(reiri::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(reiri::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotReady { .. } | Self::ConnectionLost { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::PointNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotReady { reason } => CliError::NotReady { reason },
            CoreError::InvalidCredentials { message } => CliError::AuthFailed { message },
            CoreError::Timeout { timeout } => CliError::Timeout { timeout },
            CoreError::ConnectionLost { reason } => CliError::ConnectionLost { reason },
            CoreError::Protocol { message } => CliError::Protocol { message },
            CoreError::PointNotFound { id } => CliError::PointNotFound { id },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(unknown)".into(),
            },
            ConfigError::NoCredentials { profile, what } => CliError::NoCredentials {
                profile,
                what: what.into(),
            },
            ConfigError::Keyring(message) => CliError::Keyring { message },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
        }
    }
}
