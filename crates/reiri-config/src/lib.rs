//! Shared configuration for Reiri tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `reiri_core::ControllerConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reiri_core::{ControllerConfig, DEFAULT_REFRESH_INTERVAL};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "reiri";

/// Environment variable consulted for the password after `password_env`.
pub const PASSWORD_ENV: &str = "REIRI_PASSWORD";

/// Environment variable consulted when a profile has no username.
pub const USERNAME_ENV: &str = "REIRI_USERNAME";

/// Controller WebSocket port used when a profile does not set one.
pub use reiri_core::DEFAULT_PORT;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no {what} configured for profile '{profile}'")]
    NoCredentials { profile: String, what: &'static str },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Profile selected by `requested`, else `default_profile`, else "default".
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(String::from)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Receive timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

/// A named controller profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Controller IP address or hostname.
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override receive timeout (seconds).
    pub timeout: Option<u64>,

    /// Background refresh interval (seconds, 0 disables).
    pub refresh_interval: Option<u64>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            password_env: None,
            timeout: None,
            refresh_interval: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "reiri", "reiri").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("reiri");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment.
///
/// A missing file is not an error; defaults and environment still apply.
/// Environment keys nest on `__` (`REIRI_DEFAULTS__OUTPUT=json`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("REIRI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the username: profile, then `REIRI_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
            what: "username",
        })
}

/// Resolve the password from the credential chain.
///
/// Order: the profile's `password_env`, `REIRI_PASSWORD`, the system
/// keyring, plaintext in the profile.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Global env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        what: "password",
    })
}

/// Build a `ControllerConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no controller host"),
        });
    }

    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    Ok(ControllerConfig {
        host: profile.host.trim().to_owned(),
        port: profile.port,
        username,
        password,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        refresh_interval: profile
            .refresh_interval
            .map_or(DEFAULT_REFRESH_INTERVAL, Duration::from_secs),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    fn none(_: &str) -> Option<String> {
        None
    }

    fn profile_with_password() -> Profile {
        Profile {
            username: Some("admin".into()),
            password: Some("plain".into()),
            password_env: Some("MY_REIRI_PW".into()),
            ..Profile::new("10.0.0.5")
        }
    }

    fn resolved(
        env: impl Fn(&str) -> Option<String>,
        keyring: impl Fn(&str) -> Option<String>,
    ) -> String {
        resolve_password_with(&profile_with_password(), "home", env, keyring)
            .unwrap()
            .expose_secret()
            .to_owned()
    }

    #[test]
    fn password_chain_prefers_profile_env_var() {
        let env = |name: &str| match name {
            "MY_REIRI_PW" => Some("from-profile-env".to_owned()),
            "REIRI_PASSWORD" => Some("from-global-env".to_owned()),
            _ => None,
        };
        let keyring = |_: &str| Some("from-keyring".to_owned());
        assert_eq!(resolved(env, keyring), "from-profile-env");
    }

    #[test]
    fn password_chain_falls_through_in_order() {
        let global = |name: &str| (name == PASSWORD_ENV).then(|| "from-global-env".to_owned());
        let keyring = |profile: &str| (profile == "home").then(|| "from-keyring".to_owned());

        assert_eq!(resolved(global, keyring), "from-global-env");
        assert_eq!(resolved(none, keyring), "from-keyring");
        assert_eq!(resolved(none, none), "plain");
    }

    #[test]
    fn missing_password_is_reported() {
        let profile = Profile {
            username: Some("admin".into()),
            ..Profile::new("10.0.0.5")
        };
        let err = resolve_password_with(&profile, "home", none, none).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NoCredentials {
                what: "password",
                ..
            }
        ));
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
output = "json"

[profiles.home]
host = "192.168.1.20"
username = "admin"
timeout = 5

[profiles.office]
host = "10.0.0.5"
port = 52002
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.active_profile_name(None), "home");
        assert_eq!(config.active_profile_name(Some("office")), "office");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 10);

        let home = config.profile("home").unwrap();
        assert_eq!(home.port, 52001);
        assert_eq!(home.timeout, Some(5));
        assert_eq!(config.profile("office").unwrap().port, 52002);
        assert!(matches!(
            config.profile("lab"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                username: Some("admin".into()),
                password_env: Some("HOME_PW".into()),
                ..Profile::new("192.168.1.20")
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, config.profiles);
    }

    #[test]
    fn controller_config_requires_a_host() {
        let profile = Profile {
            username: Some("admin".into()),
            password: Some("pw".into()),
            ..Profile::new("  ")
        };
        let err = profile_to_controller_config(&profile, "home", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
    }

    #[test]
    fn profiles_default_to_the_client_port() {
        let profile = Profile {
            username: Some("admin".into()),
            password: Some("pw".into()),
            ..Profile::new("192.168.1.20")
        };
        let config = profile_to_controller_config(&profile, "home", &Defaults::default()).unwrap();
        assert_eq!(profile.port, client_default_port());
        assert_eq!(config.port, client_default_port());
    }

    fn client_default_port() -> u16 {
        reiri_core::ControllerConfig::new("h", "u", "p".to_owned()).port
    }
}
