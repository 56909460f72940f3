//! CLI configuration -- thin wrapper around `reiri_config` shared types.
//!
//! Adds the resolution step that layers `GlobalOpts` flag overrides
//! (--host, --port, --username, --timeout) on top of the active profile.

use reiri_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use reiri_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--host` alone is enough: username and
/// password then come from `REIRI_USERNAME` / `REIRI_PASSWORD` or the
/// keyring entry of the requested profile name.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None => {
            if global.profile.is_some() && global.host.is_none() {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(&cfg),
                });
            }
            let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile::new(host)
        }
    };

    let profile = apply_overrides(base, global);
    let controller =
        reiri_config::profile_to_controller_config(&profile, &profile_name, &cfg.defaults)?;
    tracing::debug!(
        profile = %profile_name,
        host = %controller.host,
        port = controller.port,
        "resolved controller config"
    );
    Ok(controller)
}

/// Flags win over profile values.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
