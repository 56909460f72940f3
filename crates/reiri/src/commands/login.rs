//! `reiri login`: check credentials without keeping a connection.

use reiri_core::{Controller, ControllerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub async fn handle(config: &ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    Controller::validate_credentials(config).await?;
    util::status(
        global.quiet,
        &format!(
            "✓ Logged in to {}:{} as {}",
            config.host, config.port, config.username
        ),
    );
    Ok(())
}
