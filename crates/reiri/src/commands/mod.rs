//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod login;
pub mod op;
pub mod points;
pub mod set;
pub mod util;
