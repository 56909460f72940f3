// reiri-core: typed domain layer between reiri-api and consumers (CLI, hosts).

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, MAX_FLAP_POSITION};
pub use config::{ControllerConfig, DEFAULT_REFRESH_INTERVAL};
pub use controller::{Controller, SnapshotReceiver};
pub use error::CoreError;
pub use model::{FanStep, Flap, HvacMode, Point, PointSnapshot, Power};

// Wire-level types consumers need alongside the typed view.
pub use reiri_api::{Attributes, ConnectionState, DEFAULT_PORT, PointTable, PointValue};
