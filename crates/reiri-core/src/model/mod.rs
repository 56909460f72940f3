// ── Typed domain model ──
//
// The controller's point table is loosely typed; these types give names to
// the attributes an air-conditioning point carries while leaving unknown
// keys reachable through `Point::attributes`.

pub mod hvac;
pub mod point;

pub use hvac::{FanStep, Flap, HvacMode, Power};
pub use point::{Point, PointSnapshot};
