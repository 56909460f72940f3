// ── Command API ──
//
// Every write to the controller is an operate envelope: a point table
// holding only the attributes to change. `Command` gives the common edits
// a typed form and produces that table.

use reiri_api::{Attributes, PointTable, PointValue};

use crate::error::CoreError;
use crate::model::{FanStep, Flap, HvacMode, Power};

/// Highest fixed flap position a unit accepts.
pub const MAX_FLAP_POSITION: u8 = 4;

/// A write operation against one point, or a raw operate table.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPower { point: String, power: Power },
    /// Switching mode also switches the unit on.
    SetMode { point: String, mode: HvacMode },
    SetSetpoint { point: String, celsius: f64 },
    SetFanStep { point: String, step: FanStep },
    SetFlap { point: String, flap: Flap },
    /// Sent as given, after a non-empty check.
    Raw(PointTable),
}

impl Command {
    /// The targeted point, for single-point commands.
    pub fn point(&self) -> Option<&str> {
        match self {
            Self::SetPower { point, .. }
            | Self::SetMode { point, .. }
            | Self::SetSetpoint { point, .. }
            | Self::SetFanStep { point, .. }
            | Self::SetFlap { point, .. } => Some(point),
            Self::Raw(_) => None,
        }
    }

    /// Build the operate table for this command.
    pub fn into_table(self) -> Result<PointTable, CoreError> {
        let (point, attributes) = match self {
            Self::Raw(table) => {
                if table.is_empty() || table.values().any(Attributes::is_empty) {
                    return Err(CoreError::Validation {
                        message: "operate table must name at least one attribute per point"
                            .into(),
                    });
                }
                return Ok(table);
            }
            Self::SetPower { point, power } => (point, attrs([("stat", power.code().into())])),
            Self::SetMode { point, mode } => (
                point,
                attrs([("stat", Power::On.code().into()), ("mode", mode.code().into())]),
            ),
            Self::SetSetpoint { point, celsius } => {
                if !celsius.is_finite() {
                    return Err(CoreError::Validation {
                        message: format!("setpoint must be a finite number, got {celsius}"),
                    });
                }
                (point, attrs([("sp", celsius.into())]))
            }
            Self::SetFanStep { point, step } => (point, attrs([("fanstep", step.code().into())])),
            Self::SetFlap { point, flap } => {
                if let Flap::Position(n) = flap {
                    if n > MAX_FLAP_POSITION {
                        return Err(CoreError::Validation {
                            message: format!(
                                "flap position must be 0-{MAX_FLAP_POSITION}, got {n}"
                            ),
                        });
                    }
                }
                (point, attrs([("flap", flap.to_value())]))
            }
        };

        if point.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "point id must not be empty".into(),
            });
        }
        Ok(PointTable::from([(point, attributes)]))
    }

    /// Merge several commands into one operate table.
    ///
    /// Later commands win when two set the same attribute on the same point.
    pub fn batch(commands: impl IntoIterator<Item = Command>) -> Result<PointTable, CoreError> {
        let mut merged = PointTable::new();
        for command in commands {
            for (point, attributes) in command.into_table()? {
                merged.entry(point).or_default().extend(attributes);
            }
        }
        if merged.is_empty() {
            return Err(CoreError::Validation {
                message: "no changes requested".into(),
            });
        }
        Ok(merged)
    }
}

fn attrs<const N: usize>(pairs: [(&str, PointValue); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
