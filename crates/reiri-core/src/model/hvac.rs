// ── Air-conditioner vocabulary ──
//
// Each type maps between a readable name (CLI, JSON output) and the short
// code the controller uses on the wire.

use std::fmt;
use std::str::FromStr;

use reiri_api::PointValue;
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;

/// Unit power state (`stat`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub const fn code(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        by_code(code, Self::code)
    }
}

/// Operating mode (`mode`).
///
/// Parses from either the readable name or the wire code (`cool`, `C`).
/// Variant order is the order modes are listed in capability output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum HvacMode {
    #[strum(to_string = "cool", serialize = "C")]
    Cool,
    #[strum(to_string = "heat", serialize = "H")]
    Heat,
    #[strum(to_string = "fan", serialize = "F")]
    Fan,
    #[strum(to_string = "dry", serialize = "D")]
    Dry,
    #[strum(to_string = "auto", serialize = "A")]
    Auto,
}

impl HvacMode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Cool => "C",
            Self::Heat => "H",
            Self::Fan => "F",
            Self::Dry => "D",
            Self::Auto => "A",
        }
    }

    /// Strict wire-code lookup; readable names are not accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        by_code(code, Self::code)
    }
}

/// Fan speed (`fanstep`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum FanStep {
    #[strum(to_string = "auto", serialize = "A")]
    Auto,
    #[strum(to_string = "low", serialize = "L")]
    Low,
    #[strum(to_string = "medium-low", serialize = "LM")]
    MediumLow,
    #[strum(to_string = "medium", serialize = "M")]
    Medium,
    #[strum(to_string = "medium-high", serialize = "MH")]
    MediumHigh,
    #[strum(to_string = "high", serialize = "H")]
    High,
}

impl FanStep {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Auto => "A",
            Self::Low => "L",
            Self::MediumLow => "LM",
            Self::Medium => "M",
            Self::MediumHigh => "MH",
            Self::High => "H",
        }
    }

    /// Strict wire-code lookup.
    pub fn from_code(code: &str) -> Option<Self> {
        by_code(code, Self::code)
    }
}

/// Exact, case-sensitive match against each variant's wire code.
fn by_code<T: IntoEnumIterator + Copy>(code: &str, code_of: fn(T) -> &'static str) -> Option<T> {
    T::iter().find(|v| code_of(*v) == code)
}

/// Louver setting (`flap`): continuous swing or a fixed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flap {
    Swing,
    Position(u8),
}

impl Flap {
    /// Wire form: `"S"` for swing, a bare integer for a position.
    pub fn to_value(self) -> PointValue {
        match self {
            Self::Swing => PointValue::from("S"),
            Self::Position(n) => PointValue::from(n),
        }
    }

    pub fn from_value(value: &PointValue) -> Option<Self> {
        if value.as_str() == Some("S") {
            return Some(Self::Swing);
        }
        value
            .as_i64()
            .and_then(|n| u8::try_from(n).ok())
            .map(Self::Position)
    }
}

impl fmt::Display for Flap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swing => f.write_str("swing"),
            Self::Position(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Flap {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("swing") || s.eq_ignore_ascii_case("s") {
            return Ok(Self::Swing);
        }
        s.parse::<u8>()
            .map(Self::Position)
            .map_err(|_| CoreError::Validation {
                message: format!("flap must be 'swing' or a position number, got '{s}'"),
            })
    }
}

impl Serialize for Flap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
