// Wire data model: point tables and loosely-typed attribute values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Attribute name → value for a single point.
pub type Attributes = BTreeMap<String, PointValue>;

/// Point identifier → attributes.
///
/// Returned wholesale by the point-list query and also the shape of an
/// operate command (only the attributes being changed).
pub type PointTable = BTreeMap<String, Attributes>;

/// One attribute value as the controller sends it.
///
/// The set of keys varies by unit and mode, so values stay dynamically
/// typed; anything unrecognized round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<PointValue>),
    Map(BTreeMap<String, PointValue>),
}

impl PointValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PointValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Numeric value, accepting numbers sent as strings (`"24"`, `"22.5"`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Loose truthiness for capability flags (`true`, non-zero, non-empty).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }
}

impl From<&str> for PointValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PointValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PointValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PointValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u8> for PointValue {
    fn from(value: u8) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for PointValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Where a client stands in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, or the socket has closed.
    Disconnected,
    /// Socket open and common key negotiated, not logged in.
    Connected,
    /// Logged in; commands may be issued.
    Authenticated,
}
