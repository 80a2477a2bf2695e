// ── Point identity, metadata, and values ──

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DeviceType;

/// Placeholder rendered for a point with no known value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Server-assigned point identifier. Unique across the whole topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub i64);

impl PointId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for PointId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A point as listed under its device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub id: PointId,
    pub display_name: String,
    pub engineering_name: String,
}

/// Everything known about a point, looked up by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointMetadata {
    pub display_name: String,
    pub engineering_name: String,
    /// Group key exactly as the server sent it (e.g. `d_bms`).
    pub device_type: String,
    /// Parsed form of `device_type`; `None` for types outside the known set.
    #[serde(skip)]
    pub kind: Option<DeviceType>,
    pub device_name: String,
    pub table_name: String,
}

/// Latest value of a point. The server's value is opaque: numbers and
/// strings are both common and neither is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PointValue {
    Number(serde_json::Number),
    Text(String),
    /// No value received yet, or the server reported none.
    #[default]
    Unavailable,
}

impl From<Option<serde_json::Value>> for PointValue {
    fn from(value: Option<serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::Unavailable,
            Some(serde_json::Value::Number(n)) => Self::Number(n),
            Some(serde_json::Value::String(s)) => Self::Text(s),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => n.fmt(f),
            Self::Text(s) => f.write_str(s),
            Self::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for PointValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => n.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Unavailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}
