// ── Devices and device groups ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::point::{Point, PointId};

/// Known device categories, in canonical display order.
///
/// The wire form (`d_bms`, `d_pcs`, ...) is the menu's group key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
pub enum DeviceType {
    #[serde(rename = "d_bms")]
    #[strum(serialize = "d_bms")]
    Bms,
    #[serde(rename = "d_pcs")]
    #[strum(serialize = "d_pcs")]
    Pcs,
    #[serde(rename = "d_grid")]
    #[strum(serialize = "d_grid")]
    Grid,
    #[serde(rename = "d_air_condition")]
    #[strum(serialize = "d_air_condition")]
    AirCondition,
}

impl DeviceType {
    /// Parse a menu group key; `None` for anything outside the known set.
    pub fn from_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }

    /// Short human label used in section headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bms => "BMS",
            Self::Pcs => "PCS",
            Self::Grid => "Grid",
            Self::AirCondition => "Air conditioning",
        }
    }
}

/// One physical device and its points, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub display_name: String,
    pub engineering_name: String,
    pub table_name: String,
    pub points: Vec<Point>,
}

impl Device {
    /// Identifier used to address the device: its first point's id.
    /// Devices without points cannot be addressed.
    pub fn id(&self) -> Option<PointId> {
        self.points.first().map(|p| p.id)
    }

    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.iter().map(|p| p.id)
    }
}

/// All devices of one type, as listed in the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceGroup {
    /// Group key exactly as received.
    pub type_name: String,
    #[serde(skip)]
    pub kind: Option<DeviceType>,
    pub devices: Vec<Device>,
}

impl DeviceGroup {
    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.devices.iter().flat_map(Device::point_ids)
    }
}
