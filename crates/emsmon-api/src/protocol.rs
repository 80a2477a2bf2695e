//! Message codec for the menu / rtv protocol.
//!
//! Every frame is a JSON object with a `func` discriminator. Inbound
//! frames carry a `data` payload whose shape depends on `func`; outbound
//! frames are subscription requests.
//!
//! ```text
//! client → server   {"func":"menu"}
//! server → client   {"func":"menu","data":{"d_bms":[{"chnName":..,"rtvList":[..]}]}}
//! client → server   {"func":"rtv","ids":[101,102],"period":5}
//! server → client   {"func":"rtv","data":[{"id":101,"value":"3.3"}]}
//! ```
//!
//! Decoding is pure: no logging, no side effects.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

/// Longest prefix of a raw frame that is worth putting in a log line.
pub const FRAME_PREVIEW_CHARS: usize = 100;

// ── Inbound ─────────────────────────────────────────────────────────

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Full device/point topology.
    Menu(MenuPayload),
    /// A batch of point value updates.
    Rtv(Vec<RtvEntry>),
}

/// `data` of a menu frame: device type name → devices, in server order.
///
/// Device types outside the known set are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuPayload {
    pub groups: IndexMap<String, Vec<MenuDevice>>,
}

impl MenuPayload {
    /// Total number of points across every device of every group.
    pub fn point_count(&self) -> usize {
        self.groups
            .values()
            .flatten()
            .map(|device| device.rtv_list.len())
            .sum()
    }
}

/// One device inside a menu group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDevice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub chn_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub eng_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rtv_list: Vec<MenuPoint>,
}

/// One measurable point inside a device's `rtvList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPoint {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_chn_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_eng_name: String,
}

/// One `{id, value}` pair of an rtv frame.
///
/// `value` is opaque: the server sends strings or numbers. `None` means
/// the entry had no value (missing or `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtvEntry {
    pub id: i64,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Decode one text frame.
///
/// A missing or `null` `data` decodes as an empty payload.
pub fn decode(text: &str) -> Result<Inbound, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    let serde_json::Value::Object(mut frame) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let func = frame.remove("func");
    let data = frame.remove("data").filter(|data| !data.is_null());

    match func.as_ref().and_then(serde_json::Value::as_str) {
        Some("menu") => {
            let payload = match data {
                Some(data) => serde_json::from_value(data)
                    .map_err(|source| DecodeError::Schema { func: "menu", source })?,
                None => MenuPayload::default(),
            };
            Ok(Inbound::Menu(payload))
        }
        Some("rtv") => {
            let entries = match data {
                Some(data) => serde_json::from_value(data)
                    .map_err(|source| DecodeError::Schema { func: "rtv", source })?,
                None => Vec::new(),
            };
            Ok(Inbound::Rtv(entries))
        }
        _ => Err(DecodeError::UnknownMessageType(func.map(|func| match func {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }))),
    }
}

// ── Outbound ────────────────────────────────────────────────────────

/// A client → server subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "func", rename_all = "lowercase")]
pub enum Outbound {
    /// Ask for the full topology.
    Menu,
    /// Subscribe to periodic value updates for `ids`, every `period` seconds.
    Rtv { ids: Vec<i64>, period: u32 },
}

impl Outbound {
    /// Serialize to the JSON text frame sent on the socket.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// At most [`FRAME_PREVIEW_CHARS`] characters of `text`, cut on a char boundary.
pub fn frame_preview(text: &str) -> &str {
    text.char_indices()
        .nth(FRAME_PREVIEW_CHARS)
        .map_or(text, |(end, _)| &text[..end])
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Tests ────────────────────────────────────────────────────────────
