// emsmon-api: wire protocol and WebSocket transport for EMS telemetry endpoints

pub mod error;
pub mod protocol;
pub mod websocket;

pub use error::{DecodeError, Error};
pub use protocol::{Inbound, MenuDevice, MenuPayload, MenuPoint, Outbound, RtvEntry};
pub use websocket::{Endpoint, Frame, WsReader, WsWriter};
