// ── Domain model ──
//
// Owned, display-ready types derived from the wire protocol. Nothing
// here knows about sockets or caches.

mod device;
mod point;
mod topology;

pub use device::{Device, DeviceGroup, DeviceType};
pub use point::{NOT_AVAILABLE, Point, PointId, PointMetadata, PointValue};
pub use topology::Topology;
