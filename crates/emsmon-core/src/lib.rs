//! Telemetry session and data layer between `emsmon-api` and consumers.
//!
//! - **[`Session`]**: owns one background worker that connects, requests
//!   the menu, subscribes to every point it lists, and reconnects after a
//!   fixed delay for as long as it runs. Observable through
//!   [`Session::state`] and [`Session::events`].
//!
//! - **[`DataStore`]**: the two caches the worker writes. The topology is
//!   swapped whole (`ArcSwap`); values live in a `DashMap` with a `watch`
//!   version counter.
//!
//! - **[`Query`]**: read facade resolving tree selections to point ids and
//!   joining them with metadata and values, grouped by [`DeviceType`].

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod query;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY, DEFAULT_RTV_PERIOD_SECS, SessionConfig,
};
pub use error::CoreError;
pub use query::{GroupSnapshot, PointReading, Query, TopologyNode};
pub use session::{Session, SessionEvent, SessionState};
pub use store::DataStore;

// ── Model re-exports ────────────────────────────────────────────────
pub use model::{
    Device, DeviceGroup, DeviceType, NOT_AVAILABLE, Point, PointId, PointMetadata, PointValue,
    Topology,
};

pub use emsmon_api::Endpoint;
