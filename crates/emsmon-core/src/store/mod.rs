// ── Reactive data store ──
//
// Central storage for everything the session has learned: the latest
// topology and the latest value per point. Only the session worker
// writes; any number of readers may query concurrently.

mod topology_cache;
mod value_cache;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{PointId, PointValue, Topology};

pub(crate) use topology_cache::TopologyCache;
pub(crate) use value_cache::ValueCache;

/// Shared topology and value caches.
pub struct DataStore {
    pub(crate) topology: TopologyCache,
    pub(crate) values: ValueCache,
}

impl DataStore {
    pub(crate) fn new() -> Self {
        Self {
            topology: TopologyCache::new(),
            values: ValueCache::new(),
        }
    }

    /// Topology as of the latest menu. Empty before the first one.
    pub fn topology(&self) -> Arc<Topology> {
        self.topology.load()
    }

    /// Latest value for `id`, or [`PointValue::Unavailable`].
    pub fn value(&self, id: PointId) -> PointValue {
        self.values.get(id)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Receiver whose value increments on every value batch and reset.
    pub fn subscribe_values(&self) -> watch::Receiver<u64> {
        self.values.subscribe()
    }

    pub fn subscribe_topology(&self) -> watch::Receiver<u64> {
        self.topology.subscribe()
    }

    /// When the last value batch arrived.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.values.last_update()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
