// ── Topology cache ──
//
// Whole-value replacement: readers load an `Arc<Topology>` and keep a
// consistent tree no matter how many menus arrive meanwhile.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::model::Topology;

pub(crate) struct TopologyCache {
    current: ArcSwap<Topology>,
    version: watch::Sender<u64>,
}

impl TopologyCache {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(Topology::default()),
            version,
        }
    }

    pub(crate) fn replace(&self, topology: Arc<Topology>) {
        self.current.store(topology);
        self.version.send_modify(|v| *v += 1);
    }

    pub(crate) fn load(&self) -> Arc<Topology> {
        self.current.load_full()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
