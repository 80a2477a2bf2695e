// ── Point value cache ──
//
// Last-write-wins map keyed by point id. Ids are stored whether or not
// the current topology knows them; filtering happens at query time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{PointId, PointValue};

pub(crate) struct ValueCache {
    values: DashMap<PointId, PointValue>,
    /// Bumped once per batch and once per reset.
    version: watch::Sender<u64>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl ValueCache {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0);
        let (last_update, _) = watch::channel(None);
        Self {
            values: DashMap::new(),
            version,
            last_update,
        }
    }

    /// Apply a batch in order; a repeated id keeps its last value.
    /// Returns the ids touched, in batch order.
    pub(crate) fn upsert_many<I>(&self, batch: I) -> Vec<PointId>
    where
        I: IntoIterator<Item = (PointId, PointValue)>,
    {
        let touched: Vec<PointId> = batch
            .into_iter()
            .map(|(id, value)| {
                self.values.insert(id, value);
                id
            })
            .collect();

        if !touched.is_empty() {
            self.last_update.send_replace(Some(Utc::now()));
            self.version.send_modify(|v| *v += 1);
        }
        touched
    }

    pub(crate) fn get(&self, id: PointId) -> PointValue {
        self.values
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn reset(&self) {
        self.values.clear();
        self.last_update.send_replace(None);
        self.version.send_modify(|v| *v += 1);
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub(crate) fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }
}
