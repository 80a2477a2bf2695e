// ── Query facade ──
//
// Read-side operations a presentation layer needs: resolve a selected
// tree node to point ids, and join ids with metadata and values into
// display groups. Each call loads the topology once, so a concurrent
// menu swap never yields a mix of old and new.

use std::sync::Arc;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::model::{DeviceType, PointId, PointMetadata, PointValue};
use crate::store::DataStore;

/// A selectable node of the topology tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopologyNode {
    /// A device-type group, by its raw key (e.g. `d_pcs`).
    Group(String),
    /// A device, by the id of its first point.
    Device(PointId),
    Point(PointId),
}

impl TopologyNode {
    pub fn group(kind: DeviceType) -> Self {
        Self::Group(kind.as_ref().to_owned())
    }
}

/// One display row: a point joined with its latest value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointReading {
    pub id: PointId,
    #[serde(flatten)]
    pub metadata: Arc<PointMetadata>,
    pub value: PointValue,
}

/// Rows of a single known device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSnapshot {
    pub device_type: DeviceType,
    pub rows: Vec<PointReading>,
}

/// Cheap, cloneable read handle over a session's caches.
#[derive(Clone)]
pub struct Query {
    store: Arc<DataStore>,
}

impl Query {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Point ids beneath `node`, in menu order.
    ///
    /// Unknown groups and devices yield nothing. A point node always
    /// yields its own id, known or not.
    pub fn children_of(&self, node: &TopologyNode) -> Vec<PointId> {
        let topology = self.store.topology();
        match node {
            TopologyNode::Group(type_name) => topology
                .group(type_name)
                .map(|g| g.point_ids().collect())
                .unwrap_or_default(),
            TopologyNode::Device(id) => topology
                .device(*id)
                .map(|d| d.point_ids().collect())
                .unwrap_or_default(),
            TopologyNode::Point(id) => vec![*id],
        }
    }

    /// Join `ids` with metadata and latest values, grouped by device type
    /// in canonical order.
    ///
    /// Ids without metadata are skipped, as are ids whose device type is
    /// outside [`DeviceType`]. Groups with no rows are omitted. Within a
    /// group rows keep the order of `ids`.
    pub fn snapshot_for(&self, ids: &[PointId]) -> Vec<GroupSnapshot> {
        let topology = self.store.topology();

        let known: Vec<(PointId, &Arc<PointMetadata>, DeviceType)> = ids
            .iter()
            .filter_map(|&id| {
                let meta = topology.metadata_for(id)?;
                Some((id, meta, meta.kind?))
            })
            .collect();

        DeviceType::iter()
            .filter_map(|device_type| {
                let rows: Vec<PointReading> = known
                    .iter()
                    .filter(|(_, _, kind)| *kind == device_type)
                    .map(|(id, meta, _)| PointReading {
                        id: *id,
                        metadata: Arc::clone(meta),
                        value: self.store.value(*id),
                    })
                    .collect();
                (!rows.is_empty()).then_some(GroupSnapshot { device_type, rows })
            })
            .collect()
    }

    /// Snapshot of the whole topology.
    pub fn snapshot_all(&self) -> Vec<GroupSnapshot> {
        let ids = self.store.topology().all_point_ids();
        self.snapshot_for(&ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convert::rtv_to_value;
    use crate::model::Topology;
    use emsmon_api::{MenuPayload, RtvEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn query_with(menu: serde_json::Value) -> Query {
        let store = Arc::new(DataStore::new());
        let menu: MenuPayload = serde_json::from_value(menu).unwrap();
        store.topology.replace(Arc::new(Topology::from(menu)));
        Query::new(store)
    }

    fn set(query: &Query, id: i64, value: serde_json::Value) {
        query.store.values.upsert_many([rtv_to_value(RtvEntry {
            id,
            value: Some(value),
        })]);
    }

    fn plant() -> Query {
        query_with(json!({
            "d_grid": [{ "chnName": "Grid", "rtvList": [
                { "id": 301, "fieldChnName": "Voltage" },
                { "id": 302, "fieldChnName": "Frequency" }
            ]}],
            "d_pcs": [
                { "chnName": "PCS-1", "rtvList": [
                    { "id": 201, "fieldChnName": "P" },
                    { "id": 202, "fieldChnName": "Q" }
                ]},
                { "chnName": "PCS-2", "rtvList": [{ "id": 211, "fieldChnName": "P" }] }
            ],
            "d_meter": [{ "chnName": "Meter", "rtvList": [{ "id": 901, "fieldChnName": "kWh" }] }]
        }))
    }

    #[test]
    fn children_of_each_level() {
        let q = plant();

        assert_eq!(
            q.children_of(&TopologyNode::group(DeviceType::Pcs)),
            vec![PointId(201), PointId(202), PointId(211)]
        );
        assert_eq!(
            q.children_of(&TopologyNode::Device(PointId(201))),
            vec![PointId(201), PointId(202)]
        );
        assert_eq!(
            q.children_of(&TopologyNode::Point(PointId(302))),
            vec![PointId(302)]
        );
        assert_eq!(
            q.children_of(&TopologyNode::Group("d_meter".into())),
            vec![PointId(901)]
        );
        assert!(q.children_of(&TopologyNode::group(DeviceType::Bms)).is_empty());
        assert!(q.children_of(&TopologyNode::Device(PointId(202))).is_empty());
    }

    #[test]
    fn device_round_trip_pairs_every_point_with_value() {
        let q = plant();
        set(&q, 202, json!("1.5"));

        let ids = q.children_of(&TopologyNode::Device(PointId(201)));
        let groups = q.snapshot_for(&ids);

        assert_eq!(groups.len(), 1);
        let rows: Vec<(PointId, String)> = groups[0]
            .rows
            .iter()
            .map(|r| (r.id, r.value.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![(PointId(201), "N/A".into()), (PointId(202), "1.5".into())]
        );
    }

    #[test]
    fn groups_follow_canonical_order_and_skip_empty() {
        let q = plant();
        let groups = q.snapshot_all();

        let kinds: Vec<DeviceType> = groups.iter().map(|g| g.device_type).collect();
        assert_eq!(kinds, vec![DeviceType::Pcs, DeviceType::Grid]);
        assert_eq!(groups[0].rows.len(), 3);
        assert_eq!(groups[1].rows[0].metadata.display_name, "Voltage");
    }

    #[test]
    fn unknown_ids_are_cached_but_not_reported() {
        let q = plant();
        set(&q, 777, json!(1));

        assert_eq!(q.store().value(PointId(777)).to_string(), "1");
        let groups = q.snapshot_for(&[PointId(777), PointId(301)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 1);
        assert_eq!(groups[0].rows[0].id, PointId(301));
    }

    #[test]
    fn unknown_device_type_is_excluded_from_snapshot() {
        let q = plant();
        assert!(q.snapshot_for(&[PointId(901)]).is_empty());
    }

    #[test]
    fn reset_keeps_topology() {
        let q = plant();
        set(&q, 301, json!("230"));
        q.store.values.reset();

        assert_eq!(q.store().topology().point_count(), 6);
        let groups = q.snapshot_for(&[PointId(301)]);
        assert_eq!(groups[0].rows[0].value, PointValue::Unavailable);
    }

    #[test]
    fn replaying_menu_is_idempotent() {
        let menu = json!({ "d_bms": [{ "chnName": "BMS", "rtvList": [{ "id": 1, "fieldChnName": "SOC" }] }] });
        let q = query_with(menu.clone());
        let first = q.store().topology();

        let again: MenuPayload = serde_json::from_value(menu).unwrap();
        q.store.topology.replace(Arc::new(Topology::from(again)));
        let second = q.store().topology();

        assert_eq!(first.groups(), second.groups());
        assert_eq!(first.all_point_ids(), second.all_point_ids());
        assert_eq!(
            first.metadata_for(PointId(1)),
            second.metadata_for(PointId(1))
        );
    }
}
