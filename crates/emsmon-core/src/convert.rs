// ── Wire-to-domain conversions ──
//
// Bridges `emsmon_api` protocol payloads into `crate::model` types.
// Missing names have already been defaulted to empty strings by the
// codec; nothing here can fail.

use emsmon_api::{MenuDevice, MenuPayload, MenuPoint, RtvEntry};

use crate::model::{Device, DeviceGroup, DeviceType, Point, PointId, PointValue, Topology};

impl From<MenuPoint> for Point {
    fn from(p: MenuPoint) -> Self {
        Self {
            id: PointId(p.id),
            display_name: p.field_chn_name,
            engineering_name: p.field_eng_name,
        }
    }
}

impl From<MenuDevice> for Device {
    fn from(d: MenuDevice) -> Self {
        Self {
            display_name: d.chn_name,
            engineering_name: d.eng_name,
            table_name: d.table_name,
            points: d.rtv_list.into_iter().map(Point::from).collect(),
        }
    }
}

impl From<MenuPayload> for Topology {
    fn from(menu: MenuPayload) -> Self {
        let groups = menu
            .groups
            .into_iter()
            .map(|(type_name, devices)| DeviceGroup {
                kind: DeviceType::from_key(&type_name),
                type_name,
                devices: devices.into_iter().map(Device::from).collect(),
            })
            .collect();
        Topology::from_groups(groups)
    }
}

/// Split an rtv entry into its cache key and value.
pub(crate) fn rtv_to_value(entry: RtvEntry) -> (PointId, PointValue) {
    (PointId(entry.id), PointValue::from(entry.value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn menu() -> MenuPayload {
        serde_json::from_value(json!({
            "d_pcs": [{
                "chnName": "PCS-1", "engName": "pcs1", "tableName": "t_pcs",
                "rtvList": [
                    { "id": 201, "fieldChnName": "有功功率", "fieldEngName": "p" },
                    { "id": 202, "fieldChnName": "无功功率", "fieldEngName": "q" }
                ]
            }],
            "d_bms": [
                { "chnName": "BMS-1", "rtvList": [{ "id": 101, "fieldChnName": "SOC" }] },
                { "chnName": "BMS-2", "rtvList": [] }
            ],
            "d_meter": [
                { "chnName": "Meter", "rtvList": [{ "id": 901, "fieldChnName": "kWh" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn topology_preserves_server_order() {
        let topo = Topology::from(menu());

        let names: Vec<&str> = topo.groups().iter().map(|g| g.type_name.as_str()).collect();
        assert_eq!(names, ["d_pcs", "d_bms", "d_meter"]);
        assert_eq!(
            topo.all_point_ids(),
            vec![PointId(201), PointId(202), PointId(101), PointId(901)]
        );
        assert_eq!(topo.device_count(), 4);
        assert_eq!(topo.point_count(), 4);
    }

    #[test]
    fn index_carries_device_context() {
        let topo = Topology::from(menu());

        let meta = topo.metadata_for(PointId(202)).unwrap();
        assert_eq!(meta.display_name, "无功功率");
        assert_eq!(meta.engineering_name, "q");
        assert_eq!(meta.device_type, "d_pcs");
        assert_eq!(meta.kind, Some(DeviceType::Pcs));
        assert_eq!(meta.device_name, "PCS-1");
        assert_eq!(meta.table_name, "t_pcs");

        let unknown = topo.metadata_for(PointId(901)).unwrap();
        assert_eq!(unknown.kind, None);
        assert_eq!(unknown.device_type, "d_meter");
    }

    #[test]
    fn device_identity_is_first_point() {
        let topo = Topology::from(menu());

        let pcs = topo.group_of_kind(DeviceType::Pcs).unwrap();
        assert_eq!(Topology::device_id_for(&pcs.devices[0]), Some(PointId(201)));

        let bms = topo.group("d_bms").unwrap();
        assert_eq!(bms.devices[1].id(), None);
        assert_eq!(topo.device(PointId(201)).unwrap().display_name, "PCS-1");
        assert!(topo.device(PointId(202)).is_none());
    }

    #[test]
    fn empty_menu_is_empty_topology() {
        let topo = Topology::from(MenuPayload::default());
        assert!(topo.is_empty());
        assert!(topo.all_point_ids().is_empty());
    }
}
