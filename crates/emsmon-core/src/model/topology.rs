// ── Topology ──
//
// One immutable value per received menu: the ordered group/device/point
// tree plus an id index over it. Both halves are built together so a
// reader never observes one without the other.

use std::collections::HashMap;
use std::sync::Arc;

use super::device::{Device, DeviceGroup, DeviceType};
use super::point::{PointId, PointMetadata};

/// The full device tree as of the latest menu.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    groups: Vec<DeviceGroup>,
    index: HashMap<PointId, Arc<PointMetadata>>,
}

impl Topology {
    /// Build from groups in server order; the index is derived here.
    ///
    /// A point id listed twice keeps the metadata of its last occurrence.
    pub fn from_groups(groups: Vec<DeviceGroup>) -> Self {
        let mut index = HashMap::new();
        for group in &groups {
            for device in &group.devices {
                for point in &device.points {
                    index.insert(
                        point.id,
                        Arc::new(PointMetadata {
                            display_name: point.display_name.clone(),
                            engineering_name: point.engineering_name.clone(),
                            device_type: group.type_name.clone(),
                            kind: group.kind,
                            device_name: device.display_name.clone(),
                            table_name: device.table_name.clone(),
                        }),
                    );
                }
            }
        }
        Self { groups, index }
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn group(&self, type_name: &str) -> Option<&DeviceGroup> {
        self.groups.iter().find(|g| g.type_name == type_name)
    }

    pub fn group_of_kind(&self, kind: DeviceType) -> Option<&DeviceGroup> {
        self.groups.iter().find(|g| g.kind == Some(kind))
    }

    /// Device whose first point is `id`.
    pub fn device(&self, id: PointId) -> Option<&Device> {
        self.groups
            .iter()
            .flat_map(|g| &g.devices)
            .find(|d| d.id() == Some(id))
    }

    pub fn device_id_for(device: &Device) -> Option<PointId> {
        device.id()
    }

    pub fn metadata_for(&self, id: PointId) -> Option<&Arc<PointMetadata>> {
        self.index.get(&id)
    }

    /// Every point id in menu order. Duplicates are preserved.
    pub fn all_point_ids(&self) -> Vec<PointId> {
        self.groups.iter().flat_map(DeviceGroup::point_ids).collect()
    }

    pub fn point_count(&self) -> usize {
        self.index.len()
    }

    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
