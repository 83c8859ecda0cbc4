//! Online device bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One online device as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub connected_at: Option<String>,
}

/// Last-known set of online devices for the session.
///
/// Kept authoritative-by-server: a full `online_devices` list replaces the
/// roster wholesale, while `device_online` / `device_offline` apply
/// incremental updates between refreshes.
#[derive(Debug, Default)]
pub struct DeviceRoster {
    devices: BTreeMap<String, DeviceInfo>,
}

impl DeviceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, devices: Vec<DeviceInfo>) {
        self.devices = devices
            .into_iter()
            .map(|d| (d.device_id.clone(), d))
            .collect();
    }

    pub fn mark_online(&mut self, device: DeviceInfo) {
        self.devices.insert(device.device_id.clone(), device);
    }

    pub fn mark_offline(&mut self, device_id: &str) {
        self.devices.remove(device_id);
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceInfo {
        DeviceInfo {
            device_id: id.into(),
            device_name: None,
            username: None,
            connected_at: None,
        }
    }

    #[test]
    fn incremental_updates_between_refreshes() {
        let mut roster = DeviceRoster::new();
        roster.replace_all(vec![device("a"), device("b")]);
        assert_eq!(roster.len(), 2);

        roster.mark_offline("a");
        assert!(!roster.contains("a"));

        roster.mark_online(device("c"));
        assert_eq!(roster.len(), 2);

        roster.replace_all(vec![device("a")]);
        assert!(roster.contains("a"));
        assert!(!roster.contains("c"));
    }
}
