//! Desired- and actual-state fetchers

use std::collections::BTreeMap;

use crate::classification::ClassificationMap;

use super::model::{ActualHost, ActualState, DesiredDevice};
use super::report::SyncError;

/// Active devices carrying a recognized classification tag, ordered by id
///
/// Devices with unrecognized or absent tags are never requested. Any
/// inventory error is fatal for the run.
pub fn fetch_desired(
    inventory: &dyn netboxkit::backend::Backend,
    classes: &ClassificationMap,
    class_field: &str,
) -> Result<Vec<DesiredDevice>, SyncError> {
    let mut devices = BTreeMap::new();
    if classes.is_empty() {
        log::warn!("No classification tags configured");
    }
    for tag in classes.tags() {
        let tagged = inventory
            .active_devices(class_field, tag)
            .map_err(SyncError::inventory)?;
        log::debug!("{} active devices tagged {tag}", tagged.len());
        for device in tagged.iter().filter(|d| d.is_active()) {
            devices
                .entry(device.id)
                .or_insert_with(|| DesiredDevice::from_device(device, tag));
        }
    }
    Ok(devices.into_values().collect())
}

/// Hosts in the managed group, with interfaces, groups and templates
pub fn fetch_actual(
    monitoring: &dyn zabbixkit::backend::Backend,
    managed_group: u64,
) -> Result<ActualState, SyncError> {
    let hosts = monitoring
        .hosts_in_group(managed_group)
        .map_err(SyncError::monitoring)?;
    log::debug!("{} hosts in managed group {managed_group}", hosts.len());
    Ok(ActualState::from_hosts(hosts.into_iter().map(ActualHost::from)))
}

/// Hosts holding `ip`, restricted to `scope` when set
pub fn fetch_by_ip(
    monitoring: &dyn zabbixkit::backend::Backend,
    ip: &str,
    scope: Option<u64>,
) -> Result<Vec<ActualHost>, SyncError> {
    let mut hosts: Vec<ActualHost> = monitoring
        .hosts_by_ip(ip, scope)
        .map_err(SyncError::monitoring)?
        .into_iter()
        .map(ActualHost::from)
        .collect();
    hosts.sort_by_key(|h| h.host_id);
    hosts.dedup_by_key(|h| h.host_id);
    Ok(hosts)
}
