//! Run-local views of both systems

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::Ipv4Addr;

use netboxkit::Device;
use zabbixkit::{Host, HostInterface, HostStatus, InterfaceType};

/// A device that should be monitored, as read from the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredDevice {
    pub id: u64,
    /// Empty when the inventory has no name for the device
    pub name: String,
    pub management_ip: Option<String>,
    pub classification: String,
    pub is_active: bool,
}

impl DesiredDevice {
    pub fn from_device(device: &Device, classification: impl Into<String>) -> Self {
        Self {
            id: device.id,
            name: device.name.clone().unwrap_or_default().trim().to_string(),
            management_ip: device.management_ip().map(str::to_string),
            classification: classification.into(),
            is_active: device.is_active(),
        }
    }

    /// The management IP if present and a valid IPv4 address
    pub fn valid_ip(&self) -> Result<&str, &'static str> {
        let ip = self
            .management_ip
            .as_deref()
            .ok_or("missing management IP")?;
        ip.parse::<Ipv4Addr>()
            .map(|_| ip)
            .map_err(|_| "management IP is not an IPv4 address")
    }

    /// Status the monitored host should have
    pub fn target_status(&self) -> HostStatus {
        if self.is_active {
            HostStatus::Enabled
        } else {
            HostStatus::Disabled
        }
    }
}

/// A monitored host as seen at run start, updated locally after each write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualHost {
    pub host_id: u64,
    pub name: String,
    pub status: HostStatus,
    /// Primary interface first
    pub interfaces: Vec<HostInterface>,
    pub group_ids: BTreeSet<u64>,
    pub template_ids: BTreeSet<u64>,
}

impl ActualHost {
    pub fn primary_interface(&self) -> Option<&HostInterface> {
        self.interfaces.first()
    }

    pub fn in_group(&self, group_id: u64) -> bool {
        self.group_ids.contains(&group_id)
    }
}

impl From<Host> for ActualHost {
    fn from(host: Host) -> Self {
        let mut interfaces = host.interfaces;
        // Main SNMP interface first, then other main interfaces.
        interfaces.sort_by_key(|i| (!i.main, i.kind != InterfaceType::Snmp));
        Self {
            host_id: host.host_id,
            name: host.host,
            status: host.status,
            interfaces,
            group_ids: host.groups.iter().map(|g| g.group_id).collect(),
            template_ids: host.parent_templates.iter().map(|t| t.template_id).collect(),
        }
    }
}

/// Snapshot of the managed hosts, keyed by host id and by name
#[derive(Debug, Clone, Default)]
pub struct ActualState {
    hosts: BTreeMap<u64, ActualHost>,
    by_name: HashMap<String, u64>,
}

impl ActualState {
    pub fn from_hosts(hosts: impl IntoIterator<Item = ActualHost>) -> Self {
        let mut state = Self::default();
        for host in hosts {
            state.insert(host);
        }
        state
    }

    pub fn get(&self, host_id: u64) -> Option<&ActualHost> {
        self.hosts.get(&host_id)
    }

    /// Case-sensitive exact lookup
    pub fn by_name(&self, name: &str) -> Option<&ActualHost> {
        self.by_name.get(name).and_then(|id| self.hosts.get(id))
    }

    /// Insert or replace a host, re-indexing its name
    pub fn insert(&mut self, host: ActualHost) {
        if let Some(previous) = self.hosts.get(&host.host_id)
            && previous.name != host.name
        {
            self.by_name.remove(&previous.name);
        }
        self.by_name.insert(host.name.clone(), host.host_id);
        self.hosts.insert(host.host_id, host);
    }

    pub fn hosts(&self) -> impl Iterator<Item = &ActualHost> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
