//! Backend trait over the host and interface calls the sync engine makes.
//!
//! [`crate::Session`] implements it against a live Zabbix API. Use
//! [`MockBackend`] for testing without network access:
//!
//! ```
//! use zabbixkit::backend::{Backend, MockBackend};
//! use zabbixkit::{InterfaceSpec, NewHost, GroupRef};
//!
//! let mock = MockBackend::new();
//! let host_id = mock
//!     .create_host(&NewHost {
//!         host: "r1".into(),
//!         name: "r1".into(),
//!         groups: vec![GroupRef { group_id: 42 }],
//!         templates: vec![],
//!         interfaces: vec![InterfaceSpec::snmp_v2c("10.0.0.1", "public")],
//!     })
//!     .unwrap();
//!
//! let hosts = mock.hosts_in_group(42).unwrap();
//! assert_eq!(hosts[0].host_id, host_id);
//! assert_eq!(mock.writes().len(), 1);
//! ```

use crate::error::{Error, Result};
use crate::types::{Host, HostInterface, HostStatus, HostUpdate, InterfaceSpec, NewHost};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Host and interface operations against a monitoring backend.
///
/// Reads return the full interface, group and template membership of each
/// host. Writes map one-to-one onto Zabbix API calls.
pub trait Backend: Send + Sync {
    /// All hosts that are members of `group_id`.
    fn hosts_in_group(&self, group_id: u64) -> Result<Vec<Host>>;

    /// Hosts owning an interface with address `ip`.
    ///
    /// With `group_id` set, only members of that group are returned.
    fn hosts_by_ip(&self, ip: &str, group_id: Option<u64>) -> Result<Vec<Host>>;

    /// Create a host and return its id.
    ///
    /// # Errors
    ///
    /// Returns an API error in the `Conflict` category if a host with the
    /// same technical name already exists.
    fn create_host(&self, host: &NewHost) -> Result<u64>;

    /// Apply the fields set in `update`.
    fn update_host(&self, update: &HostUpdate) -> Result<()>;

    /// Add an interface to a host and return its id.
    fn create_interface(&self, host_id: u64, interface: &InterfaceSpec) -> Result<u64>;

    /// Overwrite an existing interface.
    fn update_interface(&self, interface_id: u64, interface: &InterfaceSpec) -> Result<()>;

    /// Delete interfaces by id.
    fn delete_interfaces(&self, interface_ids: &[u64]) -> Result<()>;
}

/// A write recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `host.create`
    CreateHost(NewHost),
    /// `host.update`
    UpdateHost(HostUpdate),
    /// `hostinterface.create`
    CreateInterface {
        /// Owning host.
        host_id: u64,
        /// Interface definition.
        interface: InterfaceSpec,
    },
    /// `hostinterface.update`
    UpdateInterface {
        /// Interface being overwritten.
        interface_id: u64,
        /// New definition.
        interface: InterfaceSpec,
    },
    /// `hostinterface.delete`
    DeleteInterfaces(Vec<u64>),
}

#[derive(Debug, Default)]
struct MockState {
    hosts: BTreeMap<u64, Host>,
    next_id: u64,
    writes: Vec<MockCall>,
    unavailable: bool,
    rejected: BTreeSet<u64>,
}

impl MockState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id = self.next_id.max(1000) + 1;
        self.next_id
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(Error::http("connection refused", None))
        } else {
            Ok(())
        }
    }

    fn name_taken(&self, name: &str, except: Option<u64>) -> bool {
        self.hosts
            .values()
            .any(|h| h.host == name && Some(h.host_id) != except)
    }

    fn interface_owner(&mut self, interface_id: u64) -> Option<&mut Host> {
        self.hosts.values_mut().find(|h| {
            h.interfaces
                .iter()
                .any(|i| i.interface_id == interface_id)
        })
    }
}

/// In-memory monitoring backend for tests.
///
/// Writes mutate the stored hosts the way Zabbix would and are recorded
/// in order, so tests can assert on both the resulting state and the
/// exact calls made.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an existing host. Not recorded as a write.
    pub fn add_host(&self, host: Host) {
        let mut state = self.state();
        let highest = host
            .interfaces
            .iter()
            .map(|i| i.interface_id)
            .chain([host.host_id])
            .max()
            .unwrap_or_default();
        state.next_id = state.next_id.max(highest);
        state.hosts.insert(host.host_id, host);
    }

    /// Current state of every host, ordered by id.
    #[must_use]
    pub fn hosts(&self) -> Vec<Host> {
        self.state().hosts.values().cloned().collect()
    }

    /// Current state of the host with technical name `name`.
    #[must_use]
    pub fn host(&self, name: &str) -> Option<Host> {
        self.state().hosts.values().find(|h| h.host == name).cloned()
    }

    /// Writes made so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<MockCall> {
        self.state().writes.clone()
    }

    /// Forget recorded writes, keeping host state.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Make every call fail with a network error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Make every write touching `host_id` fail with an API rejection.
    pub fn reject_writes_for(&self, host_id: u64) {
        self.state().rejected.insert(host_id);
    }
}

fn rejection(method: &str) -> Error {
    Error::api(
        method,
        -32500,
        "Application error.",
        "No permissions to referred object or it does not exist!",
    )
}

impl Backend for MockBackend {
    fn hosts_in_group(&self, group_id: u64) -> Result<Vec<Host>> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .hosts
            .values()
            .filter(|h| h.groups.iter().any(|g| g.group_id == group_id))
            .cloned()
            .collect())
    }

    fn hosts_by_ip(&self, ip: &str, group_id: Option<u64>) -> Result<Vec<Host>> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .hosts
            .values()
            .filter(|h| h.interfaces.iter().any(|i| i.ip == ip))
            .filter(|h| group_id.is_none_or(|id| h.groups.iter().any(|g| g.group_id == id)))
            .cloned()
            .collect())
    }

    fn create_host(&self, host: &NewHost) -> Result<u64> {
        let mut state = self.state();
        state.check_available()?;
        state.writes.push(MockCall::CreateHost(host.clone()));

        if state.name_taken(&host.host, None) {
            return Err(Error::api(
                "host.create",
                -32602,
                "Invalid params.",
                format!("Host with the same name \"{}\" already exists.", host.host),
            ));
        }

        let host_id = state.allocate_id();
        let interfaces = host
            .interfaces
            .iter()
            .map(|spec| {
                let id = state.allocate_id();
                HostInterface::from_spec(id, spec)
            })
            .collect();

        state.hosts.insert(
            host_id,
            Host {
                host_id,
                host: host.host.clone(),
                name: host.name.clone(),
                status: HostStatus::Enabled,
                interfaces,
                groups: host.groups.clone(),
                parent_templates: host.templates.clone(),
            },
        );
        Ok(host_id)
    }

    fn update_host(&self, update: &HostUpdate) -> Result<()> {
        let mut state = self.state();
        state.check_available()?;
        state.writes.push(MockCall::UpdateHost(update.clone()));

        if state.rejected.contains(&update.host_id) {
            return Err(rejection("host.update"));
        }
        if let Some(name) = &update.host
            && state.name_taken(name, Some(update.host_id))
        {
            return Err(Error::api(
                "host.update",
                -32602,
                "Invalid params.",
                format!("Host with the same name \"{name}\" already exists."),
            ));
        }

        let host = state
            .hosts
            .get_mut(&update.host_id)
            .ok_or_else(|| rejection("host.update"))?;
        if let Some(name) = &update.host {
            host.host.clone_from(name);
        }
        if let Some(name) = &update.name {
            host.name.clone_from(name);
        }
        if let Some(status) = update.status {
            host.status = status;
        }
        if let Some(groups) = &update.groups {
            host.groups.clone_from(groups);
        }
        if let Some(templates) = &update.templates {
            host.parent_templates.clone_from(templates);
        }
        Ok(())
    }

    fn create_interface(&self, host_id: u64, interface: &InterfaceSpec) -> Result<u64> {
        let mut state = self.state();
        state.check_available()?;
        state.writes.push(MockCall::CreateInterface {
            host_id,
            interface: interface.clone(),
        });

        if state.rejected.contains(&host_id) || !state.hosts.contains_key(&host_id) {
            return Err(rejection("hostinterface.create"));
        }
        let interface_id = state.allocate_id();
        if let Some(host) = state.hosts.get_mut(&host_id) {
            host.interfaces
                .push(HostInterface::from_spec(interface_id, interface));
        }
        Ok(interface_id)
    }

    fn update_interface(&self, interface_id: u64, interface: &InterfaceSpec) -> Result<()> {
        let mut state = self.state();
        state.check_available()?;
        state.writes.push(MockCall::UpdateInterface {
            interface_id,
            interface: interface.clone(),
        });

        let rejected = state.rejected.clone();
        let host = state
            .interface_owner(interface_id)
            .filter(|h| !rejected.contains(&h.host_id))
            .ok_or_else(|| rejection("hostinterface.update"))?;
        for existing in &mut host.interfaces {
            if existing.interface_id == interface_id {
                *existing = HostInterface::from_spec(interface_id, interface);
            }
        }
        Ok(())
    }

    fn delete_interfaces(&self, interface_ids: &[u64]) -> Result<()> {
        let mut state = self.state();
        state.check_available()?;
        state
            .writes
            .push(MockCall::DeleteInterfaces(interface_ids.to_vec()));

        for &id in interface_ids {
            let rejected = state.rejected.clone();
            let host = state
                .interface_owner(id)
                .filter(|h| !rejected.contains(&h.host_id))
                .ok_or_else(|| rejection("hostinterface.delete"))?;
            host.interfaces.retain(|i| i.interface_id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::{GroupRef, TemplateRef};

    fn new_host(name: &str, ip: &str) -> NewHost {
        NewHost {
            host: name.into(),
            name: name.into(),
            groups: vec![GroupRef { group_id: 42 }],
            templates: vec![TemplateRef { template_id: 10 }],
            interfaces: vec![InterfaceSpec::snmp_v2c(ip, "public")],
        }
    }

    #[test]
    fn test_create_and_query() {
        let mock = MockBackend::new();
        let id = mock.create_host(&new_host("r1", "10.0.0.1")).unwrap();

        let by_group = mock.hosts_in_group(42).unwrap();
        assert_eq!(by_group.len(), 1);
        assert_eq!(by_group[0].host_id, id);
        assert_eq!(by_group[0].interfaces[0].ip, "10.0.0.1");
        assert!(mock.hosts_in_group(7).unwrap().is_empty());

        assert_eq!(mock.hosts_by_ip("10.0.0.1", None).unwrap().len(), 1);
        assert!(mock.hosts_by_ip("10.0.0.1", Some(7)).unwrap().is_empty());
        assert!(mock.hosts_by_ip("10.0.0.2", None).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let mock = MockBackend::new();
        mock.create_host(&new_host("r1", "10.0.0.1")).unwrap();
        let err = mock.create_host(&new_host("r1", "10.0.0.2")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(mock.hosts().len(), 1);
        assert_eq!(mock.writes().len(), 2);
    }

    #[test]
    fn test_update_applies_fields() {
        let mock = MockBackend::new();
        let id = mock.create_host(&new_host("old", "10.0.0.1")).unwrap();

        mock.update_host(&HostUpdate::rename(id, "r1")).unwrap();
        mock.update_host(&HostUpdate::status(id, HostStatus::Disabled))
            .unwrap();
        mock.update_host(&HostUpdate::templates(id, [11])).unwrap();

        let host = mock.host("r1").unwrap();
        assert_eq!(host.name, "r1");
        assert_eq!(host.status, HostStatus::Disabled);
        assert_eq!(host.parent_templates, vec![TemplateRef { template_id: 11 }]);
        assert!(mock.host("old").is_none());
    }

    #[test]
    fn test_interface_lifecycle() {
        let mock = MockBackend::new();
        let id = mock.create_host(&new_host("r1", "10.0.0.1")).unwrap();
        let extra = mock
            .create_interface(id, &InterfaceSpec::snmp_v2c("10.0.0.9", "public"))
            .unwrap();
        assert_eq!(mock.host("r1").unwrap().interfaces.len(), 2);

        let primary = mock.host("r1").unwrap().interfaces[0].interface_id;
        mock.update_interface(primary, &InterfaceSpec::snmp_v2c("10.0.0.5", "public"))
            .unwrap();
        mock.delete_interfaces(&[extra]).unwrap();

        let host = mock.host("r1").unwrap();
        assert_eq!(host.interfaces.len(), 1);
        assert_eq!(host.interfaces[0].ip, "10.0.0.5");
        assert_eq!(host.interfaces[0].interface_id, primary);
    }

    #[test]
    fn test_rejected_writes() {
        let mock = MockBackend::new();
        let id = mock.create_host(&new_host("r1", "10.0.0.1")).unwrap();
        mock.reject_writes_for(id);

        let err = mock
            .update_host(&HostUpdate::status(id, HostStatus::Disabled))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert_eq!(mock.host("r1").unwrap().status, HostStatus::Enabled);
    }

    #[test]
    fn test_unavailable() {
        let mock = MockBackend::new();
        mock.set_unavailable(true);
        let err = mock.hosts_in_group(42).unwrap_err();
        assert!(err.is_fatal());
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_seeded_ids_do_not_collide() {
        let mock = MockBackend::new();
        mock.add_host(Host {
            host_id: 5000,
            host: "seed".into(),
            name: "seed".into(),
            status: HostStatus::Enabled,
            interfaces: vec![],
            groups: vec![GroupRef { group_id: 42 }],
            parent_templates: vec![],
        });
        let id = mock.create_host(&new_host("r1", "10.0.0.1")).unwrap();
        assert!(id > 5000);
        assert!(mock.writes().iter().all(|c| matches!(c, MockCall::CreateHost(_))));
    }
}
