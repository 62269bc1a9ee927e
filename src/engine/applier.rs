//! Mutation applier: idempotent converge operations against the monitoring
//! backend
//!
//! Every operation compares the run-start snapshot of a host with its
//! target and writes only on mismatch. Each write is described as a
//! [`Change`], offered to the [`ConfirmCallback`], and mirrored into the
//! local snapshot once the backend accepts it.

use std::collections::BTreeSet;

use converge::{ApplyResult, Change, ConfirmCallback};
use zabbixkit::backend::Backend;
use zabbixkit::{
    GroupRef, HostInterface, HostStatus, HostUpdate, InterfaceSpec, NewHost, TemplateRef,
};

use super::model::ActualHost;
use super::report::{RunReport, SyncError};

/// Outcome of a single gated write
enum Written<T> {
    Done(T),
    Declined,
    Rejected(zabbixkit::Error),
}

/// Outcome of [`Applier::create_host`]
#[derive(Debug)]
pub enum Created {
    Host(ActualHost),
    Declined,
    /// Name or interface already exists
    Conflict(String),
    Rejected(String),
}

pub struct Applier<'a> {
    backend: &'a dyn Backend,
    confirm: &'a mut dyn ConfirmCallback,
    community: String,
    sentinel: u64,
    report: RunReport,
}

impl<'a> Applier<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        confirm: &'a mut dyn ConfirmCallback,
        community: impl Into<String>,
        sentinel: u64,
        report: RunReport,
    ) -> Self {
        Self {
            backend,
            confirm,
            community: community.into(),
            sentinel,
            report,
        }
    }

    pub fn report_mut(&mut self) -> &mut RunReport {
        &mut self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Interface spec every managed host should carry
    pub fn interface_spec(&self, ip: &str) -> InterfaceSpec {
        InterfaceSpec::snmp_v2c(ip, &self.community)
    }

    fn write<T>(
        &mut self,
        change: Change,
        call: impl FnOnce(&dyn Backend) -> zabbixkit::Result<T>,
    ) -> Result<Written<T>, SyncError> {
        let approved = self
            .confirm
            .confirm(&change)
            .map_err(|err| SyncError::Confirmation(format!("{err:#}")))?;
        if !approved {
            log::info!("declined {change}");
            self.report.declined.push(change);
            return Ok(Written::Declined);
        }

        match call(self.backend) {
            Ok(value) => {
                log::info!("{change}");
                self.report.changes.push(change);
                Ok(Written::Done(value))
            }
            Err(err) if err.is_fatal() => Err(SyncError::monitoring(err)),
            Err(err) => {
                log::error!("{change} rejected: {}", err.detail());
                Ok(Written::Rejected(err))
            }
        }
    }

    /// Primary interface on `target_ip`, nothing else
    pub fn ensure_interfaces(
        &mut self,
        host: &mut ActualHost,
        target_ip: &str,
    ) -> Result<ApplyResult, SyncError> {
        let spec = self.interface_spec(target_ip);
        let host_id = host.host_id;
        let mut result = ApplyResult::NoChange;

        match host.primary_interface() {
            None => {
                let change = Change::create(&host.name, "interface", describe_spec(&spec));
                match self.write(change, |b| b.create_interface(host_id, &spec))? {
                    Written::Done(id) => {
                        host.interfaces.push(HostInterface::from_spec(id, &spec));
                        result = ApplyResult::Modified;
                    }
                    Written::Declined => return Ok(declined()),
                    Written::Rejected(err) => return Ok(failed(&err)),
                }
            }
            Some(primary) if !spec.matches(primary) => {
                let interface_id = primary.interface_id;
                let before = describe_interface(primary);
                let mut after = describe_spec(&spec);
                if after == before {
                    after.push_str(" (details)");
                }
                let change = Change::update(&host.name, "interface", before, after);
                match self.write(change, |b| b.update_interface(interface_id, &spec))? {
                    Written::Done(()) => {
                        host.interfaces[0] = HostInterface::from_spec(interface_id, &spec);
                        result = ApplyResult::Modified;
                    }
                    Written::Declined => result = declined(),
                    Written::Rejected(err) => return Ok(failed(&err)),
                }
            }
            Some(_) => {}
        }

        if host.interfaces.len() > 1 {
            let extras: Vec<u64> = host.interfaces[1..].iter().map(|i| i.interface_id).collect();
            let before = host.interfaces[1..]
                .iter()
                .map(describe_interface)
                .collect::<Vec<_>>()
                .join(", ");
            let change = Change::delete(&host.name, "interfaces", before);
            match self.write(change, |b| b.delete_interfaces(&extras))? {
                Written::Done(()) => {
                    host.interfaces.truncate(1);
                    result = result.and(ApplyResult::Modified);
                }
                Written::Declined => result = result.and(declined()),
                Written::Rejected(err) => return Ok(failed(&err)),
            }
        }

        Ok(result)
    }

    pub fn ensure_status(
        &mut self,
        host: &mut ActualHost,
        target: HostStatus,
    ) -> Result<ApplyResult, SyncError> {
        if host.status == target {
            return Ok(ApplyResult::NoChange);
        }
        let change = Change::update(
            &host.name,
            "status",
            host.status.to_string(),
            target.to_string(),
        );
        let update = HostUpdate::status(host.host_id, target);
        Ok(match self.write(change, |b| b.update_host(&update))? {
            Written::Done(()) => {
                host.status = target;
                ApplyResult::Modified
            }
            Written::Declined => declined(),
            Written::Rejected(err) => failed(&err),
        })
    }

    /// Replace the linked template set
    pub fn ensure_templates(
        &mut self,
        host: &mut ActualHost,
        target: &BTreeSet<u64>,
    ) -> Result<ApplyResult, SyncError> {
        if &host.template_ids == target {
            return Ok(ApplyResult::NoChange);
        }
        let change = Change::update(
            &host.name,
            "templates",
            format_ids(&host.template_ids),
            format_ids(target),
        );
        let update = HostUpdate::templates(host.host_id, target.iter().copied());
        Ok(match self.write(change, |b| b.update_host(&update))? {
            Written::Done(()) => {
                host.template_ids.clone_from(target);
                ApplyResult::Modified
            }
            Written::Declined => declined(),
            Written::Rejected(err) => failed(&err),
        })
    }

    /// Replace the group set with `target` plus the sentinel group
    pub fn ensure_groups(
        &mut self,
        host: &mut ActualHost,
        target: &BTreeSet<u64>,
    ) -> Result<ApplyResult, SyncError> {
        let mut target = target.clone();
        target.insert(self.sentinel);
        if host.group_ids == target {
            return Ok(ApplyResult::NoChange);
        }
        let change = Change::update(
            &host.name,
            "groups",
            format_ids(&host.group_ids),
            format_ids(&target),
        );
        let update = HostUpdate::groups(host.host_id, target.iter().copied());
        Ok(match self.write(change, |b| b.update_host(&update))? {
            Written::Done(()) => {
                host.group_ids = target;
                ApplyResult::Modified
            }
            Written::Declined => declined(),
            Written::Rejected(err) => failed(&err),
        })
    }

    /// Rename (technical and visible name)
    pub fn ensure_name(
        &mut self,
        host: &mut ActualHost,
        target: &str,
    ) -> Result<ApplyResult, SyncError> {
        if host.name == target {
            return Ok(ApplyResult::NoChange);
        }
        let change = Change::update(target, "name", &host.name, target);
        let update = HostUpdate::rename(host.host_id, target);
        Ok(match self.write(change, |b| b.update_host(&update))? {
            Written::Done(()) => {
                host.name = target.to_string();
                ApplyResult::Modified
            }
            Written::Declined => declined(),
            Written::Rejected(err) => failed(&err),
        })
    }

    /// One `host.create` with a single SNMP interface; groups gain the
    /// sentinel
    pub fn create_host(
        &mut self,
        name: &str,
        ip: &str,
        groups: &BTreeSet<u64>,
        templates: &BTreeSet<u64>,
    ) -> Result<Created, SyncError> {
        let mut group_ids = groups.clone();
        group_ids.insert(self.sentinel);
        let spec = self.interface_spec(ip);
        let new_host = NewHost {
            host: name.to_string(),
            name: name.to_string(),
            groups: group_ids
                .iter()
                .map(|&group_id| GroupRef { group_id })
                .collect(),
            templates: templates
                .iter()
                .map(|&template_id| TemplateRef { template_id })
                .collect(),
            interfaces: vec![spec.clone()],
        };

        let after = format!(
            "{} groups {} templates {}",
            describe_spec(&spec),
            format_ids(&group_ids),
            format_ids(templates)
        );
        let change = Change::create(name, "host", after);
        Ok(match self.write(change, |b| b.create_host(&new_host))? {
            Written::Done(host_id) => Created::Host(ActualHost {
                host_id,
                name: name.to_string(),
                status: HostStatus::Enabled,
                // The created interface id is not returned by host.create.
                interfaces: vec![HostInterface::from_spec(0, &spec)],
                group_ids,
                template_ids: templates.clone(),
            }),
            Written::Declined => Created::Declined,
            Written::Rejected(err) if err.is_conflict() => Created::Conflict(err.detail()),
            Written::Rejected(err) => Created::Rejected(err.detail()),
        })
    }
}

fn declined() -> ApplyResult {
    ApplyResult::Skipped {
        reason: "declined".to_string(),
    }
}

fn failed(err: &zabbixkit::Error) -> ApplyResult {
    ApplyResult::Failed {
        error: err.detail(),
    }
}

/// `{5, 42}`
pub fn format_ids(ids: &BTreeSet<u64>) -> String {
    let inner = ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{inner}}}")
}

fn describe_interface(interface: &HostInterface) -> String {
    let mut text = format!(
        "{:?} {}:{}",
        interface.kind, interface.ip, interface.port
    )
    .to_lowercase();
    if let Some(details) = &interface.details {
        text.push_str(&format!(" v{}", details.version));
        if details.bulk {
            text.push_str(" bulk");
        }
    }
    text
}

fn describe_spec(spec: &InterfaceSpec) -> String {
    describe_interface(&HostInterface::from_spec(0, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::Scope;
    use converge::{AutoConfirm, AutoDecline};
    use zabbixkit::backend::MockCall;
    use zabbixkit::{ErrorCategory, Host, MockBackend};

    const SENTINEL: u64 = 42;

    fn seed(mock: &MockBackend, name: &str, ip: &str) -> ActualHost {
        let id = mock
            .create_host(&NewHost {
                host: name.into(),
                name: name.into(),
                groups: vec![GroupRef { group_id: SENTINEL }],
                templates: vec![],
                interfaces: vec![InterfaceSpec::snmp_v2c(ip, "public")],
            })
            .unwrap();
        mock.clear_writes();
        let host: Host = mock.hosts().into_iter().find(|h| h.host_id == id).unwrap();
        ActualHost::from(host)
    }

    fn applier<'a>(mock: &'a MockBackend, confirm: &'a mut dyn ConfirmCallback) -> Applier<'a> {
        Applier::new(mock, confirm, "public", SENTINEL, RunReport::new(Scope::Full))
    }

    #[test]
    fn test_format_ids() {
        assert_eq!(format_ids(&BTreeSet::from([42, 5])), "{5, 42}");
        assert_eq!(format_ids(&BTreeSet::new()), "{}");
    }

    #[test]
    fn test_matching_host_needs_no_writes() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);

        assert_eq!(
            applier.ensure_interfaces(&mut host, "10.0.0.1").unwrap(),
            ApplyResult::NoChange
        );
        assert_eq!(
            applier.ensure_status(&mut host, HostStatus::Enabled).unwrap(),
            ApplyResult::NoChange
        );
        assert_eq!(
            applier.ensure_groups(&mut host, &BTreeSet::new()).unwrap(),
            ApplyResult::NoChange
        );
        assert_eq!(
            applier.ensure_name(&mut host, "r1").unwrap(),
            ApplyResult::NoChange
        );
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_interface_update_and_extra_delete() {
        let mock = MockBackend::new();
        let host = seed(&mock, "r1", "10.0.0.1");
        mock.create_interface(host.host_id, &InterfaceSpec::snmp_v2c("10.0.0.9", "public"))
            .unwrap();
        mock.clear_writes();
        let mut host = ActualHost::from(mock.host("r1").unwrap());

        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);
        let result = applier.ensure_interfaces(&mut host, "10.0.0.5").unwrap();
        assert_eq!(result, ApplyResult::Modified);

        let writes = mock.writes();
        assert_eq!(writes.len(), 2);
        assert!(matches!(writes[0], MockCall::UpdateInterface { .. }));
        assert!(matches!(writes[1], MockCall::DeleteInterfaces(ref ids) if ids.len() == 1));

        let stored = mock.host("r1").unwrap();
        assert_eq!(stored.interfaces.len(), 1);
        assert_eq!(stored.interfaces[0].ip, "10.0.0.5");
        assert_eq!(host.interfaces.len(), 1);
        assert_eq!(applier.into_report().changes.len(), 2);
    }

    #[test]
    fn test_community_change_is_an_interface_update() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        let mut confirm = AutoConfirm;
        let mut applier = Applier::new(
            &mock,
            &mut confirm,
            "private",
            SENTINEL,
            RunReport::new(Scope::Full),
        );

        applier.ensure_interfaces(&mut host, "10.0.0.1").unwrap();
        let report = applier.into_report();
        assert_eq!(report.changes.len(), 1);
        assert!(report.changes[0].after.as_deref().unwrap().ends_with("(details)"));
        assert_eq!(
            mock.host("r1").unwrap().interfaces[0]
                .details
                .as_ref()
                .unwrap()
                .community,
            "private"
        );
    }

    #[test]
    fn test_host_without_interface_gets_one() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        mock.delete_interfaces(&[host.interfaces[0].interface_id])
            .unwrap();
        mock.clear_writes();
        host.interfaces.clear();

        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);
        applier.ensure_interfaces(&mut host, "10.0.0.1").unwrap();
        assert!(matches!(mock.writes()[0], MockCall::CreateInterface { .. }));
        assert_eq!(mock.host("r1").unwrap().interfaces.len(), 1);
    }

    #[test]
    fn test_groups_always_include_sentinel() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);

        applier
            .ensure_groups(&mut host, &BTreeSet::from([5]))
            .unwrap();
        assert_eq!(host.group_ids, BTreeSet::from([5, SENTINEL]));
        assert_eq!(
            mock.writes(),
            vec![MockCall::UpdateHost(HostUpdate::groups(host.host_id, [5, SENTINEL]))]
        );
    }

    #[test]
    fn test_declined_write_is_skipped() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        let mut confirm = AutoDecline;
        let mut applier = applier(&mock, &mut confirm);

        let result = applier
            .ensure_status(&mut host, HostStatus::Disabled)
            .unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert_eq!(host.status, HostStatus::Enabled);
        assert!(mock.writes().is_empty());
        assert_eq!(applier.into_report().declined.len(), 1);
    }

    #[test]
    fn test_rejected_write_fails_step() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        mock.reject_writes_for(host.host_id);
        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);

        let result = applier
            .ensure_templates(&mut host, &BTreeSet::from([10]))
            .unwrap();
        assert!(matches!(result, ApplyResult::Failed { .. }));
        assert!(host.template_ids.is_empty());
        assert!(applier.into_report().changes.is_empty());
    }

    #[test]
    fn test_fatal_write_aborts() {
        let mock = MockBackend::new();
        let mut host = seed(&mock, "r1", "10.0.0.1");
        mock.set_unavailable(true);
        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);

        let err = applier
            .ensure_status(&mut host, HostStatus::Disabled)
            .unwrap_err();
        assert!(matches!(err, SyncError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_create_conflict() {
        let mock = MockBackend::new();
        seed(&mock, "r1", "10.0.0.1");
        let mut confirm = AutoConfirm;
        let mut applier = applier(&mock, &mut confirm);

        let created = applier
            .create_host("r1", "10.0.0.2", &BTreeSet::from([5]), &BTreeSet::new())
            .unwrap();
        match created {
            Created::Conflict(detail) => assert!(detail.contains("already exists")),
            other => panic!("expected conflict, got {other:?}"),
        }
        let err = zabbixkit::Error::api("host.create", 1, "x", "already exists");
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }
}
