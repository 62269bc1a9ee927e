//! Reconciliation engine
//!
//! A full pass fetches both sides, converges every desired device and then
//! disables managed hosts that no desired device accounts for. A device
//! pass converges one inventory device and never sweeps.

use std::collections::HashSet;

use converge::{ApplyResult, ConfirmCallback};
use zabbixkit::HostStatus;

use crate::classification::{ClassRule, ClassificationMap};

use super::applier::{Applier, Created};
use super::fetch::{fetch_actual, fetch_by_ip, fetch_desired};
use super::model::{ActualHost, ActualState, DesiredDevice};
use super::report::{Issue, RunReport, Scope, SyncError};

/// Run-wide settings that do not come from the classification map
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Inventory custom field holding the classification tag
    pub class_field: String,
    pub community: String,
    /// Search the IP fallback outside the managed group
    pub adopt_unmanaged: bool,
}

pub struct Reconciler<'a> {
    inventory: &'a dyn netboxkit::backend::Backend,
    monitoring: &'a dyn zabbixkit::backend::Backend,
    classes: &'a ClassificationMap,
    options: SyncOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        inventory: &'a dyn netboxkit::backend::Backend,
        monitoring: &'a dyn zabbixkit::backend::Backend,
        classes: &'a ClassificationMap,
        options: SyncOptions,
    ) -> Self {
        Self {
            inventory,
            monitoring,
            classes,
            options,
        }
    }

    /// Full pass: every desired device, then the stale sweep
    pub fn run(&self, confirm: &mut dyn ConfirmCallback) -> Result<RunReport, SyncError> {
        let (desired, actual) = rayon::join(
            || fetch_desired(self.inventory, self.classes, &self.options.class_field),
            || fetch_actual(self.monitoring, self.classes.sentinel()),
        );
        let desired = desired?;
        let actual = actual?;
        if actual.is_empty() {
            log::warn!(
                "No hosts in managed group {}, every valid device will be created",
                self.classes.sentinel()
            );
        }
        log::info!(
            "{} desired devices, {} managed hosts",
            desired.len(),
            actual.len()
        );

        let mut pass = self.pass(confirm, Scope::Full, actual, names(&desired));
        for device in &desired {
            pass.reconcile(device)?;
        }
        pass.sweep()?;

        Ok(pass.applier.into_report().finish())
    }

    /// Single-device pass for inventory device `id`
    ///
    /// Devices without a recognized classification are left alone. An
    /// inactive device only has its existing host converged (and
    /// disabled); no host is ever created for it.
    pub fn run_device(
        &self,
        id: u64,
        confirm: &mut dyn ConfirmCallback,
    ) -> Result<RunReport, SyncError> {
        let device = match self.inventory.device(id) {
            Ok(device) => device,
            Err(err) if !err.is_fatal() => {
                log::warn!("device {id}: {err}. {}", err.category().advice());
                return Ok(RunReport::new(Scope::Device(id)).finish());
            }
            Err(err) => return Err(SyncError::inventory(err)),
        };

        let Some(tag) = device
            .custom_field_str(&self.options.class_field)
            .filter(|tag| self.classes.is_recognized(tag))
        else {
            log::info!(
                "device {id} has no recognized {} tag, not monitored",
                self.options.class_field
            );
            return Ok(RunReport::new(Scope::Device(id)).finish());
        };
        let desired = DesiredDevice::from_device(&device, tag);

        // The rest of the inventory still owns its hosts' names
        let (others, actual) = rayon::join(
            || fetch_desired(self.inventory, self.classes, &self.options.class_field),
            || fetch_actual(self.monitoring, self.classes.sentinel()),
        );
        let actual = actual?;
        let mut desired_names = names(&others?);
        desired_names.insert(desired.name.clone());
        let mut pass = self.pass(confirm, Scope::Device(id), actual, desired_names);
        pass.reconcile(&desired)?;

        Ok(pass.applier.into_report().finish())
    }

    fn pass<'b>(
        &self,
        confirm: &'b mut dyn ConfirmCallback,
        scope: Scope,
        actual: ActualState,
        desired_names: HashSet<String>,
    ) -> Pass<'a, 'b>
    where
        'a: 'b,
    {
        Pass {
            applier: Applier::new(
                self.monitoring,
                confirm,
                self.options.community.clone(),
                self.classes.sentinel(),
                RunReport::new(scope),
            ),
            monitoring: self.monitoring,
            classes: self.classes,
            adopt_unmanaged: self.options.adopt_unmanaged,
            actual,
            desired_names,
            seen: HashSet::new(),
            claimed: HashSet::new(),
        }
    }
}

fn names(devices: &[DesiredDevice]) -> HashSet<String> {
    devices
        .iter()
        .filter(|d| !d.name.is_empty())
        .map(|d| d.name.clone())
        .collect()
}

/// State carried across the devices of one pass
struct Pass<'a, 'b> {
    applier: Applier<'b>,
    monitoring: &'a dyn zabbixkit::backend::Backend,
    classes: &'a ClassificationMap,
    adopt_unmanaged: bool,
    actual: ActualState,
    /// Every named desired device, valid or not
    desired_names: HashSet<String>,
    /// Names already reconciled
    seen: HashSet<String>,
    /// Hosts matched, renamed or held by a conflict
    claimed: HashSet<u64>,
}

impl Pass<'_, '_> {
    /// Converge one desired device
    fn reconcile(&mut self, device: &DesiredDevice) -> Result<(), SyncError> {
        if device.name.is_empty() {
            self.skip_invalid(device, "missing name");
            return Ok(());
        }
        if !self.seen.insert(device.name.clone()) {
            self.skip_invalid(device, format!("duplicate name (inventory id {})", device.id));
            return Ok(());
        }
        let classes = self.classes;
        let Some(rule) = classes.rule(&device.classification) else {
            let reason = format!("unmapped classification {:?}", device.classification);
            self.skip_invalid(device, reason);
            return Ok(());
        };
        let ip = match device.valid_ip() {
            Ok(ip) => ip,
            Err(reason) => {
                self.skip_invalid(device, reason);
                return Ok(());
            }
        };

        if let Some(host) = self.actual.by_name(&device.name).cloned() {
            self.claimed.insert(host.host_id);
            let result = self.update(host, device, ip, rule)?;
            self.applier.report_mut().record(&result);
            return Ok(());
        }

        if !device.is_active {
            log::info!("{}: inactive and not monitored", device.name);
            self.applier.report_mut().record(&ApplyResult::NoChange);
            return Ok(());
        }

        let scope = (!self.adopt_unmanaged).then_some(classes.sentinel());
        let candidates = fetch_by_ip(self.monitoring, ip, scope)?;
        let result = match candidates.as_slice() {
            [] => self.create(device, ip, rule)?,
            [candidate] => {
                let held_elsewhere = self.claimed.contains(&candidate.host_id)
                    || (candidate.name != device.name
                        && self.desired_names.contains(&candidate.name));
                if held_elsewhere {
                    self.ambiguous(device, ip, &candidates);
                    return Ok(());
                }
                self.claimed.insert(candidate.host_id);
                let host = self
                    .actual
                    .get(candidate.host_id)
                    .cloned()
                    .unwrap_or_else(|| candidate.clone());
                self.rename_then_update(host, device, ip, rule)?
            }
            _ => {
                self.claimed.extend(candidates.iter().map(|h| h.host_id));
                self.ambiguous(device, ip, &candidates);
                return Ok(());
            }
        };
        self.applier.report_mut().record(&result);
        Ok(())
    }

    fn skip_invalid(&mut self, device: &DesiredDevice, reason: impl Into<String>) {
        let label = if device.name.is_empty() {
            format!("device {}", device.id)
        } else {
            device.name.clone()
        };
        let report = self.applier.report_mut();
        report.issue(Issue::SkippedInvalidDevice {
            device: label,
            reason: reason.into(),
        });
        report.record(&ApplyResult::Skipped {
            reason: "invalid device".to_string(),
        });
    }

    fn ambiguous(&mut self, device: &DesiredDevice, ip: &str, hosts: &[ActualHost]) {
        let report = self.applier.report_mut();
        report.issue(Issue::AmbiguousIPConflict {
            device: device.name.clone(),
            ip: ip.to_string(),
            hosts: hosts.iter().map(|h| h.name.clone()).collect(),
        });
        report.record(&ApplyResult::Skipped {
            reason: "ambiguous IP".to_string(),
        });
    }

    fn rejected(&mut self, host: &str, step: &str, detail: &str) {
        self.applier.report_mut().issue(Issue::WriteRejected {
            host: host.to_string(),
            step: step.to_string(),
            detail: detail.to_string(),
        });
    }

    fn create(
        &mut self,
        device: &DesiredDevice,
        ip: &str,
        rule: &ClassRule,
    ) -> Result<ApplyResult, SyncError> {
        let created = self
            .applier
            .create_host(&device.name, ip, &rule.groups, &rule.templates)?;
        Ok(match created {
            Created::Host(host) => {
                self.claimed.insert(host.host_id);
                self.actual.insert(host);
                ApplyResult::Created
            }
            Created::Declined => ApplyResult::Skipped {
                reason: "declined".to_string(),
            },
            Created::Conflict(detail) => {
                self.applier.report_mut().issue(Issue::CreateConflict {
                    device: device.name.clone(),
                    detail: detail.clone(),
                });
                ApplyResult::Failed { error: detail }
            }
            Created::Rejected(detail) => {
                self.rejected(&device.name, "create", &detail);
                ApplyResult::Failed { error: detail }
            }
        })
    }

    fn rename_then_update(
        &mut self,
        mut host: ActualHost,
        device: &DesiredDevice,
        ip: &str,
        rule: &ClassRule,
    ) -> Result<ApplyResult, SyncError> {
        let previous = host.name.clone();
        let renamed = self.applier.ensure_name(&mut host, &device.name)?;
        if let ApplyResult::Failed { error } = &renamed {
            self.rejected(&previous, "name", error);
            self.actual.insert(host);
            return Ok(renamed);
        }
        let updated = self.update(host, device, ip, rule)?;
        Ok(renamed.and(updated))
    }

    /// Update pass over a matched host; the snapshot keeps every accepted
    /// write
    fn update(
        &mut self,
        mut host: ActualHost,
        device: &DesiredDevice,
        ip: &str,
        rule: &ClassRule,
    ) -> Result<ApplyResult, SyncError> {
        let mut result = ApplyResult::NoChange;
        let outcome = self.converge(&mut host, device, ip, rule, &mut result);
        self.actual.insert(host);
        outcome.map(|()| result)
    }

    /// Interfaces, status, templates, groups; stops at the first rejection
    fn converge(
        &mut self,
        host: &mut ActualHost,
        device: &DesiredDevice,
        ip: &str,
        rule: &ClassRule,
        result: &mut ApplyResult,
    ) -> Result<(), SyncError> {
        let step = self.applier.ensure_interfaces(host, ip)?;
        if !self.absorb(&host.name, "interfaces", step, result) {
            return Ok(());
        }
        let step = self.applier.ensure_status(host, device.target_status())?;
        if !self.absorb(&host.name, "status", step, result) {
            return Ok(());
        }
        let step = self.applier.ensure_templates(host, &rule.templates)?;
        if !self.absorb(&host.name, "templates", step, result) {
            return Ok(());
        }
        let step = self.applier.ensure_groups(host, &rule.groups)?;
        self.absorb(&host.name, "groups", step, result);
        Ok(())
    }

    /// Fold a step into `result`; false if the step was rejected
    fn absorb(
        &mut self,
        host: &str,
        step: &str,
        outcome: ApplyResult,
        result: &mut ApplyResult,
    ) -> bool {
        let accepted = match &outcome {
            ApplyResult::Failed { error } => {
                self.rejected(host, step, error);
                false
            }
            _ => true,
        };
        *result = std::mem::replace(result, ApplyResult::NoChange).and(outcome);
        accepted
    }

    /// Disable managed hosts no desired device accounts for. Never deletes.
    fn sweep(&mut self) -> Result<(), SyncError> {
        let sentinel = self.classes.sentinel();
        let mut stale: Vec<ActualHost> = self
            .actual
            .hosts()
            .filter(|h| h.in_group(sentinel))
            .filter(|h| !self.claimed.contains(&h.host_id))
            .filter(|h| !self.desired_names.contains(&h.name))
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.name.cmp(&b.name));
        if !stale.is_empty() {
            log::info!("{} stale managed hosts", stale.len());
        }

        for mut host in stale {
            let result = self.applier.ensure_status(&mut host, HostStatus::Disabled)?;
            if let ApplyResult::Failed { error } = &result {
                self.rejected(&host.name, "status", error);
                self.applier.report_mut().record(&result);
            } else if result.is_change() {
                let report = self.applier.report_mut();
                report.disabled.push(host.name.clone());
                report.record(&ApplyResult::Removed);
            } else {
                self.applier.report_mut().record(&result);
            }
            self.actual.insert(host);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::System;
    use converge::{AutoConfirm, AutoDecline};
    use netboxkit::Device;
    use std::collections::{BTreeMap, BTreeSet};
    use zabbixkit::backend::MockCall;
    use zabbixkit::{
        GroupRef, Host, HostInterface, HostUpdate, InterfaceSpec, MockBackend, NewHost,
        TemplateRef,
    };

    const SENTINEL: u64 = 42;
    const FIELD: &str = "monitoring_class";

    fn classes() -> ClassificationMap {
        let mut rules = BTreeMap::new();
        rules.insert(
            "router".to_string(),
            ClassRule {
                groups: BTreeSet::from([5]),
                templates: BTreeSet::from([10]),
            },
        );
        ClassificationMap::new(rules, SENTINEL)
    }

    fn options() -> SyncOptions {
        SyncOptions {
            class_field: FIELD.to_string(),
            community: "public".to_string(),
            adopt_unmanaged: false,
        }
    }

    fn router(id: u64, name: &str, ip: &str) -> Device {
        Device::active(id, name)
            .with_primary_ip(format!("{ip}/24"))
            .with_custom_field(FIELD, "router")
    }

    fn host(id: u64, name: &str, ip: &str, groups: &[u64], templates: &[u64]) -> Host {
        Host {
            host_id: id,
            host: name.into(),
            name: name.into(),
            status: HostStatus::Enabled,
            interfaces: vec![HostInterface::from_spec(
                id * 10,
                &InterfaceSpec::snmp_v2c(ip, "public"),
            )],
            groups: groups.iter().map(|&group_id| GroupRef { group_id }).collect(),
            parent_templates: templates
                .iter()
                .map(|&template_id| TemplateRef { template_id })
                .collect(),
        }
    }

    struct Fixture {
        netbox: netboxkit::MockBackend,
        zabbix: MockBackend,
        classes: ClassificationMap,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                netbox: netboxkit::MockBackend::new(),
                zabbix: MockBackend::new(),
                classes: classes(),
            }
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.netbox, &self.zabbix, &self.classes, options())
        }

        fn run(&self) -> RunReport {
            self.reconciler().run(&mut AutoConfirm).unwrap()
        }

        fn run_device(&self, id: u64) -> RunReport {
            self.reconciler().run_device(id, &mut AutoConfirm).unwrap()
        }
    }

    #[test]
    fn test_creates_missing_host() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));

        let report = fx.run();
        assert_eq!(
            fx.zabbix.writes(),
            vec![MockCall::CreateHost(NewHost {
                host: "r1".into(),
                name: "r1".into(),
                groups: vec![GroupRef { group_id: 5 }, GroupRef { group_id: SENTINEL }],
                templates: vec![TemplateRef { template_id: 10 }],
                interfaces: vec![InterfaceSpec::snmp_v2c("10.0.0.1", "public")],
            })]
        );
        assert_eq!(report.summary.created, 1);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.netbox.add_device(router(2, "r2", "10.0.0.2"));
        fx.zabbix.add_host(host(7, "r2", "10.0.0.9", &[SENTINEL], &[]));
        fx.zabbix.add_host(host(8, "gone", "10.0.0.8", &[SENTINEL], &[]));

        let first = fx.run();
        assert!(first.has_writes());
        fx.zabbix.clear_writes();

        let second = fx.run();
        assert!(fx.zabbix.writes().is_empty());
        assert!(!second.has_writes());
        assert_eq!(second.summary.total_changes(), 0);
    }

    #[test]
    fn test_unlinks_extra_template() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix
            .add_host(host(7, "r1", "10.0.0.1", &[5, SENTINEL], &[10, 11]));

        let report = fx.run();
        assert_eq!(
            fx.zabbix.writes(),
            vec![MockCall::UpdateHost(HostUpdate::templates(7, [10]))]
        );
        assert_eq!(report.summary.modified, 1);

        fx.zabbix.clear_writes();
        fx.run();
        assert!(fx.zabbix.writes().is_empty());
    }

    #[test]
    fn test_device_without_ip_is_skipped() {
        let fx = Fixture::new();
        fx.netbox
            .add_device(Device::active(1, "r1").with_custom_field(FIELD, "router"));

        let report = fx.run();
        assert!(fx.zabbix.writes().is_empty());
        assert_eq!(report.count("SkippedInvalidDevice"), 1);
        assert_eq!(report.issues[0].subject(), "r1");
    }

    #[test]
    fn test_duplicate_name_keeps_lowest_id() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.netbox.add_device(router(2, "r1", "10.0.0.2"));

        let report = fx.run();
        assert_eq!(fx.zabbix.writes().len(), 1);
        assert_eq!(fx.zabbix.host("r1").unwrap().interfaces[0].ip, "10.0.0.1");
        assert_eq!(report.count("SkippedInvalidDevice"), 1);
    }

    #[test]
    fn test_shared_ip_is_a_conflict() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r9", "10.0.0.7"));
        fx.zabbix.add_host(host(7, "a", "10.0.0.7", &[SENTINEL], &[]));
        fx.zabbix.add_host(host(8, "b", "10.0.0.7", &[SENTINEL], &[]));

        let report = fx.run();
        assert!(fx.zabbix.writes().is_empty());
        assert_eq!(
            report.issues,
            vec![Issue::AmbiguousIPConflict {
                device: "r9".into(),
                ip: "10.0.0.7".into(),
                hosts: vec!["a".into(), "b".into()],
            }]
        );
    }

    #[test]
    fn test_ip_held_by_other_desired_device() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.netbox.add_device(router(2, "r2", "10.0.0.1"));
        fx.zabbix
            .add_host(host(7, "r1", "10.0.0.1", &[5, SENTINEL], &[10]));

        let report = fx.run();
        assert!(fx.zabbix.writes().is_empty());
        assert_eq!(report.count("AmbiguousIPConflict"), 1);
        assert_eq!(fx.zabbix.host("r1").unwrap().host_id, 7);
    }

    #[test]
    fn test_device_pass_keeps_host_of_other_desired_device() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.netbox.add_device(router(2, "r1-new", "10.0.0.1"));
        fx.zabbix
            .add_host(host(7, "r1", "10.0.0.1", &[5, SENTINEL], &[10]));

        let report = fx.run_device(2);
        assert!(fx.zabbix.writes().is_empty());
        assert_eq!(report.count("AmbiguousIPConflict"), 1);

        let full = fx.run();
        assert_eq!(fx.zabbix.host("r1").unwrap().host_id, 7);
        assert_eq!(full.count("AmbiguousIPConflict"), 1);
    }

    #[test]
    fn test_stale_host_is_disabled_not_deleted() {
        let fx = Fixture::new();
        fx.zabbix.add_host(host(7, "old", "10.0.0.5", &[SENTINEL], &[]));
        fx.zabbix.add_host(host(8, "manual", "10.0.0.6", &[3], &[]));

        let report = fx.run();
        assert_eq!(
            fx.zabbix.writes(),
            vec![MockCall::UpdateHost(HostUpdate::status(
                7,
                HostStatus::Disabled
            ))]
        );
        assert_eq!(report.disabled, vec!["old".to_string()]);
        assert_eq!(report.summary.removed, 1);
        assert_eq!(report.summary.modified, 0);
        assert_eq!(fx.zabbix.hosts().len(), 2);
        assert_eq!(fx.zabbix.host("old").unwrap().status, HostStatus::Disabled);
        assert_eq!(fx.zabbix.host("manual").unwrap().status, HostStatus::Enabled);
    }

    #[test]
    fn test_invalid_device_protects_its_host_from_sweep() {
        let fx = Fixture::new();
        fx.netbox
            .add_device(Device::active(1, "r1").with_custom_field(FIELD, "router"));
        fx.zabbix
            .add_host(host(7, "r1", "10.0.0.1", &[5, SENTINEL], &[10]));

        let report = fx.run();
        assert!(fx.zabbix.writes().is_empty());
        assert!(report.disabled.is_empty());
    }

    #[test]
    fn test_renames_host_found_by_ip() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix
            .add_host(host(7, "old-name", "10.0.0.1", &[5, SENTINEL], &[10]));

        let report = fx.run();
        assert_eq!(
            fx.zabbix.writes(),
            vec![MockCall::UpdateHost(HostUpdate::rename(7, "r1"))]
        );
        assert_eq!(fx.zabbix.host("r1").unwrap().host_id, 7);
        assert!(report.disabled.is_empty());
        assert_eq!(report.summary.modified, 1);
    }

    #[test]
    fn test_unmanaged_ip_match_is_ignored_by_default() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "legacy", "10.0.0.1", &[3], &[]));

        fx.run();
        assert!(matches!(fx.zabbix.writes()[0], MockCall::CreateHost(_)));
        assert_eq!(fx.zabbix.hosts().len(), 2);
    }

    #[test]
    fn test_adopts_unmanaged_host_when_enabled() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "legacy", "10.0.0.1", &[3], &[10]));

        let reconciler = Reconciler::new(
            &fx.netbox,
            &fx.zabbix,
            &fx.classes,
            SyncOptions {
                adopt_unmanaged: true,
                ..options()
            },
        );
        reconciler.run(&mut AutoConfirm).unwrap();

        let adopted = fx.zabbix.host("r1").unwrap();
        assert_eq!(adopted.host_id, 7);
        let groups: BTreeSet<u64> = adopted.groups.iter().map(|g| g.group_id).collect();
        assert_eq!(groups, BTreeSet::from([5, SENTINEL]));
    }

    #[test]
    fn test_existing_name_outside_scope_is_create_conflict() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "r1", "10.0.0.99", &[3], &[]));

        let report = fx.run();
        assert_eq!(report.count("CreateConflict"), 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(fx.zabbix.hosts().len(), 1);
    }

    #[test]
    fn test_rejected_step_abandons_device() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "r1", "10.0.0.2", &[SENTINEL], &[]));
        fx.zabbix.reject_writes_for(7);

        let report = fx.run();
        assert_eq!(fx.zabbix.writes().len(), 1);
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            &report.issues[0],
            Issue::WriteRejected { host, step, .. } if host == "r1" && step == "interfaces"
        ));
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "old", "10.0.0.5", &[SENTINEL], &[]));

        let report = fx.reconciler().run(&mut AutoDecline).unwrap();
        assert!(fx.zabbix.writes().is_empty());
        assert_eq!(report.declined.len(), 2);
        assert!(report.changes.is_empty());
        assert!(report.disabled.is_empty());
    }

    #[test]
    fn test_device_pass_disables_inactive_host() {
        let fx = Fixture::new();
        fx.netbox
            .add_device(router(1, "r1", "10.0.0.1").with_status("offline"));
        fx.zabbix
            .add_host(host(7, "r1", "10.0.0.1", &[5, SENTINEL], &[10]));

        let report = fx.run_device(1);
        assert_eq!(report.scope, Scope::Device(1));
        assert_eq!(
            fx.zabbix.writes(),
            vec![MockCall::UpdateHost(HostUpdate::status(
                7,
                HostStatus::Disabled
            ))]
        );
    }

    #[test]
    fn test_device_pass_never_creates_inactive() {
        let fx = Fixture::new();
        fx.netbox
            .add_device(router(1, "r1", "10.0.0.1").with_status("offline"));

        fx.run_device(1);
        assert!(fx.zabbix.writes().is_empty());
    }

    #[test]
    fn test_device_pass_skips_sweep() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "old", "10.0.0.5", &[SENTINEL], &[]));

        let report = fx.run_device(1);
        let writes = fx.zabbix.writes();
        assert_eq!(writes.len(), 1);
        assert!(matches!(writes[0], MockCall::CreateHost(_)));
        assert!(report.disabled.is_empty());
        assert_eq!(fx.zabbix.host("old").unwrap().status, HostStatus::Enabled);
    }

    #[test]
    fn test_device_pass_ignores_unknown_and_unclassified() {
        let fx = Fixture::new();
        fx.netbox.add_device(
            Device::active(2, "s1")
                .with_primary_ip("10.0.0.2/24")
                .with_custom_field(FIELD, "switch"),
        );

        let report = fx.run_device(99);
        assert_eq!(report.summary.total(), 0);
        fx.run_device(2);
        assert!(fx.zabbix.writes().is_empty());
    }

    #[test]
    fn test_inventory_outage_aborts_before_writes() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.add_host(host(7, "old", "10.0.0.5", &[SENTINEL], &[]));
        fx.netbox.set_unavailable(true);

        let err = fx.reconciler().run(&mut AutoConfirm).unwrap_err();
        assert!(matches!(
            err,
            SyncError::UpstreamUnavailable {
                system: System::Inventory,
                ..
            }
        ));
        assert!(fx.zabbix.writes().is_empty());
    }

    #[test]
    fn test_monitoring_outage_aborts() {
        let fx = Fixture::new();
        fx.netbox.add_device(router(1, "r1", "10.0.0.1"));
        fx.zabbix.set_unavailable(true);

        let err = fx.reconciler().run(&mut AutoConfirm).unwrap_err();
        assert!(matches!(
            err,
            SyncError::UpstreamUnavailable {
                system: System::Monitoring,
                ..
            }
        ));
    }
}
