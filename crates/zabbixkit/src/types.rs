//! Zabbix API object types.
//!
//! Zabbix returns numeric ids and flags as JSON strings (`"10084"`, `"1"`).
//! The wire helpers accept either strings or numbers on input and always
//! emit strings, matching what `*.get` methods return.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Fixed SNMP port used for every managed interface.
pub const SNMP_PORT: &str = "161";

/// Host monitoring status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStatus {
    /// Monitored host (`"0"`).
    Enabled,
    /// Unmonitored host (`"1"`).
    Disabled,
}

impl HostStatus {
    /// Wire representation.
    #[must_use]
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Enabled => "0",
            Self::Disabled => "1",
        }
    }
}

impl Serialize for HostStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for HostStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match wire::number(deserializer)? {
            0 => Ok(Self::Enabled),
            1 => Ok(Self::Disabled),
            other => Err(de::Error::custom(format!("unknown host status {other}"))),
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Host interface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Zabbix agent.
    Agent,
    /// SNMP.
    Snmp,
    /// IPMI.
    Ipmi,
    /// JMX.
    Jmx,
}

impl InterfaceType {
    /// Wire representation.
    #[must_use]
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Agent => "1",
            Self::Snmp => "2",
            Self::Ipmi => "3",
            Self::Jmx => "4",
        }
    }
}

impl Serialize for InterfaceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for InterfaceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match wire::number(deserializer)? {
            1 => Ok(Self::Agent),
            2 => Ok(Self::Snmp),
            3 => Ok(Self::Ipmi),
            4 => Ok(Self::Jmx),
            other => Err(de::Error::custom(format!("unknown interface type {other}"))),
        }
    }
}

/// SNMP interface details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpDetails {
    /// SNMP version (1, 2 or 3).
    #[serde(with = "wire::id")]
    pub version: u64,
    /// Whether bulk requests are used.
    #[serde(with = "wire::flag", default)]
    pub bulk: bool,
    /// Community string (v1/v2c).
    #[serde(default)]
    pub community: String,
}

impl SnmpDetails {
    /// SNMP v2c with bulk requests enabled.
    pub fn v2c(community: impl Into<String>) -> Self {
        Self {
            version: 2,
            bulk: true,
            community: community.into(),
        }
    }
}

/// Reference to a host group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef {
    /// Host group id.
    #[serde(rename = "groupid", with = "wire::id")]
    pub group_id: u64,
}

/// Reference to a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    /// Template id.
    #[serde(rename = "templateid", with = "wire::id")]
    pub template_id: u64,
}

/// A host interface as returned by `host.get` / `hostinterface.get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInterface {
    /// Interface id.
    #[serde(rename = "interfaceid", with = "wire::id")]
    pub interface_id: u64,
    /// IP address.
    #[serde(default)]
    pub ip: String,
    /// DNS name.
    #[serde(default)]
    pub dns: String,
    /// Port.
    #[serde(default)]
    pub port: String,
    /// Whether this is the default interface of its type.
    #[serde(with = "wire::flag", default)]
    pub main: bool,
    /// Interface type.
    #[serde(rename = "type")]
    pub kind: InterfaceType,
    /// SNMP details; `None` for non-SNMP interfaces.
    #[serde(default, deserialize_with = "wire::details")]
    pub details: Option<SnmpDetails>,
}

impl HostInterface {
    /// Build the interface a spec would produce.
    #[must_use]
    pub fn from_spec(interface_id: u64, spec: &InterfaceSpec) -> Self {
        Self {
            interface_id,
            ip: spec.ip.clone(),
            dns: spec.dns.clone(),
            port: spec.port.clone(),
            main: spec.main,
            kind: spec.kind,
            details: Some(spec.details.clone()),
        }
    }
}

/// A host as returned by `host.get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Host id.
    #[serde(rename = "hostid", with = "wire::id")]
    pub host_id: u64,
    /// Technical host name.
    pub host: String,
    /// Visible name.
    #[serde(default)]
    pub name: String,
    /// Monitoring status.
    pub status: HostStatus,
    /// Interfaces.
    #[serde(default)]
    pub interfaces: Vec<HostInterface>,
    /// Host groups (`hostgroups` on Zabbix 6.2+).
    #[serde(default, alias = "hostgroups")]
    pub groups: Vec<GroupRef>,
    /// Directly linked templates.
    #[serde(default, rename = "parentTemplates")]
    pub parent_templates: Vec<TemplateRef>,
}

/// Interface definition used by create and update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceSpec {
    /// Interface type.
    #[serde(rename = "type")]
    pub kind: InterfaceType,
    /// Default interface flag.
    #[serde(with = "wire::flag")]
    pub main: bool,
    /// Connect by IP rather than DNS.
    #[serde(rename = "useip", with = "wire::flag")]
    pub use_ip: bool,
    /// IP address.
    pub ip: String,
    /// DNS name.
    pub dns: String,
    /// Port.
    pub port: String,
    /// SNMP details.
    pub details: SnmpDetails,
}

impl InterfaceSpec {
    /// Main SNMP v2c interface on port 161, bulk enabled.
    pub fn snmp_v2c(ip: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            kind: InterfaceType::Snmp,
            main: true,
            use_ip: true,
            ip: ip.into(),
            dns: String::new(),
            port: SNMP_PORT.to_string(),
            details: SnmpDetails::v2c(community),
        }
    }

    /// Whether an existing interface already matches this spec.
    #[must_use]
    pub fn matches(&self, interface: &HostInterface) -> bool {
        interface.kind == self.kind
            && interface.ip == self.ip
            && interface.port == self.port
            && interface.details.as_ref() == Some(&self.details)
    }
}

/// Parameters of `host.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHost {
    /// Technical host name.
    pub host: String,
    /// Visible name.
    pub name: String,
    /// Host groups.
    pub groups: Vec<GroupRef>,
    /// Templates to link.
    pub templates: Vec<TemplateRef>,
    /// Interfaces.
    pub interfaces: Vec<InterfaceSpec>,
}

/// Parameters of `host.update`; unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostUpdate {
    /// Host to update.
    #[serde(rename = "hostid", with = "wire::id")]
    pub host_id: u64,
    /// New technical name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// New visible name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HostStatus>,
    /// Replacement group set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupRef>>,
    /// Replacement template set; templates left out are unlinked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<TemplateRef>>,
}

impl HostUpdate {
    /// Update that changes nothing.
    #[must_use]
    pub fn new(host_id: u64) -> Self {
        Self {
            host_id,
            host: None,
            name: None,
            status: None,
            groups: None,
            templates: None,
        }
    }

    /// Rename the host (technical and visible name).
    pub fn rename(host_id: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            host: Some(name.clone()),
            name: Some(name),
            ..Self::new(host_id)
        }
    }

    /// Change the monitoring status.
    #[must_use]
    pub fn status(host_id: u64, status: HostStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::new(host_id)
        }
    }

    /// Replace the host groups.
    pub fn groups(host_id: u64, group_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            groups: Some(
                group_ids
                    .into_iter()
                    .map(|group_id| GroupRef { group_id })
                    .collect(),
            ),
            ..Self::new(host_id)
        }
    }

    /// Replace the linked templates.
    pub fn templates(host_id: u64, template_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            templates: Some(
                template_ids
                    .into_iter()
                    .map(|template_id| TemplateRef { template_id })
                    .collect(),
            ),
            ..Self::new(host_id)
        }
    }
}

/// Serde helpers for Zabbix's stringly-typed wire format.
pub(crate) mod wire {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    use super::SnmpDetails;

    /// A JSON value that is either a string or an unsigned number.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u64),
    }

    impl StrOrNum {
        fn as_u64(&self) -> Result<u64, String> {
            match self {
                Self::Str(s) => s
                    .trim()
                    .parse()
                    .map_err(|_| format!("expected a number, got {s:?}")),
                Self::Num(n) => Ok(*n),
            }
        }
    }

    /// Read a number sent either as a string or as a JSON number.
    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        StrOrNum::deserialize(deserializer)?
            .as_u64()
            .map_err(de::Error::custom)
    }

    pub mod id {
        use super::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(value)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            super::number(deserializer)
        }
    }

    pub mod flag {
        use super::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(if *value { "1" } else { "0" })
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
            super::number(deserializer).map(|n| n != 0)
        }
    }

    /// Zabbix sends `"details": []` for interfaces without details.
    pub fn details<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SnmpDetails>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_object() {
            SnmpDetails::deserialize(value)
                .map(Some)
                .map_err(de::Error::custom)
        } else {
            Ok(None)
        }
    }
}
