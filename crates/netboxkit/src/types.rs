//! NetBox DCIM object types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status value NetBox uses for devices in service.
pub const ACTIVE: &str = "active";

/// A choice field (`{"value": "active", "label": "Active"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Machine value.
    pub value: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
}

/// A nested IP address reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRef {
    /// Address in CIDR notation (`10.0.0.1/24`).
    pub address: String,
}

/// A device as returned by `/api/dcim/devices/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Inventory id.
    pub id: u64,
    /// Device name; NetBox allows unnamed devices.
    pub name: Option<String>,
    /// Operational status.
    pub status: Choice,
    /// Primary IPv4 address, if assigned.
    #[serde(default)]
    pub primary_ip4: Option<IpAddressRef>,
    /// Custom field values keyed by field name.
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

impl Device {
    /// An active device with no address and no custom fields.
    pub fn active(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            status: Choice {
                value: ACTIVE.to_string(),
                label: "Active".to_string(),
            },
            primary_ip4: None,
            custom_fields: Map::new(),
        }
    }

    /// Set the primary IPv4 address (CIDR or bare).
    pub fn with_primary_ip(mut self, address: impl Into<String>) -> Self {
        self.primary_ip4 = Some(IpAddressRef {
            address: address.into(),
        });
        self
    }

    /// Set a custom field to a string value.
    pub fn with_custom_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields
            .insert(field.into(), Value::String(value.into()));
        self
    }

    /// Set the status value.
    pub fn with_status(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.status = Choice {
            label: value.clone(),
            value,
        };
        self
    }

    /// Whether the device is in service.
    pub fn is_active(&self) -> bool {
        self.status.value == ACTIVE
    }

    /// Primary IPv4 address without its prefix length.
    pub fn management_ip(&self) -> Option<&str> {
        self.primary_ip4
            .as_ref()
            .and_then(|ip| ip.address.split('/').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }

    /// String value of a custom field.
    ///
    /// Selection fields may come back as `{"value": ..., "label": ...}`;
    /// the machine value is returned for those.
    pub fn custom_field_str(&self, field: &str) -> Option<&str> {
        let value = match self.custom_fields.get(field)? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("value").and_then(Value::as_str),
            _ => None,
        };
        value.filter(|s| !s.is_empty())
    }
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Total number of objects across all pages.
    pub count: u64,
    /// Absolute URL of the next page.
    pub next: Option<String>,
    /// Objects on this page.
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_from_api() {
        let value = json!({
            "id": 12,
            "name": "r1",
            "display": "r1",
            "status": {"value": "active", "label": "Active"},
            "primary_ip4": {"id": 5, "family": {"value": 4}, "address": "10.0.0.1/24"},
            "custom_fields": {"monitoring_class": "router", "rack_unit": 4}
        });

        let device: Device = serde_json::from_value(value).unwrap();
        assert_eq!(device.id, 12);
        assert!(device.is_active());
        assert_eq!(device.management_ip(), Some("10.0.0.1"));
        assert_eq!(device.custom_field_str("monitoring_class"), Some("router"));
        assert_eq!(device.custom_field_str("rack_unit"), None);
        assert_eq!(device.custom_field_str("missing"), None);
    }

    #[test]
    fn test_device_without_ip_or_name() {
        let value = json!({
            "id": 13,
            "name": null,
            "status": {"value": "offline", "label": "Offline"},
            "primary_ip4": null,
            "custom_fields": {"monitoring_class": null}
        });

        let device: Device = serde_json::from_value(value).unwrap();
        assert!(device.name.is_none());
        assert!(!device.is_active());
        assert_eq!(device.management_ip(), None);
        assert_eq!(device.custom_field_str("monitoring_class"), None);
    }

    #[test]
    fn test_selection_field_object() {
        let mut device = Device::active(1, "sw1");
        device.custom_fields.insert(
            "monitoring_class".into(),
            json!({"value": "switch", "label": "Switch"}),
        );
        assert_eq!(device.custom_field_str("monitoring_class"), Some("switch"));
    }

    #[test]
    fn test_bare_address() {
        let device = Device::active(1, "r1").with_primary_ip("10.0.0.9");
        assert_eq!(device.management_ip(), Some("10.0.0.9"));
    }

    #[test]
    fn test_page() {
        let page: Page<Device> = serde_json::from_value(json!({
            "count": 2,
            "next": "https://netbox.example.com/api/dcim/devices/?limit=1&offset=1",
            "previous": null,
            "results": [{"id": 1, "name": "r1", "status": {"value": "active"}}]
        }))
        .unwrap();
        assert_eq!(page.count, 2);
        assert!(page.next.is_some());
        assert_eq!(page.results[0].status.label, "");
    }
}
