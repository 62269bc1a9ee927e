//! Backend trait for reading devices, with NetBox and in-memory
//! implementations.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use netboxkit::backend::{Backend, MockBackend};
//! use netboxkit::Device;
//!
//! let mock = MockBackend::new();
//! mock.add_device(
//!     Device::active(1, "r1")
//!         .with_primary_ip("10.0.0.1/24")
//!         .with_custom_field("monitoring_class", "router"),
//! );
//!
//! let devices = mock.active_devices("monitoring_class", "router").unwrap();
//! assert_eq!(devices.len(), 1);
//! ```

pub mod netbox;

use crate::error::{Error, Result};
use crate::types::Device;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Read access to the device inventory.
pub trait Backend: Send + Sync {
    /// Active devices whose custom field `field` equals `tag`.
    ///
    /// All pages are fetched before returning.
    fn active_devices(&self, field: &str, tag: &str) -> Result<Vec<Device>>;

    /// A single device by inventory id, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if the id does not exist.
    fn device(&self, id: u64) -> Result<Device>;
}

#[derive(Debug, Default)]
struct MockState {
    devices: BTreeMap<u64, Device>,
    unavailable: bool,
}

/// In-memory inventory for tests.
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

    /// Add or replace a device.
    pub fn add_device(&self, device: Device) {
        self.state().devices.insert(device.id, device);
    }

    /// Make every call fail with a network error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    fn check_available(state: &MockState) -> Result<()> {
        if state.unavailable {
            Err(Error::http("connection refused", None))
        } else {
            Ok(())
        }
    }
}

impl Backend for MockBackend {
    fn active_devices(&self, field: &str, tag: &str) -> Result<Vec<Device>> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state
            .devices
            .values()
            .filter(|d| d.is_active() && d.custom_field_str(field) == Some(tag))
            .cloned()
            .collect())
    }

    fn device(&self, id: u64) -> Result<Device> {
        let state = self.state();
        Self::check_available(&state)?;
        state
            .devices
            .get(&id)
            .cloned()
            .ok_or(Error::DeviceNotFound { id })
    }
}
