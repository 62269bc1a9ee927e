//! NetBox REST backend.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{ACTIVE, Device, Page};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default page size for list requests.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Upper bound on pages followed for one query.
const MAX_PAGES: usize = 10_000;

/// Largest response body read, well above one full page of devices.
const MAX_RESPONSE_SIZE: u64 = 256 * 1024 * 1024;

/// NetBox REST backend.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use netboxkit::backend::netbox::NetboxBackend;
/// use netboxkit::backend::Backend;
///
/// let backend = NetboxBackend::new(
///     "https://netbox.example.com",
///     "0123456789abcdef",
///     Duration::from_secs(30),
/// );
/// let routers = backend.active_devices("monitoring_class", "router").unwrap();
/// println!("{} routers", routers.len());
/// ```
pub struct NetboxBackend {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    page_size: u32,
}

impl NetboxBackend {
    /// Create a backend for the NetBox instance at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of objects requested per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn devices_url(&self) -> String {
        format!("{}/api/dcim/devices/", self.base_url)
    }

    fn device_url(&self, id: u64) -> String {
        format!("{}/api/dcim/devices/{id}/", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = self
            .agent
            .get(url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let body = request
            .call()?
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_SIZE)
            .read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Backend for NetboxBackend {
    fn active_devices(&self, field: &str, tag: &str) -> Result<Vec<Device>> {
        let filter = format!("cf_{field}");
        let limit = self.page_size.to_string();
        let first: Page<Device> = self.get(
            &self.devices_url(),
            &[("status", ACTIVE), (filter.as_str(), tag), ("limit", limit.as_str())],
        )?;

        let mut devices = first.results;
        let mut next = first.next;
        let mut pages = 1;
        while let Some(url) = next {
            if pages >= MAX_PAGES {
                return Err(Error::InvalidResponse(format!(
                    "pagination did not end after {MAX_PAGES} pages"
                )));
            }
            // `next` already carries the filters and offset.
            let page: Page<Device> = self.get(&url, &[])?;
            devices.extend(page.results);
            next = page.next;
            pages += 1;
        }
        Ok(devices)
    }

    fn device(&self, id: u64) -> Result<Device> {
        self.get(&self.device_url(id), &[]).map_err(|err| match err {
            Error::Http {
                status: Some(404), ..
            } => Error::DeviceNotFound { id },
            other => other,
        })
    }
}
