//! # netboxkit
//!
//! Blocking client for reading device inventory from NetBox.
//!
//! Only the DCIM device endpoints are covered: listing active devices
//! filtered by a custom field, and fetching a single device by id.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use netboxkit::backend::Backend;
//! use netboxkit::NetboxBackend;
//!
//! let netbox = NetboxBackend::new("https://netbox.example.com", "token", Duration::from_secs(30))
//!     .with_page_size(500);
//!
//! for device in netbox.active_devices("monitoring_class", "router")? {
//!     println!("{:?} {:?}", device.name, device.management_ip());
//! }
//! # Ok::<(), netboxkit::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::MockBackend;
pub use backend::netbox::NetboxBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{Choice, Device, IpAddressRef, Page};
