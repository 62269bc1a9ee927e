//! # zabbixkit
//!
//! Blocking client for the parts of the Zabbix JSON-RPC API that manage
//! hosts and their interfaces.
//!
//! This crate provides:
//! - [`Session`]: `user.login` / `user.logout` bounded API session
//! - Typed `host.get` results ([`Host`], [`HostInterface`]) that tolerate
//!   Zabbix's stringly-typed ids and flags
//! - [`backend::Backend`]: the host and interface calls, implemented by
//!   [`Session`] and by the in-memory [`MockBackend`]
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use zabbixkit::backend::Backend;
//! use zabbixkit::{HostUpdate, HostStatus, Session};
//!
//! let session = Session::login(
//!     "https://zabbix.example.com/api_jsonrpc.php",
//!     "Admin",
//!     "zabbix",
//!     Duration::from_secs(30),
//! )?;
//!
//! for host in session.hosts_in_group(42)? {
//!     if host.status == HostStatus::Disabled {
//!         session.update_host(&HostUpdate::status(host.host_id, HostStatus::Enabled))?;
//!     }
//! }
//! session.logout()?;
//! # Ok::<(), zabbixkit::Error>(())
//! ```
//!
//! ## Requirements
//!
//! Zabbix 6.4 or newer (bearer-token authentication, `selectHostGroups`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod session;
pub mod types;

pub use backend::MockBackend;
pub use error::{Error, ErrorCategory, Result};
pub use session::Session;
pub use types::{
    GroupRef, Host, HostInterface, HostStatus, HostUpdate, InterfaceSpec, InterfaceType,
    NewHost, SNMP_PORT, SnmpDetails, TemplateRef,
};
