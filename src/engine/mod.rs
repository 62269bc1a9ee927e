//! Sync engine
//!
//! The engine runs one pass at a time:
//! 1. Fetching - Desired devices from the inventory, managed hosts from
//!    monitoring
//! 2. Reconciling - Match each device to a host by name, then by IP
//! 3. Applying - Gated, idempotent writes, then the stale-host sweep

pub mod applier;
pub mod display;
pub mod fetch;
pub mod model;
pub mod reconciler;
pub mod report;

pub use display::display_report;
pub use reconciler::{Reconciler, SyncOptions};
pub use report::RunReport;
