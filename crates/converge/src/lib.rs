//! # Converge
//!
//! Shared vocabulary for converging a remote system towards a desired state.
//!
//! The crate does not talk to any system itself. It provides the pieces a
//! reconciler needs to describe and gate its writes:
//!
//! - **Change**: a single before/after difference on one target
//! - **ApplyResult**: the outcome of one converge operation
//! - **ExecuteSummary**: counters aggregated over a whole run
//! - **ConfirmCallback**: the hook consulted before every write
//!
//! ## Example
//!
//! ```ignore
//! use converge::{AutoConfirm, Change, ConfirmCallback};
//!
//! let change = Change::update("r1", "status", "disabled", "enabled");
//! let mut confirm = AutoConfirm;
//! assert!(confirm.confirm(&change)?);
//! ```
//!
//! ## Confirmation
//!
//! Writers never block on a terminal directly. They ask a [`ConfirmCallback`],
//! so the same code path works for an interactive prompt, an unattended run
//! ([`AutoConfirm`]), a dry run ([`AutoDecline`]) or an approval queue
//! (any `FnMut(&Change) -> Result<bool>`).

pub mod change;
pub mod context;
pub mod types;

pub use change::{Change, ChangeKind, ChangeSummary, group_by_target};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback};
pub use types::{ApplyResult, ExecuteSummary};
