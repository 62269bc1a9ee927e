//! Confirmation hooks consulted before every write
//!
//! These traits let a writer run unchanged under an interactive prompt,
//! an unattended job or a server-side approval queue.

use crate::change::Change;
use anyhow::Result;

/// Confirmation callback consulted before a write
///
/// Implement this trait to decide which changes may be applied.
/// Any `FnMut(&Change) -> Result<bool>` closure implements it too.
pub trait ConfirmCallback: Send {
    /// Decide whether `change` may be written
    ///
    /// # Returns
    /// `true` to apply the change, `false` to skip it
    fn confirm(&mut self, change: &Change) -> Result<bool>;
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _change: &Change) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _change: &Change) -> Result<bool> {
        Ok(false)
    }
}

impl<F> ConfirmCallback for F
where
    F: FnMut(&Change) -> Result<bool> + Send,
{
    fn confirm(&mut self, change: &Change) -> Result<bool> {
        self(change)
    }
}
