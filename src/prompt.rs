//! Interactive confirmation before each write

use anyhow::Result;
use colored::Colorize;
use converge::{Change, ConfirmCallback};
use dialoguer::Confirm;

/// Asks on the terminal before every write
///
/// Answering "all" once stops further prompts for the rest of the run.
#[derive(Debug, Default)]
pub struct Prompt {
    approve_rest: bool,
}

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, change: &Change) -> Result<bool> {
        if self.approve_rest {
            return Ok(true);
        }

        let prompt = format!("{} {}", change.target.bold(), change.describe());
        let approved = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        if approved {
            self.approve_rest = Confirm::new()
                .with_prompt("Apply the remaining changes without asking?")
                .default(false)
                .interact()?;
        }
        Ok(approved)
    }
}
