use board::engine::Confirm;
use tracing::{debug, warn};

/// Terminal confirmation via `dialoguer`, or unconditional when `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    assume_yes: bool,
}

impl Prompt {
    #[must_use]
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for Prompt {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            debug!(prompt, "auto-confirmed");
            return true;
        }
        match dialoguer::Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            // No terminal to ask on; treat as declined.
            Err(e) => {
                warn!(error = %e, "confirmation prompt unavailable; pass --yes to confirm");
                false
            }
        }
    }
}
