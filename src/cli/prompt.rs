//! Interactive answers to the engine's prompts.

use dialoguer::{Confirm, Input, Select};
use homecfg::{
    domain::OverrideNote,
    engine::{ImpactWarning, OverrideDecision, OverrideRequest, Prompt},
};

use super::terminal::Colorize;

/// Asks on the terminal unless the answer was given on the command line.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    /// Confirm every impact without asking.
    pub assume_yes: bool,
    /// Use this note for every override request.
    pub note: Option<OverrideNote>,
}

impl Prompt for TerminalPrompt {
    fn confirm_impact(&mut self, warning: &ImpactWarning) -> bool {
        eprintln!("{}", warning.to_string().warning());
        if self.assume_yes {
            return true;
        }

        Confirm::new()
            .with_prompt("Proceed?")
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                tracing::debug!("confirmation aborted: {e}");
                false
            })
    }

    fn request_override(&mut self, request: &OverrideRequest) -> OverrideDecision {
        eprintln!("{}", format!("⚠️  {request}").warning());
        if let Some(note) = &self.note {
            return OverrideDecision::Override(note.clone());
        }
        if self.assume_yes {
            eprintln!("{}", "No override note given (use --note)".dim());
            return OverrideDecision::Cancel;
        }

        let answer = Select::new()
            .with_prompt("How do you want to proceed?")
            .item("Override with a note")
            .item("Acknowledge and leave it blocked")
            .item("Cancel")
            .default(2)
            .interact();

        match answer {
            Ok(0) => Input::<String>::new()
                .with_prompt("Override note")
                .validate_with(|text: &String| OverrideNote::new(text.as_str()).map(|_| ()))
                .interact_text()
                .ok()
                .and_then(|text| OverrideNote::new(text).ok())
                .map_or(OverrideDecision::Cancel, OverrideDecision::Override),
            Ok(1) => OverrideDecision::Acknowledge,
            _ => OverrideDecision::Cancel,
        }
    }
}
