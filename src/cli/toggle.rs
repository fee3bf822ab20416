use std::process;

use clap::Parser;
use homecfg::{
    Session, ToggleError,
    domain::{ChoiceId, OverrideNote},
    engine::{self, ToggleOutcome},
};
use tracing::instrument;

use super::{Workspace, prompt::TerminalPrompt, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Change the quantity of a choice and save the scenario")]
pub struct Toggle {
    /// The id of the choice to change
    #[clap(value_parser = super::parse_choice)]
    choice: ChoiceId,

    /// The new quantity; 0 deselects
    #[arg(long, short, default_value_t = 1)]
    quantity: u32,

    /// Confirm every deselection without asking
    #[arg(long, short)]
    yes: bool,

    /// Override note for a locked or conflicting selection
    #[arg(long)]
    note: Option<String>,

    /// Show what would change without applying it
    #[arg(long)]
    dry_run: bool,
}

impl Toggle {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut session = workspace.load()?;
        let toggle = engine::Toggle::with_quantity(self.choice, self.quantity);

        if self.dry_run {
            return Self::preview(&session, toggle);
        }

        let note = self.note.map(OverrideNote::new).transpose()?;
        let mut prompt = TerminalPrompt {
            assume_yes: self.yes,
            note,
        };

        match session.toggle(toggle, &mut prompt) {
            Ok(outcome) => {
                workspace.save(&session)?;
                Self::report(&session, &outcome);
                Ok(())
            }
            Err(ToggleError::Cancelled(_)) => {
                println!("Cancelled");
                process::exit(130);
            }
            Err(e) => Err(e.into()),
        }
    }

    fn preview(session: &Session, toggle: engine::Toggle) -> anyhow::Result<()> {
        let plan = session.preview(toggle)?;

        if plan.is_isolated() {
            println!("{}", "No other choices are affected".dim());
        } else {
            println!("{}", session.impact_warning(&plan));
        }
        if plan.needs_confirmation {
            println!("{}", "Confirmation would be required".warning());
        }
        let monotony = session.monotony(toggle.choice);
        if toggle.is_selection() && monotony.state.is_blocking() {
            println!("{}", "An override note would be required".warning());
        }
        Ok(())
    }

    fn report(session: &Session, outcome: &ToggleOutcome) {
        let tree = session.tree();
        let label = tree.label(outcome.toggle.choice).unwrap_or_default();

        let verb = if outcome.toggle.is_selection() {
            format!("Set {label} to {}", outcome.toggle.quantity)
        } else {
            format!("Deselected {label}")
        };
        println!("{}", format!("✅ {verb}").success());

        for choice in outcome.deselected.iter().chain(&outcome.impacted) {
            let label = tree.label(*choice).unwrap_or_default();
            println!("  • deselected {label}");
        }
        if outcome.mapping_changed {
            println!("{}", "  Option mapping of dependent choices changed".dim());
        }
        if let Some(note) = &outcome.override_note {
            println!("{}", format!("  Override: {note}").dim());
        }
        if !outcome.enablement.converged {
            println!(
                "{}",
                format!(
                    "  Rules did not settle; {} node(s) left disabled",
                    outcome.enablement.failed_closed.len()
                )
                .warning()
            );
        }
        println!("  Total: {}", outcome.price.total);
    }
}
