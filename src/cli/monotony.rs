use std::process;

use clap::Parser;
use homecfg::{
    domain::ChoiceId,
    engine::{MonotonyConflict, MonotonyState},
};
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check a choice against the lot's monotony rules")]
pub struct Monotony {
    /// The id of the choice to check
    #[clap(value_parser = super::parse_choice)]
    choice: ChoiceId,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Monotony {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let session = workspace.load()?;
        if session.tree().choice(self.choice).is_none() {
            anyhow::bail!("no choice with id {}", self.choice);
        }
        if !session.config().monotony_checks {
            tracing::info!("monotony checks are disabled");
        }

        let conflict = session.monotony(self.choice);
        let label = session.tree().label(self.choice).unwrap_or_default();

        match self.output {
            OutputFormat::Table => output_table(&label, &conflict),
            OutputFormat::Json => output_json(&label, &conflict)?,
        }

        if conflict.state.is_blocking() {
            process::exit(2);
        }
        Ok(())
    }
}

fn state_name(state: &MonotonyState) -> &'static str {
    match state {
        MonotonyState::NoConflict => "no_conflict",
        MonotonyState::Conflicted => "conflicted",
        MonotonyState::Acknowledged => "acknowledged",
        MonotonyState::Overridden(_) => "overridden",
    }
}

fn output_table(label: &str, conflict: &MonotonyConflict) {
    println!("{label}");
    let state = match &conflict.state {
        MonotonyState::NoConflict => "✅ No conflict".success(),
        MonotonyState::Conflicted => "❌ Matches a neighbouring home".error(),
        MonotonyState::Acknowledged => "❌ Matches a neighbouring home (acknowledged)".error(),
        MonotonyState::Overridden(note) => format!("⚠️  Overridden: {note}").warning(),
    };
    println!("  {state}");

    for group in &conflict.attribute_groups {
        let attributes: Vec<String> = group.attributes.iter().map(ToString::to_string).collect();
        let line = format!(
            "  Attribute group {}: conflicting attributes {}",
            group.group,
            attributes.join(", ")
        );
        if group.confirmed {
            println!("{} {}", line, "(confirmed)".dim());
        } else {
            println!("{}", line.warning());
        }
    }
}

fn output_json(label: &str, conflict: &MonotonyConflict) -> anyhow::Result<()> {
    use serde_json::json;

    let note = match &conflict.state {
        MonotonyState::Overridden(note) => Some(note),
        _ => None,
    };
    let groups: Vec<_> = conflict
        .attribute_groups
        .iter()
        .map(|group| {
            json!({
                "group": group.group,
                "attributes": group.attributes,
                "confirmed": group.confirmed,
            })
        })
        .collect();

    let output = json!({
        "choice": conflict.choice,
        "label": label,
        "state": state_name(&conflict.state),
        "override_note": note,
        "blocking": conflict.state.is_blocking(),
        "attribute_groups": groups,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use homecfg::domain::OverrideNote;

    use super::*;

    #[test]
    fn state_names_are_snake_case() {
        let note = OverrideNote::new("approved by sales").unwrap();
        assert_eq!(state_name(&MonotonyState::NoConflict), "no_conflict");
        assert_eq!(state_name(&MonotonyState::Overridden(note)), "overridden");
    }
}
