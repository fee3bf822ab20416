use std::process;

use clap::Parser;
use homecfg::{
    ToggleError,
    domain::{
        ChoiceId, OverrideNote, Selection,
        ids::{AttributeGroupId, AttributeId, LocationGroupId, LocationId},
    },
};
use tracing::instrument;

use super::{Workspace, prompt::TerminalPrompt, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Replace the attribute and location selections of a choice")]
pub struct Attributes {
    /// The id of the choice
    #[clap(value_parser = super::parse_choice)]
    choice: ChoiceId,

    /// An attribute for the whole choice, as GROUP:ATTRIBUTE
    #[arg(long = "attribute", value_name = "GROUP:ATTRIBUTE", value_parser = parse_attribute)]
    attributes: Vec<Selection>,

    /// A location, as GROUP:LOCATION:QUANTITY with an optional
    /// :ATTRIBUTE_GROUP:ATTRIBUTE suffix
    #[arg(long = "location", value_name = "LOCATION", value_parser = parse_location)]
    locations: Vec<Selection>,

    /// Confirm without asking
    #[arg(long, short)]
    yes: bool,

    /// Override note for attributes that match a neighbouring home
    #[arg(long)]
    note: Option<String>,
}

impl Attributes {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut session = workspace.load()?;
        let note = self.note.map(OverrideNote::new).transpose()?;
        let mut prompt = TerminalPrompt {
            assume_yes: self.yes,
            note,
        };

        let selections: Vec<Selection> = self.attributes.into_iter().chain(self.locations).collect();
        let count = selections.len();

        match session.select_attributes(self.choice, selections, &mut prompt) {
            Ok(placed) => {
                workspace.save(&session)?;
                let label = session.tree().label(self.choice).unwrap_or_default();
                println!(
                    "{}",
                    format!("✅ Recorded {count} selection(s) on {label}").success()
                );
                if placed > 0 {
                    println!("  {placed} unit(s) placed across locations");
                }
                Ok(())
            }
            Err(ToggleError::Cancelled(_)) => {
                println!("Cancelled");
                process::exit(130);
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn fields(s: &str) -> Result<Vec<u32>, String> {
    s.split(':')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid number '{part}' in '{s}': {e}"))
        })
        .collect()
}

/// Parses `GROUP:ATTRIBUTE`.
fn parse_attribute(s: &str) -> Result<Selection, String> {
    match fields(s)?.as_slice() {
        &[group, attribute] => Ok(Selection::AttributeOnly {
            attribute_group: AttributeGroupId(group),
            attribute: AttributeId(attribute),
        }),
        _ => Err(format!("expected GROUP:ATTRIBUTE, got '{s}'")),
    }
}

/// Parses `GROUP:LOCATION:QUANTITY[:ATTRIBUTE_GROUP:ATTRIBUTE]`.
fn parse_location(s: &str) -> Result<Selection, String> {
    match fields(s)?.as_slice() {
        &[group, location, quantity] => Ok(Selection::LocationOnly {
            location_group: LocationGroupId(group),
            location: LocationId(location),
            quantity,
        }),
        &[group, location, quantity, attribute_group, attribute] => {
            Ok(Selection::LocationAttribute {
                location_group: LocationGroupId(group),
                location: LocationId(location),
                quantity,
                attribute_group: AttributeGroupId(attribute_group),
                attribute: AttributeId(attribute),
            })
        }
        _ => Err(format!(
            "expected GROUP:LOCATION:QUANTITY[:ATTRIBUTE_GROUP:ATTRIBUTE], got '{s}'"
        )),
    }
}
