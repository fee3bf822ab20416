use clap::Parser;
use homecfg::{
    Session,
    domain::{Choice, DecisionPoint},
};
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Display the decision tree with selections and rule state")]
pub struct Show {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Only list selected choices
    #[arg(long)]
    selected: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let session = workspace.load()?;

        match self.output {
            OutputFormat::Pretty => self.output_pretty(&session),
            OutputFormat::Json => self.output_json(&session)?,
        }
        Ok(())
    }

    fn visible<'a>(&self, session: &'a Session, point: &DecisionPoint) -> Vec<&'a Choice> {
        point
            .choices()
            .iter()
            .filter_map(|&id| session.tree().choice(id))
            .filter(|choice| !self.selected || choice.is_selected())
            .collect()
    }

    fn output_pretty(&self, session: &Session) {
        let tree = session.tree();

        for group in tree.groups() {
            println!("{}", group.label);
            for sub_group in &group.sub_groups {
                println!("  {}", sub_group.label.dim());
                for point in sub_group.points.iter().filter_map(|&id| tree.point(id)) {
                    let choices = self.visible(session, point);
                    if self.selected && choices.is_empty() {
                        continue;
                    }
                    println!("    {}{}", point.label, point_markers(point));
                    for choice in choices {
                        println!("      {}", choice_line(choice));
                    }
                }
            }
        }

        let report = session.enablement();
        println!();
        println!(
            "{}",
            format!(
                "Revision {}, rules settled after {} pass(es)",
                tree.revision(),
                report.passes
            )
            .dim()
        );
        if !report.converged {
            println!(
                "{}",
                format!(
                    "⚠️  Rules did not settle; {} node(s) left disabled",
                    report.failed_closed.len()
                )
                .warning()
            );
        }
        println!("Total: {}", session.price().total);
    }

    fn output_json(&self, session: &Session) -> anyhow::Result<()> {
        use serde_json::json;

        let tree = session.tree();
        let points: Vec<_> = tree
            .points()
            .iter()
            .map(|point| {
                let choices: Vec<_> = self
                    .visible(session, point)
                    .into_iter()
                    .map(|choice| {
                        json!({
                            "id": choice.id,
                            "label": choice.label,
                            "quantity": choice.quantity,
                            "enabled": choice.enabled,
                            "option_disabled": choice.option_disabled,
                            "override_note": choice.override_note,
                        })
                    })
                    .collect();
                json!({
                    "id": point.id,
                    "label": point.label,
                    "pick_type": point.pick_type,
                    "enabled": point.enabled,
                    "past_cut_off": point.is_past_cut_off,
                    "choices": choices,
                })
            })
            .collect();

        let output = json!({
            "revision": tree.revision(),
            "mode": session.mode(),
            "points": points,
            "price": session.price(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn point_markers(point: &DecisionPoint) -> String {
    let mut markers = String::new();
    if !point.enabled {
        markers.push_str(&" (disabled)".warning());
    }
    if point.is_past_cut_off {
        markers.push_str(" 🔒");
    }
    if point.is_structural {
        markers.push_str(&" (structural)".dim());
    }
    markers
}

fn choice_line(choice: &Choice) -> String {
    let check = if choice.is_selected() { "[x]" } else { "[ ]" };
    let mut line = format!("{check} {}", choice.label);
    if choice.quantity > 1 {
        line.push_str(&format!(" ×{}", choice.quantity));
    }
    if let Some(note) = &choice.override_note {
        line.push_str(&format!(" (override: {note})").dim());
    }

    if choice.option_disabled {
        format!("{line} {}", "(option unavailable)".error())
    } else if !choice.enabled {
        format!("{} {}", line.dim(), "(disabled)".warning())
    } else {
        line
    }
}
