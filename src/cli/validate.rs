use clap::Parser;
use homecfg::{
    Session,
    domain::{NodeRef, Rule},
};
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check the scenario's rules for authoring errors")]
pub struct Validate {
    /// Types of checks to run (can be specified multiple times)
    #[arg(long, value_name = "TYPE")]
    check: Vec<CheckType>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
enum CheckType {
    /// Check for rules that reference nodes missing from the tree
    References,
    /// Check for circular rule dependencies
    Cycles,
    /// Check for rules with nothing to reference
    Malformed,
    /// Check that enablement settles within the pass limit
    Convergence,
    /// Run all checks
    All,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

#[derive(Debug, Default)]
struct ValidationResult {
    dangling: Vec<(NodeRef, NodeRef)>,
    cycles: Vec<Vec<NodeRef>>,
    malformed: Vec<NodeRef>,
    unsettled: Option<Vec<NodeRef>>,
}

impl ValidationResult {
    fn issue_count(&self) -> usize {
        self.dangling.len()
            + self.cycles.len()
            + self.malformed.len()
            + usize::from(self.unsettled.is_some())
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let session = workspace.load()?;

        let checks = if self.check.is_empty() || self.check.contains(&CheckType::All) {
            vec![
                CheckType::References,
                CheckType::Cycles,
                CheckType::Malformed,
                CheckType::Convergence,
            ]
        } else {
            self.check.clone()
        };

        let mut result = ValidationResult::default();
        for check in checks {
            match check {
                CheckType::References => check_references(&session, &mut result),
                CheckType::Cycles => result.cycles = session.rules().cycles(),
                CheckType::Malformed => check_malformed(&session, &mut result),
                CheckType::Convergence => check_convergence(&session, &mut result),
                CheckType::All => {}
            }
        }

        match self.output {
            OutputFormat::Table => self.output_table(&result),
            OutputFormat::Json => output_json(&result)?,
            OutputFormat::Summary => output_summary(&result),
        }

        if result.issue_count() > 0 {
            std::process::exit(2);
        }
        Ok(())
    }

    fn output_table(&self, result: &ValidationResult) {
        if result.issue_count() == 0 {
            if !self.quiet {
                println!("{}", "✅ No rule problems found".success());
            }
            return;
        }

        if !result.dangling.is_empty() {
            println!("{}", "Dangling references".error());
            for (owner, missing) in &result.dangling {
                println!("  {owner} references missing {missing}");
            }
        }
        if !result.cycles.is_empty() {
            println!("{}", "Circular rules".error());
            for cycle in &result.cycles {
                println!("  {}", join(cycle, " → "));
            }
        }
        if !result.malformed.is_empty() {
            println!("{}", "Rules with no references".warning());
            for owner in &result.malformed {
                println!("  {owner}");
            }
        }
        if let Some(nodes) = &result.unsettled {
            println!("{}", "Enablement did not settle".error());
            println!("  left disabled: {}", join(nodes, ", "));
        }
    }
}

fn check_references(session: &Session, result: &mut ValidationResult) {
    result.dangling = session
        .rules()
        .dangling_references()
        .iter()
        .map(|d| (d.owner, d.missing))
        .collect();
}

fn check_malformed(session: &Session, result: &mut ValidationResult) {
    let tree = session.tree();
    let points = tree
        .points()
        .iter()
        .map(|p| (NodeRef::Point(p.id), &p.disabled_by));
    let choices = tree
        .choices()
        .iter()
        .map(|c| (NodeRef::Choice(c.id), &c.disabled_by));

    result.malformed = points
        .chain(choices)
        .filter(|(_, groups)| groups.iter().flat_map(|g| &g.rules).any(Rule::is_malformed))
        .map(|(owner, _)| owner)
        .collect();
}

fn check_convergence(session: &Session, result: &mut ValidationResult) {
    let report = session.enablement();
    if !report.converged {
        result.unsettled = Some(report.failed_closed.clone());
    }
}

fn join(nodes: &[NodeRef], separator: &str) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn output_json(result: &ValidationResult) -> anyhow::Result<()> {
    use serde_json::json;

    let output = json!({
        "dangling_references": result
            .dangling
            .iter()
            .map(|(owner, missing)| json!({ "owner": owner.to_string(), "missing": missing.to_string() }))
            .collect::<Vec<_>>(),
        "cycles": result
            .cycles
            .iter()
            .map(|cycle| cycle.iter().map(ToString::to_string).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
        "malformed": result.malformed.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "converged": result.unsettled.is_none(),
        "failed_closed": result
            .unsettled
            .iter()
            .flatten()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_summary(result: &ValidationResult) {
    let count = result.issue_count();
    if count == 0 {
        println!("{}", "✅ Valid".success());
    } else {
        println!("{}", format!("❌ {count} issue(s)").error());
    }
}

#[cfg(test)]
mod tests {
    use homecfg::domain::{ChoiceId, PointId};

    use super::*;

    #[test]
    fn non_convergence_counts_as_one_issue() {
        let result = ValidationResult {
            dangling: vec![(NodeRef::Choice(ChoiceId(1)), NodeRef::Point(PointId(9)))],
            unsettled: Some(vec![NodeRef::Choice(ChoiceId(2)), NodeRef::Choice(ChoiceId(3))]),
            ..ValidationResult::default()
        };
        assert_eq!(result.issue_count(), 2);
    }

    #[test]
    fn joins_cycles_in_order() {
        let cycle = [NodeRef::Choice(ChoiceId(1)), NodeRef::Choice(ChoiceId(2))];
        assert_eq!(join(&cycle, " → "), "choice 1 → choice 2");
    }
}
