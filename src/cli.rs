use std::path::{Path, PathBuf};

mod attributes;
mod init;
mod monotony;
mod price;
mod prompt;
mod show;
mod terminal;
mod toggle;
mod validate;

use attributes::Attributes;
use clap::ArgAction;
use homecfg::{Config, Scenario, Session, domain::ChoiceId};
use init::Init;
use monotony::Monotony;
use price::Price;
use show::Show;
use toggle::Toggle;
use tracing::instrument;
use validate::Validate;

/// Parse a choice id from the command line.
fn parse_choice(s: &str) -> Result<ChoiceId, String> {
    s.trim()
        .parse::<u32>()
        .map(ChoiceId)
        .map_err(|e| format!("invalid choice id '{s}': {e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The scenario file (.yaml, .json or .toml)
    #[arg(short, long, default_value = "scenario.yaml", global = true)]
    scenario: PathBuf,

    /// Engine settings. Defaults to homecfg.toml next to the scenario
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let workspace = Workspace {
            scenario: self.scenario,
            config: self.config,
        };
        self.command
            .unwrap_or_else(|| Command::Show(Show::default()))
            .run(&workspace)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// The scenario being edited and where its settings live.
#[derive(Debug)]
pub struct Workspace {
    scenario: PathBuf,
    config: Option<PathBuf>,
}

impl Workspace {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            self.scenario
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("homecfg.toml")
        })
    }

    fn load(&self) -> anyhow::Result<Session> {
        let config = Config::load_or_default(&self.config_path()).map_err(|e| anyhow::anyhow!(e))?;
        let scenario = Scenario::load(&self.scenario)?;
        Ok(scenario.into_session(config)?)
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        Scenario::from_session(session).save(&self.scenario)?;
        tracing::debug!("saved {}", self.scenario.display());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write a settings file for the scenario
    Init(Init),

    /// Show the decision tree (default)
    Show(Show),

    /// Select, deselect or change the quantity of a choice
    ///
    /// Other choices that stop being valid are deselected with it. Blocked
    /// selections ask for an override note.
    Toggle(Toggle),

    /// Set the attribute and location selections of a choice
    Attributes(Attributes),

    /// Select the default choice of every point without a selection
    Defaults(Defaults),

    /// Show the price breakdown
    Price(Price),

    /// Check a choice against the lot's monotony rules
    Monotony(Monotony),

    /// Check rules for cycles, dangling references and convergence
    Validate(Validate),
}

impl Command {
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(workspace)?,
            Self::Show(command) => command.run(workspace)?,
            Self::Toggle(command) => command.run(workspace)?,
            Self::Attributes(command) => command.run(workspace)?,
            Self::Defaults(command) => command.run(workspace)?,
            Self::Price(command) => command.run(workspace)?,
            Self::Monotony(command) => command.run(workspace)?,
            Self::Validate(command) => command.run(workspace)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Defaults {
    /// Show what would be selected without saving
    #[arg(long)]
    dry_run: bool,
}

impl Defaults {
    #[instrument(level = "debug", skip(self))]
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut session = workspace.load()?;
        let selected = session.apply_decision_defaults();

        if selected.is_empty() {
            println!("{}", "No decision defaults could be applied".dim());
            return Ok(());
        }

        for choice in &selected {
            let label = session.tree().label(*choice).unwrap_or_default();
            println!("  • {label}");
        }

        if self.dry_run {
            println!("{}", format!("Would select {} default(s)", selected.len()).dim());
            return Ok(());
        }

        workspace.save(&session)?;
        println!(
            "{}",
            format!("✅ Selected {} default(s)", selected.len()).success()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("12", Ok(ChoiceId(12)); "plain")]
    #[test_case(" 7 ", Ok(ChoiceId(7)); "padded")]
    fn parses_choice_ids(input: &str, expected: Result<ChoiceId, String>) {
        assert_eq!(parse_choice(input), expected);
    }

    #[test]
    fn rejects_non_numeric_choice() {
        assert!(parse_choice("A1").unwrap_err().starts_with("invalid choice id 'A1'"));
    }

    #[test]
    fn config_defaults_to_scenario_directory() {
        let workspace = Workspace {
            scenario: PathBuf::from("homes/lot-12.yaml"),
            config: None,
        };
        assert_eq!(workspace.config_path(), PathBuf::from("homes/homecfg.toml"));
    }
}
