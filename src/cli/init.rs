use std::num::NonZeroUsize;

use homecfg::Config;
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Cap on enablement passes
    #[arg(long, value_name = "N")]
    pass_limit: Option<NonZeroUsize>,

    /// Turn off lot monotony checks
    #[arg(long)]
    no_monotony_checks: bool,

    /// Apply structural mapping changes without asking
    #[arg(long)]
    no_confirm_structural: bool,

    /// Replace an existing settings file
    #[arg(long)]
    force: bool,
}

impl Init {
    fn config(&self) -> Config {
        let mut config = Config::default();
        config.set_pass_limit(self.pass_limit);
        config.monotony_checks = !self.no_monotony_checks;
        config.confirm_structural_changes = !self.no_confirm_structural;
        config
    }

    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let path = workspace.config_path();
        if path.exists() && !self.force {
            anyhow::bail!(
                "settings already exist at {} (use --force to replace them)",
                path.display()
            );
        }

        self.config()
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;

        println!("{}", format!("✅ Wrote {}", path.display()).success());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn flags_map_onto_settings() {
        let init = Init::parse_from(["init", "--pass-limit", "4", "--no-monotony-checks"]);
        let config = init.config();

        assert_eq!(config.pass_limit(), NonZeroUsize::new(4));
        assert!(!config.monotony_checks);
        assert!(config.confirm_structural_changes);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace {
            scenario: tmp.path().join("scenario.yaml"),
            config: None,
        };
        let path: PathBuf = workspace.config_path();

        Init::parse_from(["init"]).run(&workspace).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        assert!(Init::parse_from(["init"]).run(&workspace).is_err());
        Init::parse_from(["init", "--force", "--pass-limit", "2"])
            .run(&workspace)
            .unwrap();
        assert_eq!(Config::load(&path).unwrap().pass_limit(), NonZeroUsize::new(2));
    }
}
