use std::{num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

/// Engine settings.
///
/// Read from `homecfg.toml` next to the scenario being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Upper bound on enablement passes.
    ///
    /// The evaluator never runs more passes than the tree has nodes; this can
    /// only lower that bound.
    pass_limit: Option<NonZeroUsize>,

    /// Whether lot monotony rules are checked when selecting elevations and
    /// color schemes.
    pub monotony_checks: bool,

    /// Whether a toggle that changes the option mapping of a structural point
    /// asks for confirmation outside of change orders.
    pub confirm_structural_changes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pass_limit: None,
            monotony_checks: true,
            confirm_structural_changes: true,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration, falling back to the defaults if the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The configured pass limit, if any.
    #[must_use]
    pub const fn pass_limit(&self) -> Option<NonZeroUsize> {
        self.pass_limit
    }

    /// Lowers the number of enablement passes.
    pub const fn set_pass_limit(&mut self, limit: Option<NonZeroUsize>) {
        self.pass_limit = limit;
    }

    /// Returns the configuration with monotony checks switched on or off.
    #[must_use]
    pub const fn with_monotony_checks(mut self, enabled: bool) -> Self {
        self.monotony_checks = enabled;
        self
    }

    /// Returns the configuration with structural confirmation switched on or
    /// off.
    #[must_use]
    pub const fn with_confirm_structural_changes(mut self, enabled: bool) -> Self {
        self.confirm_structural_changes = enabled;
        self
    }
}

const fn default_true() -> bool {
    true
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pass_limit: Option<NonZeroUsize>,

        #[serde(default = "default_true")]
        monotony_checks: bool,

        #[serde(default = "default_true")]
        confirm_structural_changes: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                pass_limit,
                monotony_checks,
                confirm_structural_changes,
            } => Self {
                pass_limit,
                monotony_checks,
                confirm_structural_changes,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            pass_limit: config.pass_limit,
            monotony_checks: config.monotony_checks,
            confirm_structural_changes: config.confirm_structural_changes,
        }
    }
}
