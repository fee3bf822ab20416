//! A scenario file: one tree snapshot plus everything a session needs.
//!
//! Scenarios are stored as YAML, JSON or TOML, picked by file extension. The
//! tree is nested on disk (groups, sub-groups, points, choices) and flattened
//! into a [`Tree`] on load. Derived state (enablement flags, option
//! disablement, monotony flags) is never trusted from disk; it is recomputed
//! when the session starts.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    domain::{
        Config,
        context::{Lot, Plan, PriceAdjustment, SalesProgram},
        ids::{AttributeGroupId, ChoiceId, GroupId, SubGroupId},
        rules::OptionRule,
        tree::{Choice, DecisionPoint, OverrideNote, Tree, TreeError},
    },
    engine::{EditMode, Session, SessionContext},
};

/// Serialization format of a scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl Format {
    /// Picks the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

/// A top-level group with its nested sub-groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDoc {
    /// Group id.
    pub id: GroupId,
    /// Display name.
    pub label: String,
    /// Nested sub-groups.
    #[serde(default)]
    pub sub_groups: Vec<SubGroupDoc>,
}

/// A sub-group with its nested points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroupDoc {
    /// Sub-group id.
    pub id: SubGroupId,
    /// Display name.
    pub label: String,
    /// Nested decision points.
    #[serde(default)]
    pub points: Vec<PointDoc>,
}

/// A decision point with its nested choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDoc {
    /// The point itself.
    #[serde(flatten)]
    pub point: DecisionPoint,
    /// Its choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// An override recorded in an earlier session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// The overridden choice.
    pub choice: ChoiceId,
    /// Set for attribute-group overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_group: Option<AttributeGroupId>,
    /// The justification.
    pub note: OverrideNote,
}

/// Everything stored in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Scenario {
    /// New scenario or change order.
    pub mode: EditMode,
    /// The nested tree.
    pub groups: Vec<GroupDoc>,
    /// The plan's option-mapping rules.
    pub option_rules: Vec<OptionRule>,
    /// The plan, if known.
    pub plan: Option<Plan>,
    /// The lot, if known.
    pub lot: Option<Lot>,
    /// Active sales programs.
    pub programs: Vec<SalesProgram>,
    /// Manual price adjustments.
    pub adjustments: Vec<PriceAdjustment>,
    /// Overrides recorded so far.
    pub overrides: Vec<OverrideRecord>,
}

/// Errors loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No file at the path.
    #[error("scenario file {} not found", .0.display())]
    NotFound(PathBuf),
    /// The extension is not one of the supported formats.
    #[error("unrecognised scenario format for {}; expected .yaml, .json or .toml", .0.display())]
    UnknownFormat(PathBuf),
    /// Reading failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid YAML.
    #[error("invalid scenario YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Invalid JSON.
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid TOML.
    #[error("invalid scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// The tree is inconsistent.
    #[error("invalid decision tree: {0}")]
    Tree(#[from] TreeError),
}

/// Errors saving a scenario.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The extension is not one of the supported formats.
    #[error("unrecognised scenario format for {}; expected .yaml, .json or .toml", .0.display())]
    UnknownFormat(PathBuf),
    /// Writing failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// YAML serialization failed.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    /// JSON serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// TOML serialization failed.
    #[error(transparent)]
    Toml(#[from] toml::ser::Error),
}

impl Scenario {
    /// Reads a scenario, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the extension is unknown, the file cannot be
    /// read, or its content cannot be parsed.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let format =
            Format::from_path(path).ok_or_else(|| LoadError::UnknownFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io(e),
        })?;
        Self::parse(&content, format)
    }

    /// Parses a scenario from a string.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the content is not a valid scenario.
    pub fn parse(content: &str, format: Format) -> Result<Self, LoadError> {
        let scenario = match format {
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
            Format::Toml => toml::from_str(content)?,
        };
        Ok(scenario)
    }

    /// Serializes the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] if serialization fails.
    pub fn render(&self, format: Format) -> Result<String, SaveError> {
        let content = match format {
            Format::Yaml => serde_yaml::to_string(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        Ok(content)
    }

    /// Writes the scenario, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] if the extension is unknown, serialization fails,
    /// or the file cannot be written.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let format =
            Format::from_path(path).ok_or_else(|| SaveError::UnknownFormat(path.to_path_buf()))?;
        fs::write(path, self.render(format)?)?;
        Ok(())
    }

    /// Builds the in-memory tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] if ids repeat or a point breaks its pick type.
    pub fn tree(&self) -> Result<Tree, TreeError> {
        let mut builder = Tree::builder();
        for group in &self.groups {
            builder = builder.group(group.id, group.label.clone());
            for sub_group in &group.sub_groups {
                builder = builder.sub_group(sub_group.id, sub_group.label.clone());
                for point in &sub_group.points {
                    builder = builder.point(point.point.clone());
                    for choice in &point.choices {
                        builder = builder.choice(choice.clone());
                    }
                }
            }
        }
        builder.build()
    }

    /// Starts an editing session on the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Tree`] if the tree is inconsistent.
    pub fn into_session(self, config: Config) -> Result<Session, LoadError> {
        let tree = self.tree()?;
        let context = SessionContext {
            plan: self.plan,
            lot: self.lot,
            programs: self.programs,
            adjustments: self.adjustments,
        };
        let mut session = Session::new(tree, self.option_rules, context, self.mode, config);

        let ledger = session.ledger_mut();
        for record in self.overrides {
            match record.attribute_group {
                Some(group) => ledger.record_group(record.choice, group, record.note),
                None => ledger.record_choice(record.choice, record.note),
            }
        }
        tracing::debug!(
            "restored {} choice and {} group override(s)",
            ledger.choice_overrides().count(),
            ledger.group_overrides().count()
        );

        Ok(session)
    }

    /// Captures the current state of a session.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let tree = session.tree();
        let groups = tree
            .groups()
            .iter()
            .map(|group| GroupDoc {
                id: group.id,
                label: group.label.clone(),
                sub_groups: group
                    .sub_groups
                    .iter()
                    .map(|sub_group| SubGroupDoc {
                        id: sub_group.id,
                        label: sub_group.label.clone(),
                        points: sub_group
                            .points
                            .iter()
                            .filter_map(|&id| tree.point(id))
                            .map(|point| PointDoc {
                                point: point.clone(),
                                choices: point
                                    .choices()
                                    .iter()
                                    .filter_map(|&id| tree.choice(id))
                                    .cloned()
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let ledger = session.ledger();
        let overrides = ledger
            .choice_overrides()
            .map(|(choice, note)| OverrideRecord {
                choice,
                attribute_group: None,
                note: note.clone(),
            })
            .chain(
                ledger
                    .group_overrides()
                    .map(|(choice, group, note)| OverrideRecord {
                        choice,
                        attribute_group: Some(group),
                        note: note.clone(),
                    }),
            )
            .collect();

        let context = session.context();
        Self {
            mode: session.mode(),
            groups,
            option_rules: session.rules().option_rules().to_vec(),
            plan: context.plan.clone(),
            lot: context.lot.clone(),
            programs: context.programs.clone(),
            adjustments: context.adjustments.clone(),
            overrides,
        }
    }
}

/// The serialized versions of a scenario.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        mode: EditMode,

        groups: Vec<GroupDoc>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        option_rules: Vec<OptionRule>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan: Option<Plan>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        lot: Option<Lot>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        programs: Vec<SalesProgram>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        adjustments: Vec<PriceAdjustment>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        overrides: Vec<OverrideRecord>,
    },
}

impl From<Versions> for Scenario {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                mode,
                groups,
                option_rules,
                plan,
                lot,
                programs,
                adjustments,
                overrides,
            } => Self {
                mode,
                groups,
                option_rules,
                plan,
                lot,
                programs,
                adjustments,
                overrides,
            },
        }
    }
}

impl From<Scenario> for Versions {
    fn from(scenario: Scenario) -> Self {
        Self::V1 {
            mode: scenario.mode,
            groups: scenario.groups,
            option_rules: scenario.option_rules,
            plan: scenario.plan,
            lot: scenario.lot,
            programs: scenario.programs,
            adjustments: scenario.adjustments,
            overrides: scenario.overrides,
        }
    }
}
