//! Decisions the engine needs from a person.
//!
//! The commit protocol asks for confirmation before applying a disruptive
//! toggle and for an override note before forcing a blocked selection. Both
//! are plain request/response calls on a [`Prompt`], so the engine does not
//! care whether the answer comes from a terminal, a dialog or a test.

use std::fmt;

use crate::{
    domain::{
        ids::{AttributeGroupId, ChoiceId, PointId},
        tree::OverrideNote,
    },
    engine::monotony::MonotonyConflict,
};

/// The effects of a toggle, shown before it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactWarning {
    /// The toggled choice.
    pub choice: ChoiceId,
    /// "Point: Choice" label of the toggled choice.
    pub label: String,
    /// The choice its exclusive point gives up, if any.
    pub deselected: Option<ChoiceId>,
    /// Other choices that will be deselected.
    pub impacted: Vec<ChoiceId>,
    /// Labels of the deselected and impacted choices, in that order.
    pub labels: Vec<String>,
    /// The toggle changes the option mapping of a structural point.
    pub mapping_changed: bool,
}

impl ImpactWarning {
    /// The affected choices' labels joined for display.
    #[must_use]
    pub fn joined_labels(&self) -> String {
        self.labels.join(", ")
    }
}

impl fmt::Display for ImpactWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            write!(f, "Changing {} changes the options of other selections", self.label)
        } else {
            write!(
                f,
                "Changing {} will deselect: {}",
                self.label,
                self.joined_labels()
            )
        }
    }
}

/// Why an override is being asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideReason {
    /// The point is past its cut-off date.
    PastCutOff {
        /// The locked point.
        point: PointId,
    },
    /// The choice matches a neighbouring home.
    Monotony(MonotonyConflict),
    /// A selected attribute matches a neighbouring home.
    AttributeMonotony {
        /// The attribute group needing confirmation.
        group: AttributeGroupId,
    },
}

/// A request for an override note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    /// The blocked choice.
    pub choice: ChoiceId,
    /// "Point: Choice" label of the blocked choice.
    pub label: String,
    /// What blocks it.
    pub reason: OverrideReason,
}

impl fmt::Display for OverrideRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            OverrideReason::PastCutOff { .. } => {
                write!(f, "{} is past its cut-off date", self.label)
            }
            OverrideReason::Monotony(_) => {
                write!(f, "{} matches a neighbouring home", self.label)
            }
            OverrideReason::AttributeMonotony { group } => write!(
                f,
                "{} has attributes in group {group} that match a neighbouring home",
                self.label
            ),
        }
    }
}

/// The answer to an [`OverrideRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideDecision {
    /// Force the selection through, recording the note.
    Override(OverrideNote),
    /// The conflict was seen; do not ask again this session, but keep it
    /// blocked.
    Acknowledge,
    /// Abandon the toggle.
    Cancel,
}

/// Source of the decisions the commit protocol needs.
pub trait Prompt {
    /// Asks whether to go ahead with a toggle that deselects other choices or
    /// changes their options.
    fn confirm_impact(&mut self, warning: &ImpactWarning) -> bool;

    /// Asks for a justification to force a blocked selection.
    fn request_override(&mut self, request: &OverrideRequest) -> OverrideDecision;
}

/// Answers every prompt the same way.
///
/// Useful for scripted edits and tests.
#[derive(Debug, Clone, Default)]
pub struct NonInteractive {
    /// Answer to every impact confirmation.
    pub confirm: bool,
    /// Note given for every override request; `None` cancels.
    pub note: Option<OverrideNote>,
    /// Number of prompts answered so far.
    pub asked: usize,
}

impl NonInteractive {
    /// Confirms every impact and cancels every override.
    #[must_use]
    pub const fn accept_all() -> Self {
        Self {
            confirm: true,
            note: None,
            asked: 0,
        }
    }

    /// Declines every impact and cancels every override.
    #[must_use]
    pub const fn decline_all() -> Self {
        Self {
            confirm: false,
            note: None,
            asked: 0,
        }
    }

    /// Overrides every request with `note`.
    #[must_use]
    pub fn with_note(mut self, note: OverrideNote) -> Self {
        self.note = Some(note);
        self
    }
}

impl Prompt for NonInteractive {
    fn confirm_impact(&mut self, warning: &ImpactWarning) -> bool {
        self.asked += 1;
        tracing::debug!("{warning}: answering {}", self.confirm);
        self.confirm
    }

    fn request_override(&mut self, request: &OverrideRequest) -> OverrideDecision {
        self.asked += 1;
        tracing::debug!("{request}");
        self.note
            .clone()
            .map_or(OverrideDecision::Cancel, OverrideDecision::Override)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_lists_affected_choices() {
        let warning = ImpactWarning {
            choice: ChoiceId(2),
            label: "Point A: A2".to_string(),
            deselected: Some(ChoiceId(1)),
            impacted: vec![ChoiceId(3)],
            labels: vec!["Point A: A1".to_string(), "Point B: B1".to_string()],
            mapping_changed: false,
        };

        assert_eq!(
            warning.to_string(),
            "Changing Point A: A2 will deselect: Point A: A1, Point B: B1"
        );
    }

    #[test]
    fn non_interactive_overrides_only_with_a_note() {
        let request = OverrideRequest {
            choice: ChoiceId(1),
            label: "Elevation: Craftsman".to_string(),
            reason: OverrideReason::PastCutOff { point: PointId(1) },
        };

        let mut prompt = NonInteractive::accept_all();
        assert_eq!(prompt.request_override(&request), OverrideDecision::Cancel);

        let note = OverrideNote::new("approved").unwrap();
        let mut prompt = NonInteractive::accept_all().with_note(note.clone());
        assert_eq!(prompt.request_override(&request), OverrideDecision::Override(note));
        assert_eq!(prompt.asked, 1);
    }
}
