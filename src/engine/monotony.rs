//! Monotony checks against neighbouring homes.
//!
//! A lot's monotony rules list the elevations, color schemes and color-scheme
//! attributes already built next door for a plan. Selecting one of those is a
//! conflict that stays blocked until an override note is recorded. The checks
//! are advisory: without a lot or plan nothing conflicts.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use crate::domain::{
    context::{Lot, MonotonyRule, Plan},
    ids::{AttributeGroupId, AttributeId, ChoiceCatalogId, ChoiceId},
    tree::{OverrideNote, PointCategory, Tree},
};

/// Where a choice stands with respect to monotony rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonotonyState {
    /// Nothing next door matches.
    NoConflict,
    /// A neighbour matches and no override has been recorded.
    Conflicted,
    /// The conflict was seen this session but not overridden. Selection stays
    /// blocked.
    Acknowledged,
    /// The conflict was overridden with a note.
    Overridden(OverrideNote),
}

impl MonotonyState {
    /// Whether the state stops the choice from being selected.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::Conflicted | Self::Acknowledged)
    }
}

/// Attributes of one attribute group that match a neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroupConflict {
    /// The attribute group.
    pub group: AttributeGroupId,
    /// Conflicting attributes, excluding ones already selected.
    pub attributes: Vec<AttributeId>,
    /// Whether an override covers this group.
    pub confirmed: bool,
}

/// The monotony check result for one choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonotonyConflict {
    /// The checked choice.
    pub choice: ChoiceId,
    /// Choice-level state.
    pub state: MonotonyState,
    /// Attribute groups with conflicting attributes.
    pub attribute_groups: Vec<AttributeGroupConflict>,
}

impl MonotonyConflict {
    fn none(choice: ChoiceId) -> Self {
        Self {
            choice,
            state: MonotonyState::NoConflict,
            attribute_groups: Vec::new(),
        }
    }

    /// Whether there is nothing to report.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.state == MonotonyState::NoConflict && self.attribute_groups.is_empty()
    }
}

/// Overrides and acknowledgements recorded during one editing session.
///
/// Kept outside the tree so that deselecting and reselecting a choice restores
/// its override without asking again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLedger {
    choices: BTreeMap<ChoiceId, OverrideNote>,
    groups: BTreeMap<(ChoiceId, AttributeGroupId), OverrideNote>,
    seen: BTreeSet<ChoiceId>,
}

impl OverrideLedger {
    /// Records a choice-level override.
    pub fn record_choice(&mut self, choice: ChoiceId, note: OverrideNote) {
        self.seen.remove(&choice);
        self.choices.insert(choice, note);
    }

    /// Records an override for one attribute group of a choice.
    pub fn record_group(&mut self, choice: ChoiceId, group: AttributeGroupId, note: OverrideNote) {
        self.groups.insert((choice, group), note);
    }

    /// Marks a conflict as seen without overriding it.
    pub fn acknowledge(&mut self, choice: ChoiceId) {
        if !self.choices.contains_key(&choice) {
            self.seen.insert(choice);
        }
    }

    /// The choice-level override, if any.
    #[must_use]
    pub fn choice_override(&self, choice: ChoiceId) -> Option<&OverrideNote> {
        self.choices.get(&choice)
    }

    /// The override for one attribute group, if any.
    #[must_use]
    pub fn group_override(&self, choice: ChoiceId, group: AttributeGroupId) -> Option<&OverrideNote> {
        self.groups.get(&(choice, group))
    }

    /// Whether the conflict was seen without an override.
    #[must_use]
    pub fn is_acknowledged(&self, choice: ChoiceId) -> bool {
        self.seen.contains(&choice)
    }

    /// Every choice-level override.
    pub fn choice_overrides(&self) -> impl Iterator<Item = (ChoiceId, &OverrideNote)> + '_ {
        self.choices.iter().map(|(&id, note)| (id, note))
    }

    /// Every attribute-group override.
    pub fn group_overrides(
        &self,
    ) -> impl Iterator<Item = (ChoiceId, AttributeGroupId, &OverrideNote)> + '_ {
        self.groups
            .iter()
            .map(|(&(choice, group), note)| (choice, group, note))
    }
}

fn choice_matches(category: PointCategory, rule: &MonotonyRule, catalog_id: ChoiceCatalogId) -> bool {
    match category {
        PointCategory::Elevation => rule.elevation_catalog_ids.contains(&catalog_id),
        PointCategory::ColorScheme => rule.color_scheme_catalog_ids.contains(&catalog_id),
        PointCategory::General => false,
    }
}

/// Checks `choice` against the lot's monotony rules for `plan`.
///
/// A missing lot or plan means nothing conflicts.
#[instrument(level = "debug", skip(tree, lot, plan, ledger))]
#[must_use]
pub fn check_monotony(
    tree: &Tree,
    lot: Option<&Lot>,
    plan: Option<&Plan>,
    choice: ChoiceId,
    ledger: &OverrideLedger,
) -> MonotonyConflict {
    let (Some(lot), Some(plan)) = (lot, plan) else {
        return MonotonyConflict::none(choice);
    };
    let Some(node) = tree.choice(choice) else {
        return MonotonyConflict::none(choice);
    };
    let Some(point) = tree.point(node.point()) else {
        return MonotonyConflict::none(choice);
    };

    let rules: Vec<&MonotonyRule> = lot.monotony_rules_for(plan.id).collect();
    let override_note = ledger
        .choice_override(choice)
        .or(node.override_note.as_ref())
        .cloned();

    let conflicted = rules
        .iter()
        .any(|rule| choice_matches(point.category, rule, node.catalog_id));
    let state = if !conflicted {
        MonotonyState::NoConflict
    } else if let Some(note) = override_note.clone() {
        MonotonyState::Overridden(note)
    } else if ledger.is_acknowledged(choice) {
        MonotonyState::Acknowledged
    } else {
        MonotonyState::Conflicted
    };

    let single_group = node.attribute_groups.len() == 1;
    let attribute_groups = node
        .attribute_groups
        .iter()
        .filter_map(|group| {
            let attributes: Vec<AttributeId> = group
                .attributes
                .iter()
                .filter(|a| {
                    rules
                        .iter()
                        .any(|r| r.color_scheme_attribute_community_ids.contains(&a.community_id))
                })
                .filter(|a| !node.has_selected_attribute(group.id, a.id))
                .map(|a| a.id)
                .collect();
            if attributes.is_empty() {
                return None;
            }
            let confirmed = if single_group {
                override_note.is_some()
            } else {
                ledger.group_override(choice, group.id).is_some()
            };
            Some(AttributeGroupConflict {
                group: group.id,
                attributes,
                confirmed,
            })
        })
        .collect();

    MonotonyConflict {
        choice,
        state,
        attribute_groups,
    }
}

/// Recomputes the `monotony_conflict` flag on every attribute of the tree.
///
/// Returns the number of flagged attributes.
pub fn mark_attribute_conflicts(tree: &mut Tree, lot: Option<&Lot>, plan: Option<&Plan>) -> usize {
    let mut flags = Vec::new();
    for choice in tree.choices() {
        for group in &choice.attribute_groups {
            for attribute in &group.attributes {
                let conflict = match (lot, plan) {
                    (Some(lot), Some(plan)) => {
                        lot.monotony_rules_for(plan.id).any(|r| {
                            r.color_scheme_attribute_community_ids
                                .contains(&attribute.community_id)
                        }) && !choice.has_selected_attribute(group.id, attribute.id)
                    }
                    _ => false,
                };
                flags.push((choice.id, group.id, attribute.id, conflict));
            }
        }
    }

    let flagged = flags.iter().filter(|f| f.3).count();
    for (choice, group, attribute, conflict) in flags {
        tree.set_attribute_conflict(choice, group, attribute, conflict);
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn note(text: &str) -> OverrideNote {
        OverrideNote::new(text).unwrap()
    }

    #[test]
    fn missing_context_means_no_conflict() {
        let tree = fixtures::monotony_tree();
        let ledger = OverrideLedger::default();

        let conflict = check_monotony(&tree, None, Some(&fixtures::plan()), fixtures::ELEV_CRAFTSMAN, &ledger);
        assert!(conflict.is_clear());

        let conflict = check_monotony(&tree, Some(&fixtures::lot()), None, fixtures::ELEV_CRAFTSMAN, &ledger);
        assert!(conflict.is_clear());
    }

    #[test]
    fn elevation_used_next_door_conflicts() {
        let tree = fixtures::monotony_tree();
        let ledger = OverrideLedger::default();

        let conflict = check_monotony(
            &tree,
            Some(&fixtures::lot()),
            Some(&fixtures::plan()),
            fixtures::ELEV_CRAFTSMAN,
            &ledger,
        );

        assert_eq!(conflict.state, MonotonyState::Conflicted);
        assert!(conflict.state.is_blocking());
    }

    #[test]
    fn rules_for_other_plans_are_ignored() {
        let tree = fixtures::monotony_tree();
        let mut plan = fixtures::plan();
        plan.id = crate::domain::ids::PlanId(77);

        let conflict = check_monotony(
            &tree,
            Some(&fixtures::lot()),
            Some(&plan),
            fixtures::ELEV_CRAFTSMAN,
            &OverrideLedger::default(),
        );

        assert!(conflict.is_clear());
    }

    #[test]
    fn acknowledged_conflicts_stay_blocked() {
        let tree = fixtures::monotony_tree();
        let mut ledger = OverrideLedger::default();
        ledger.acknowledge(fixtures::ELEV_CRAFTSMAN);

        let conflict = check_monotony(
            &tree,
            Some(&fixtures::lot()),
            Some(&fixtures::plan()),
            fixtures::ELEV_CRAFTSMAN,
            &ledger,
        );

        assert_eq!(conflict.state, MonotonyState::Acknowledged);
        assert!(conflict.state.is_blocking());
    }

    #[test]
    fn recorded_override_unblocks() {
        let tree = fixtures::monotony_tree();
        let mut ledger = OverrideLedger::default();
        ledger.acknowledge(fixtures::ELEV_CRAFTSMAN);
        ledger.record_choice(fixtures::ELEV_CRAFTSMAN, note("buyer insists"));

        let conflict = check_monotony(
            &tree,
            Some(&fixtures::lot()),
            Some(&fixtures::plan()),
            fixtures::ELEV_CRAFTSMAN,
            &ledger,
        );

        assert_eq!(conflict.state, MonotonyState::Overridden(note("buyer insists")));
        assert!(!ledger.is_acknowledged(fixtures::ELEV_CRAFTSMAN));
    }

    #[test]
    fn attribute_groups_need_separate_confirmation() {
        let tree = fixtures::monotony_tree();
        let mut ledger = OverrideLedger::default();
        ledger.record_group(fixtures::SIDING, fixtures::BODY_COLOR, note("approved"));

        let conflict = check_monotony(
            &tree,
            Some(&fixtures::lot()),
            Some(&fixtures::plan()),
            fixtures::SIDING,
            &ledger,
        );

        assert_eq!(conflict.state, MonotonyState::NoConflict);
        let confirmed: Vec<_> = conflict
            .attribute_groups
            .iter()
            .map(|g| (g.group, g.confirmed))
            .collect();
        assert_eq!(
            confirmed,
            vec![(fixtures::BODY_COLOR, true), (fixtures::TRIM_COLOR, false)]
        );
    }

    #[test]
    fn attribute_conflicts_are_flagged_on_the_tree() {
        let mut tree = fixtures::monotony_tree();

        let flagged = mark_attribute_conflicts(&mut tree, Some(&fixtures::lot()), Some(&fixtures::plan()));
        // sage body, white trim and black shutters
        assert_eq!(flagged, 3);

        let flagged = mark_attribute_conflicts(&mut tree, None, None);
        assert_eq!(flagged, 0);
        assert!(
            tree.choices()
                .iter()
                .flat_map(|c| &c.attribute_groups)
                .flat_map(|g| &g.attributes)
                .all(|a| !a.monotony_conflict)
        );
    }
}
