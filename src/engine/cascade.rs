//! Side effects of toggling a choice.
//!
//! [`choice_to_deselect`] finds the choice an exclusive point gives up when
//! another of its choices is selected. [`dependent_choices`] finds every other
//! selected choice that stops being valid once the toggle is applied, either
//! because a rule now disables it or because the plan option it maps to has
//! changed.

use std::collections::{BTreeSet, HashMap};

use tracing::instrument;

use crate::{
    domain::{
        ids::{ChoiceId, NodeRef, OptionKey},
        rules::RuleTable,
        tree::Tree,
    },
    engine::enablement::evaluate_enablement,
};

/// A pending change to one choice's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    /// The choice being changed.
    pub choice: ChoiceId,
    /// The new quantity; zero deselects.
    pub quantity: u32,
}

impl Toggle {
    /// Selects a choice with a quantity of one.
    #[must_use]
    pub const fn select(choice: ChoiceId) -> Self {
        Self {
            choice,
            quantity: 1,
        }
    }

    /// Deselects a choice.
    #[must_use]
    pub const fn deselect(choice: ChoiceId) -> Self {
        Self {
            choice,
            quantity: 0,
        }
    }

    /// Sets a choice to an explicit quantity.
    #[must_use]
    pub const fn with_quantity(choice: ChoiceId, quantity: u32) -> Self {
        Self { choice, quantity }
    }

    /// Whether the toggle leaves the choice selected.
    #[must_use]
    pub const fn is_selection(self) -> bool {
        self.quantity > 0
    }
}

/// The choice an exclusive point drops when another choice is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeselectionInfo {
    /// The previously selected choice.
    pub choice: ChoiceId,
    /// The point is structural and the new choice maps to a different set of
    /// options than the old one.
    pub mapping_changed: bool,
    /// Selected choices in other points whose option mapping involved the
    /// deselected choice.
    pub changed_dependent_choice_ids: Vec<ChoiceId>,
}

/// Works out whether selecting `choice` forces another choice of the same
/// point to be deselected.
///
/// Returns `None` for multi-pick points, for the first selection in a point,
/// and for unknown choices.
#[instrument(level = "debug", skip(tree, rules))]
pub fn choice_to_deselect(tree: &Tree, rules: &RuleTable, choice: ChoiceId) -> Option<DeselectionInfo> {
    let point = tree.point_of(choice)?;
    if !point.pick_type.is_exclusive() {
        return None;
    }
    let previous = tree
        .choices_in(point.id)
        .find(|c| c.id != choice && c.is_selected())?
        .id;

    let mapping_changed = point.is_structural && {
        let mut replaced = tree.clone();
        replaced.set_quantity(previous, 0);
        replaced.set_quantity(choice, 1);
        rules.mapped_options(&replaced, choice) != rules.mapped_options(tree, previous)
    };

    let changed_dependent_choice_ids = rules
        .option_partners(previous)
        .filter(|&id| id != choice)
        .filter(|&id| tree.choice(id).is_some_and(|c| c.point() != point.id && c.is_selected()))
        .collect();

    Some(DeselectionInfo {
        choice: previous,
        mapping_changed,
        changed_dependent_choice_ids,
    })
}

/// Selected choices that must be deselected as a side effect of `toggle`.
///
/// The toggle (and the exclusive deselection it implies) is applied to a
/// scratch copy of the tree. Any other selected choice that is no longer
/// effectively selected, that now maps to an inactive option, or whose mapped
/// options differ from before is impacted. Impacted choices are zeroed and the
/// tree re-evaluated until no new choice is found, so chains of dependencies
/// are followed to the end.
///
/// The result is in discovery order, without duplicates.
#[instrument(level = "debug", skip(tree, rules))]
pub fn dependent_choices(tree: &Tree, rules: &RuleTable, toggle: Toggle) -> Vec<ChoiceId> {
    if tree.choice(toggle.choice).is_none() {
        return Vec::new();
    }

    let mut scratch = tree.clone();
    let mut sources = vec![NodeRef::Choice(toggle.choice)];
    let deselected = toggle
        .is_selection()
        .then(|| choice_to_deselect(tree, rules, toggle.choice))
        .flatten();
    if let Some(info) = deselected {
        scratch.set_quantity(info.choice, 0);
        sources.push(NodeRef::Choice(info.choice));
    }
    scratch.set_quantity(toggle.choice, toggle.quantity);

    let reach = rules.influenced_by(sources);
    let candidates: Vec<ChoiceId> = tree
        .selected_choices()
        .filter(|&id| id != toggle.choice && reach.contains(&NodeRef::Choice(id)))
        .collect();
    let mapping: HashMap<ChoiceId, BTreeSet<OptionKey>> = candidates
        .iter()
        .map(|&id| (id, rules.mapped_options(tree, id)))
        .collect();

    let mut impacted = Vec::new();
    loop {
        evaluate_enablement(&mut scratch, rules);

        let found: Vec<ChoiceId> = candidates
            .iter()
            .copied()
            .filter(|&id| scratch.is_selected(id) && !impacted.contains(&id))
            .filter(|&id| {
                let was_active = tree.is_effectively_selected(id);
                let lost_enablement = was_active && !scratch.is_effectively_selected(id);
                let option_disabled = scratch.choice(id).is_some_and(|c| c.option_disabled)
                    && !tree.choice(id).is_some_and(|c| c.option_disabled);
                let remapped = mapping
                    .get(&id)
                    .is_some_and(|before| *before != rules.mapped_options(&scratch, id));
                lost_enablement || option_disabled || remapped
            })
            .collect();

        if found.is_empty() {
            break;
        }
        tracing::debug!("cascade round impacts {found:?}");
        for &id in &found {
            scratch.set_quantity(id, 0);
        }
        impacted.extend(found);
    }

    impacted
}

/// "Point: Choice" labels for display, skipping unknown ids.
#[must_use]
pub fn impact_labels(tree: &Tree, choices: &[ChoiceId]) -> Vec<String> {
    choices.iter().filter_map(|&id| tree.label(id)).collect()
}
