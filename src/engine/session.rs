//! One editing session over a tree snapshot.
//!
//! [`Session::toggle`] is the commit protocol: validate the toggle, work out
//! its cascade, collect any overrides and confirmations, and only then apply
//! every quantity change at once before re-running enablement, monotony and
//! pricing. A rejected or cancelled toggle leaves the tree exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    domain::{
        Config,
        context::{Lot, Plan, PriceAdjustment, SalesProgram},
        ids::{AttributeGroupId, ChoiceId, PointId},
        rules::{OptionRule, RuleTable},
        selection::{Selection, SelectionError, validate_selections},
        tree::{Choice, OverrideNote, Tree},
    },
    engine::{
        cascade::{DeselectionInfo, Toggle, choice_to_deselect, dependent_choices, impact_labels},
        enablement::{EnablementReport, evaluate_with_limit},
        monotony::{MonotonyConflict, MonotonyState, OverrideLedger, check_monotony, mark_attribute_conflicts},
        price::{PriceBreakdown, PriceInputs, compute_price_breakdown},
        prompt::{ImpactWarning, OverrideDecision, OverrideReason, OverrideRequest, Prompt},
    },
};

/// Whether the home is being configured for the first time or changed after
/// contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// A new scenario. Cascades apply silently unless a structural mapping
    /// changes.
    #[default]
    NewScenario,
    /// A change order. Every cascade needs confirmation.
    ChangeOrder,
}

/// Plan, lot and pricing data for a session. Any of it may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// The plan being configured.
    pub plan: Option<Plan>,
    /// The lot the home is built on.
    pub lot: Option<Lot>,
    /// Active sales programs.
    pub programs: Vec<SalesProgram>,
    /// Manual price adjustments.
    pub adjustments: Vec<PriceAdjustment>,
}

/// Reasons a toggle is not applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToggleError {
    /// The choice is not in the tree.
    #[error("choice {0} does not exist")]
    UnknownChoice(ChoiceId),
    /// Rules currently disable the choice or its point.
    #[error("{label} is not available with the current selections")]
    Disabled {
        /// The choice.
        choice: ChoiceId,
        /// Its display label.
        label: String,
    },
    /// The choice maps to an inactive option.
    #[error("choice {0} maps to an option that is no longer offered")]
    OptionDisabled(ChoiceId),
    /// The quantity is above the choice's maximum.
    #[error("choice {choice} allows at most {max}, {quantity} requested")]
    QuantityExceedsMaximum {
        /// The choice.
        choice: ChoiceId,
        /// Requested quantity.
        quantity: u32,
        /// Maximum quantity.
        max: u32,
    },
    /// Required choices cannot be deselected.
    #[error("choice {0} is required and cannot be deselected")]
    RequiredChoice(ChoiceId),
    /// The point must keep at least one selection.
    #[error("decision point {point} needs a selection; choose a replacement for choice {choice} instead")]
    MinimumSelection {
        /// The point.
        point: PointId,
        /// The choice that was to be deselected.
        choice: ChoiceId,
    },
    /// The point is past its cut-off and no override was given.
    #[error("decision point {0} is past its cut-off")]
    PastCutOff(PointId),
    /// The choice conflicts with a neighbouring home and no override was
    /// given.
    #[error("choice {0} conflicts with a neighbouring home")]
    MonotonyConflict(ChoiceId),
    /// An attribute conflicts with a neighbouring home and no override was
    /// given.
    #[error("attribute group {group} of choice {choice} conflicts with a neighbouring home")]
    AttributeMonotonyConflict {
        /// The choice.
        choice: ChoiceId,
        /// The attribute group.
        group: AttributeGroupId,
    },
    /// The person declined.
    #[error("change to choice {0} was cancelled")]
    Cancelled(ChoiceId),
    /// The attribute or location selections are invalid.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// The validated effects of a toggle, before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePlan {
    /// The toggle.
    pub toggle: Toggle,
    /// The choice the exclusive point gives up.
    pub deselection: Option<DeselectionInfo>,
    /// Choices deselected as a side effect.
    pub impacted: Vec<ChoiceId>,
    /// Whether the commit protocol will ask before applying.
    pub needs_confirmation: bool,
}

impl TogglePlan {
    /// Whether the toggle only affects its own choice.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.deselection.is_none() && self.impacted.is_empty()
    }

    fn mapping_changed(&self) -> bool {
        self.deselection.as_ref().is_some_and(|d| d.mapping_changed)
    }
}

/// What a committed toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The applied toggle.
    pub toggle: Toggle,
    /// The choice the exclusive point gave up.
    pub deselected: Option<ChoiceId>,
    /// Choices deselected as a side effect.
    pub impacted: Vec<ChoiceId>,
    /// The toggle changed a structural option mapping.
    pub mapping_changed: bool,
    /// The override note now held by the toggled choice.
    pub override_note: Option<OverrideNote>,
    /// The enablement evaluation run after the change.
    pub enablement: EnablementReport,
    /// Monotony state of the toggled choice after the change.
    pub monotony: MonotonyConflict,
    /// Price after the change.
    pub price: PriceBreakdown,
    /// Tree revision after the change.
    pub revision: u64,
}

/// A tree snapshot being edited, with everything needed to keep it
/// consistent.
#[derive(Debug, Clone)]
pub struct Session {
    tree: Tree,
    rules: RuleTable,
    context: SessionContext,
    mode: EditMode,
    config: Config,
    ledger: OverrideLedger,
    enablement: EnablementReport,
}

impl Session {
    /// Starts a session, compiling the rules and evaluating the tree.
    ///
    /// Override notes already on the tree are carried into the session's
    /// ledger.
    #[instrument(level = "debug", skip_all, fields(mode = ?mode))]
    #[must_use]
    pub fn new(
        tree: Tree,
        option_rules: Vec<OptionRule>,
        context: SessionContext,
        mode: EditMode,
        config: Config,
    ) -> Self {
        let rules = RuleTable::compile(&tree, option_rules);
        let mut ledger = OverrideLedger::default();
        for choice in tree.choices() {
            if let Some(note) = &choice.override_note {
                ledger.record_choice(choice.id, note.clone());
            }
        }

        let mut session = Self {
            tree,
            rules,
            context,
            mode,
            config,
            ledger,
            enablement: EnablementReport::default(),
        };
        session.refresh();
        session
    }

    /// The current snapshot.
    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The compiled rules.
    #[must_use]
    pub const fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Plan, lot and pricing data.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// New scenario or change order.
    #[must_use]
    pub const fn mode(&self) -> EditMode {
        self.mode
    }

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Overrides recorded so far.
    #[must_use]
    pub const fn ledger(&self) -> &OverrideLedger {
        &self.ledger
    }

    /// Mutable access to the ledger, for restoring saved overrides.
    pub const fn ledger_mut(&mut self) -> &mut OverrideLedger {
        &mut self.ledger
    }

    /// The last enablement evaluation.
    #[must_use]
    pub const fn enablement(&self) -> &EnablementReport {
        &self.enablement
    }

    /// The price of the current selection.
    #[must_use]
    pub fn price(&self) -> PriceBreakdown {
        compute_price_breakdown(
            &self.tree,
            &self.rules,
            PriceInputs {
                plan: self.context.plan.as_ref(),
                lot: self.context.lot.as_ref(),
                programs: &self.context.programs,
                adjustments: &self.context.adjustments,
            },
        )
    }

    /// Monotony state of a choice. Always clear when checks are disabled.
    #[must_use]
    pub fn monotony(&self, choice: ChoiceId) -> MonotonyConflict {
        let (lot, plan) = self.monotony_context();
        check_monotony(&self.tree, lot, plan, choice, &self.ledger)
    }

    fn monotony_context(&self) -> (Option<&Lot>, Option<&Plan>) {
        if self.config.monotony_checks {
            (self.context.lot.as_ref(), self.context.plan.as_ref())
        } else {
            (None, None)
        }
    }

    /// Selects the decision defaults of every point without a selection.
    ///
    /// Each default goes through [`Session::preview`] and is applied only when
    /// it is available, not blocked by monotony, and changes nothing else.
    /// Anything else is left for the person to decide. Returns the choices
    /// that were selected.
    #[instrument(level = "debug", skip(self))]
    pub fn apply_decision_defaults(&mut self) -> Vec<ChoiceId> {
        let mut selected = Vec::new();

        for id in self.tree.pending_decision_defaults() {
            if self.monotony(id).state.is_blocking() {
                tracing::debug!("default {id} skipped: monotony conflict");
                continue;
            }
            match self.preview(Toggle::select(id)) {
                Ok(plan) if plan.is_isolated() && !plan.needs_confirmation => {
                    let granted = self.ledger.choice_override(id).cloned();
                    self.commit(plan, granted, Vec::new());
                    selected.push(id);
                }
                Ok(_) => tracing::debug!("default {id} skipped: it would change other choices"),
                Err(error) => tracing::debug!("default {id} skipped: {error}"),
            }
        }

        selected
    }

    fn refresh(&mut self) -> EnablementReport {
        self.enablement = evaluate_with_limit(&mut self.tree, &self.rules, self.config.pass_limit());
        if self.config.monotony_checks {
            mark_attribute_conflicts(
                &mut self.tree,
                self.context.lot.as_ref(),
                self.context.plan.as_ref(),
            );
        } else {
            mark_attribute_conflicts(&mut self.tree, None, None);
        }
        self.enablement.clone()
    }

    fn label(&self, choice: ChoiceId) -> String {
        self.tree
            .label(choice)
            .unwrap_or_else(|| format!("choice {choice}"))
    }

    /// Validates a toggle and works out its effects without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns a [`ToggleError`] if the choice is unknown, disabled, maps to
    /// an inactive option, or would exceed its maximum quantity; if a required
    /// choice would be deselected, directly or by the cascade; or if a point
    /// that needs a selection would be left without one.
    pub fn preview(&self, toggle: Toggle) -> Result<TogglePlan, ToggleError> {
        let choice = self
            .tree
            .choice(toggle.choice)
            .ok_or(ToggleError::UnknownChoice(toggle.choice))?;
        let point = self
            .tree
            .point(choice.point())
            .ok_or(ToggleError::UnknownChoice(toggle.choice))?;

        let mut deselection = None;
        if toggle.is_selection() {
            if !choice.enabled || !point.enabled {
                return Err(ToggleError::Disabled {
                    choice: choice.id,
                    label: self.label(choice.id),
                });
            }
            if choice.option_disabled {
                return Err(ToggleError::OptionDisabled(choice.id));
            }
            if toggle.quantity > choice.max_quantity {
                return Err(ToggleError::QuantityExceedsMaximum {
                    choice: choice.id,
                    quantity: toggle.quantity,
                    max: choice.max_quantity,
                });
            }
            deselection = choice_to_deselect(&self.tree, &self.rules, choice.id);
            let required = deselection
                .as_ref()
                .map(|info| info.choice)
                .filter(|&id| self.tree.choice(id).is_some_and(|c| c.is_required));
            if let Some(previous) = required {
                return Err(ToggleError::RequiredChoice(previous));
            }
        } else if choice.is_selected() {
            if choice.is_required {
                return Err(ToggleError::RequiredChoice(choice.id));
            }
            let others = self
                .tree
                .choices_in(point.id)
                .any(|c| c.id != choice.id && c.is_selected());
            if point.pick_type.requires_selection() && !others {
                return Err(ToggleError::MinimumSelection {
                    point: point.id,
                    choice: choice.id,
                });
            }
        }

        let impacted = if choice.quantity == toggle.quantity {
            Vec::new()
        } else {
            dependent_choices(&self.tree, &self.rules, toggle)
        };
        let required = impacted
            .iter()
            .copied()
            .find(|&id| self.tree.choice(id).is_some_and(|c| c.is_required));
        if let Some(required) = required {
            return Err(ToggleError::RequiredChoice(required));
        }
        self.check_cascaded_minimums(toggle, deselection.as_ref(), &impacted)?;

        let mut plan = TogglePlan {
            toggle,
            deselection,
            impacted,
            needs_confirmation: false,
        };
        plan.needs_confirmation = match self.mode {
            EditMode::ChangeOrder => !plan.is_isolated(),
            EditMode::NewScenario => false,
        } || (self.config.confirm_structural_changes && plan.mapping_changed());

        Ok(plan)
    }

    /// Rejects a cascade that would leave an enabled Pick1 or Pick1ormore
    /// point without any selected choice.
    fn check_cascaded_minimums(
        &self,
        toggle: Toggle,
        deselection: Option<&DeselectionInfo>,
        impacted: &[ChoiceId],
    ) -> Result<(), ToggleError> {
        if impacted.is_empty() {
            return Ok(());
        }
        let mut scratch = self.tree.clone();
        scratch.set_quantity(toggle.choice, toggle.quantity);
        for id in deselection.map(|d| d.choice).into_iter().chain(impacted.iter().copied()) {
            scratch.set_quantity(id, 0);
        }
        evaluate_with_limit(&mut scratch, &self.rules, self.config.pass_limit());

        for &id in impacted {
            let Some(point) = scratch.point_of(id) else {
                continue;
            };
            let emptied = point.enabled
                && point.pick_type.requires_selection()
                && !scratch.choices_in(point.id).any(Choice::is_selected);
            if emptied {
                tracing::debug!("cascade from choice {} empties point {}", toggle.choice, point.id);
                return Err(ToggleError::MinimumSelection {
                    point: point.id,
                    choice: id,
                });
            }
        }
        Ok(())
    }

    /// The warning shown before applying `plan`.
    #[must_use]
    pub fn impact_warning(&self, plan: &TogglePlan) -> ImpactWarning {
        let affected: Vec<ChoiceId> = plan
            .deselection
            .iter()
            .map(|d| d.choice)
            .chain(plan.impacted.iter().copied())
            .collect();
        ImpactWarning {
            choice: plan.toggle.choice,
            label: self.label(plan.toggle.choice),
            deselected: plan.deselection.as_ref().map(|d| d.choice),
            impacted: plan.impacted.clone(),
            labels: impact_labels(&self.tree, &affected),
            mapping_changed: plan.mapping_changed(),
        }
    }

    /// Applies a toggle through the commit protocol.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Session::preview`];
    /// [`ToggleError::PastCutOff`] or [`ToggleError::MonotonyConflict`] if a
    /// needed override is not given, including for cascaded choices in points
    /// past their cut-off; or [`ToggleError::Cancelled`] if the
    /// person declines. The tree is unchanged on every error.
    #[instrument(level = "debug", skip(self, prompt))]
    pub fn toggle(
        &mut self,
        toggle: Toggle,
        prompt: &mut dyn Prompt,
    ) -> Result<ToggleOutcome, ToggleError> {
        let plan = self.preview(toggle)?;
        let granted = self.authorize(toggle, prompt)?;
        let cascaded = self.authorize_cascade(&plan, prompt)?;

        if plan.needs_confirmation {
            let warning = self.impact_warning(&plan);
            if !prompt.confirm_impact(&warning) {
                tracing::debug!("toggle of choice {} declined", toggle.choice);
                return Err(ToggleError::Cancelled(toggle.choice));
            }
        }

        Ok(self.commit(plan, granted, cascaded))
    }

    /// Collects the overrides a toggle needs. Returns the note the toggled
    /// choice will carry.
    fn authorize(
        &mut self,
        toggle: Toggle,
        prompt: &mut dyn Prompt,
    ) -> Result<Option<OverrideNote>, ToggleError> {
        let id = toggle.choice;
        let (point_id, past_cut_off, unchanged, existing) = {
            let choice = self
                .tree
                .choice(id)
                .ok_or(ToggleError::UnknownChoice(id))?;
            let point = self
                .tree
                .point(choice.point())
                .ok_or(ToggleError::UnknownChoice(id))?;
            (
                point.id,
                point.is_past_cut_off,
                choice.quantity == toggle.quantity,
                choice.override_note.clone(),
            )
        };
        let mut granted = self.ledger.choice_override(id).cloned().or(existing);
        if unchanged {
            return Ok(granted);
        }

        if past_cut_off && granted.is_none() {
            let request = OverrideRequest {
                choice: id,
                label: self.label(id),
                reason: OverrideReason::PastCutOff { point: point_id },
            };
            match prompt.request_override(&request) {
                OverrideDecision::Override(note) => granted = Some(note),
                OverrideDecision::Acknowledge => return Err(ToggleError::PastCutOff(point_id)),
                OverrideDecision::Cancel => return Err(ToggleError::Cancelled(id)),
            }
        }

        if !toggle.is_selection() {
            return Ok(granted);
        }

        let conflict = self.monotony(id);
        match conflict.state {
            MonotonyState::NoConflict | MonotonyState::Overridden(_) => {}
            MonotonyState::Acknowledged => {
                tracing::debug!("choice {id} conflict already seen, still blocked");
                return Err(ToggleError::MonotonyConflict(id));
            }
            MonotonyState::Conflicted => {
                let request = OverrideRequest {
                    choice: id,
                    label: self.label(id),
                    reason: OverrideReason::Monotony(conflict),
                };
                match prompt.request_override(&request) {
                    OverrideDecision::Override(note) => granted = Some(note),
                    OverrideDecision::Acknowledge => {
                        self.ledger.acknowledge(id);
                        return Err(ToggleError::MonotonyConflict(id));
                    }
                    OverrideDecision::Cancel => return Err(ToggleError::Cancelled(id)),
                }
            }
        }

        Ok(granted)
    }

    /// Collects an override for every impacted choice sitting in a point past
    /// its cut-off. Choices that already hold a note are not asked again.
    fn authorize_cascade(
        &self,
        plan: &TogglePlan,
        prompt: &mut dyn Prompt,
    ) -> Result<Vec<(ChoiceId, OverrideNote)>, ToggleError> {
        let mut notes = Vec::new();
        for &id in &plan.impacted {
            let Some(point) = self.tree.point_of(id) else {
                continue;
            };
            if !point.is_past_cut_off {
                continue;
            }
            let covered = self.ledger.choice_override(id).is_some()
                || self.tree.choice(id).is_some_and(|c| c.override_note.is_some());
            if covered {
                continue;
            }
            let request = OverrideRequest {
                choice: id,
                label: self.label(id),
                reason: OverrideReason::PastCutOff { point: point.id },
            };
            match prompt.request_override(&request) {
                OverrideDecision::Override(note) => notes.push((id, note)),
                OverrideDecision::Acknowledge => return Err(ToggleError::PastCutOff(point.id)),
                OverrideDecision::Cancel => return Err(ToggleError::Cancelled(plan.toggle.choice)),
            }
        }
        Ok(notes)
    }

    fn commit(
        &mut self,
        plan: TogglePlan,
        granted: Option<OverrideNote>,
        cascaded: Vec<(ChoiceId, OverrideNote)>,
    ) -> ToggleOutcome {
        let toggle = plan.toggle;
        let mapping_changed = plan.mapping_changed();
        let deselected = plan.deselection.map(|d| d.choice);

        self.tree.set_quantity(toggle.choice, toggle.quantity);
        for &choice in deselected.iter().chain(&plan.impacted) {
            self.tree.set_quantity(choice, 0);
            self.tree.set_override_note(choice, None);
        }

        for (choice, note) in cascaded {
            self.ledger.record_choice(choice, note);
        }
        if let Some(note) = &granted {
            self.ledger.record_choice(toggle.choice, note.clone());
        }
        let override_note = granted.filter(|_| toggle.is_selection());
        self.tree
            .set_override_note(toggle.choice, override_note.clone());

        let enablement = self.refresh();
        tracing::info!(
            "choice {} set to {}, {} other choice(s) deselected",
            toggle.choice,
            toggle.quantity,
            plan.impacted.len() + usize::from(deselected.is_some())
        );

        ToggleOutcome {
            toggle,
            deselected,
            impacted: plan.impacted,
            mapping_changed,
            override_note,
            enablement,
            monotony: self.monotony(toggle.choice),
            price: self.price(),
            revision: self.tree.revision(),
        }
    }

    /// Replaces the attribute and location selections of a choice.
    ///
    /// Attributes flagged as monotony conflicts need an override. A choice
    /// with a single attribute group shares its choice-level override; with
    /// several groups each conflicting group is confirmed on its own.
    /// Returns the number of units placed across locations.
    ///
    /// # Errors
    ///
    /// Returns [`ToggleError::Selection`] if the selections are invalid,
    /// [`ToggleError::AttributeMonotonyConflict`] if an override is refused,
    /// or [`ToggleError::Cancelled`] if the person declines. Nothing is
    /// changed on error.
    #[instrument(level = "debug", skip(self, selections, prompt))]
    pub fn select_attributes(
        &mut self,
        choice: ChoiceId,
        selections: Vec<Selection>,
        prompt: &mut dyn Prompt,
    ) -> Result<u32, ToggleError> {
        let node = self
            .tree
            .choice(choice)
            .ok_or(ToggleError::UnknownChoice(choice))?;
        let placed = validate_selections(node, &selections)?;

        let single_group = node.attribute_groups.len() == 1;
        let mut choice_covered =
            self.ledger.choice_override(choice).is_some() || node.override_note.is_some();
        let mut conflicting: Vec<AttributeGroupId> = selections
            .iter()
            .filter_map(Selection::attribute)
            .filter(|&(group, attribute)| {
                node.attribute_groups
                    .iter()
                    .filter(|g| g.id == group)
                    .filter_map(|g| g.attribute(attribute))
                    .any(|a| a.monotony_conflict)
            })
            .map(|(group, _)| group)
            .collect();
        conflicting.sort_unstable();
        conflicting.dedup();

        let mut choice_note = None;
        let mut group_notes = Vec::new();
        for group in conflicting {
            let covered = if single_group {
                choice_covered
            } else {
                self.ledger.group_override(choice, group).is_some()
            };
            if covered {
                continue;
            }
            let request = OverrideRequest {
                choice,
                label: self.label(choice),
                reason: OverrideReason::AttributeMonotony { group },
            };
            match prompt.request_override(&request) {
                OverrideDecision::Override(note) if single_group => {
                    choice_note = Some(note);
                    choice_covered = true;
                }
                OverrideDecision::Override(note) => group_notes.push((group, note)),
                OverrideDecision::Acknowledge => {
                    return Err(ToggleError::AttributeMonotonyConflict { choice, group });
                }
                OverrideDecision::Cancel => return Err(ToggleError::Cancelled(choice)),
            }
        }

        self.tree.set_selected_attributes(choice, selections);
        for (group, note) in group_notes {
            self.ledger.record_group(choice, group, note);
        }
        if let Some(note) = choice_note {
            self.ledger.record_choice(choice, note.clone());
            if self.tree.is_selected(choice) {
                self.tree.set_override_note(choice, Some(note));
            }
        }
        self.refresh();

        Ok(placed)
    }
}
