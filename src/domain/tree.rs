//! In-memory decision tree snapshot
//!
//! The [`Tree`] is an arena: decision points and choices are stored in flat
//! vectors addressed by id, and the Group → `SubGroup` → Point → Choice
//! hierarchy is kept as id lists. Every mutation bumps a revision counter so
//! callers can tell whether anything changed without comparing trees.

use std::{collections::HashMap, fmt};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ids::{
        AttributeGroupId, AttributeId, ChoiceCatalogId, ChoiceId, GroupId, NodeRef, OptionKey,
        PointCatalogId, PointId, SubGroupId,
    },
    money::Money,
    rules::RuleGroup,
    selection::{AttributeGroup, LocationGroup, Selection, SelectionError, validate_selections},
};

/// A free-text justification recorded when a blocked selection is forced
/// through.
///
/// Notes are trimmed and may not be blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OverrideNote(NonEmptyString);

/// The override note was empty or whitespace.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("an override note cannot be blank")]
pub struct EmptyNoteError;

impl OverrideNote {
    /// Creates a note from free text.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyNoteError`] if the text is empty once trimmed.
    pub fn new(text: impl Into<String>) -> Result<Self, EmptyNoteError> {
        let text = text.into();
        NonEmptyString::new(text.trim().to_string())
            .map(Self)
            .map_err(|_| EmptyNoteError)
    }

    /// Returns the note text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for OverrideNote {
    type Error = EmptyNoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OverrideNote> for String {
    fn from(note: OverrideNote) -> Self {
        note.as_str().to_owned()
    }
}

impl fmt::Display for OverrideNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many choices of a point may be selected at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickType {
    /// Exactly one.
    Pick1,
    /// At most one.
    Pick0or1,
    /// At least one.
    Pick1ormore,
    /// Any number.
    Pick0ormore,
}

impl PickType {
    /// Whether selecting a choice replaces the point's current selection.
    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::Pick1 | Self::Pick0or1)
    }

    /// Whether the point must always keep at least one selection.
    #[must_use]
    pub const fn requires_selection(self) -> bool {
        matches!(self, Self::Pick1 | Self::Pick1ormore)
    }
}

/// What a decision point decides, as far as monotony and pricing care.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    /// Any ordinary option.
    #[default]
    General,
    /// The exterior elevation of the home.
    Elevation,
    /// The exterior color scheme of the home.
    ColorScheme,
}

/// A plan option a choice can map to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOption {
    /// Financial option number.
    pub key: OptionKey,
    /// Display name.
    #[serde(default)]
    pub label: String,
    /// Unit price when the option is not on the plan's price list.
    #[serde(default)]
    pub price: Money,
    /// Inactive options make the owning choice unselectable.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PlanOption {
    /// Creates an active option.
    #[must_use]
    pub fn new(key: impl Into<OptionKey>, price: Money) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            price,
            is_active: true,
        }
    }

    /// Marks the option inactive.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

const fn default_true() -> bool {
    true
}

/// A top-level grouping of the tree (for example "Exterior").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group id.
    pub id: GroupId,
    /// Display name.
    pub label: String,
    /// Sub-groups, in display order.
    pub sub_groups: Vec<SubGroup>,
}

/// A second-level grouping of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGroup {
    /// Sub-group id.
    pub id: SubGroupId,
    /// Display name.
    pub label: String,
    /// Decision points, in display order.
    pub points: Vec<PointId>,
}

/// A slot in the tree offering one or more choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// Id within this tree version.
    pub id: PointId,
    /// Id stable across tree versions.
    pub catalog_id: PointCatalogId,
    /// Display name.
    pub label: String,
    /// Cardinality of the point's selection.
    pub pick_type: PickType,
    /// What the point decides.
    #[serde(default)]
    pub category: PointCategory,
    /// Structural points decide which options downstream choices map to.
    #[serde(default)]
    pub is_structural: bool,
    /// Points past their cut-off are locked unless overridden.
    #[serde(default)]
    pub is_past_cut_off: bool,
    /// Derived by the enablement evaluator.
    #[serde(skip, default = "default_true")]
    pub enabled: bool,
    /// The point is disabled when any of these groups triggers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_by: Vec<RuleGroup>,
    #[serde(skip)]
    sub_group: SubGroupId,
    #[serde(skip)]
    choices: Vec<ChoiceId>,
}

impl DecisionPoint {
    /// Creates an enabled point whose catalog id equals its id.
    #[must_use]
    pub fn new(id: PointId, label: impl Into<String>, pick_type: PickType) -> Self {
        Self {
            id,
            catalog_id: PointCatalogId(id.0),
            label: label.into(),
            pick_type,
            category: PointCategory::General,
            is_structural: false,
            is_past_cut_off: false,
            enabled: true,
            disabled_by: Vec::new(),
            sub_group: SubGroupId(0),
            choices: Vec::new(),
        }
    }

    /// Sets the catalog id.
    #[must_use]
    pub const fn with_catalog_id(mut self, catalog_id: PointCatalogId) -> Self {
        self.catalog_id = catalog_id;
        self
    }

    /// Sets the point category.
    #[must_use]
    pub const fn with_category(mut self, category: PointCategory) -> Self {
        self.category = category;
        self
    }

    /// Marks the point structural.
    #[must_use]
    pub const fn structural(mut self) -> Self {
        self.is_structural = true;
        self
    }

    /// Locks the point behind its cut-off date.
    #[must_use]
    pub const fn past_cut_off(mut self) -> Self {
        self.is_past_cut_off = true;
        self
    }

    /// Sets the rule groups that disable this node.
    #[must_use]
    pub fn with_rules(mut self, disabled_by: Vec<RuleGroup>) -> Self {
        self.disabled_by = disabled_by;
        self
    }

    /// The sub-group this point belongs to.
    #[must_use]
    pub const fn sub_group(&self) -> SubGroupId {
        self.sub_group
    }

    /// The point's choices, in display order.
    #[must_use]
    pub fn choices(&self) -> &[ChoiceId] {
        &self.choices
    }
}

/// A selectable option within a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Id within this tree version.
    pub id: ChoiceId,
    /// Id stable across tree versions.
    pub catalog_id: ChoiceCatalogId,
    /// Display name.
    pub label: String,
    /// Zero means unselected.
    #[serde(default)]
    pub quantity: u32,
    /// Upper bound on `quantity`.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
    /// Required choices cannot be deselected.
    #[serde(default)]
    pub is_required: bool,
    /// Selected automatically when its point has no selection.
    #[serde(default)]
    pub is_decision_default: bool,
    /// Derived by the enablement evaluator.
    #[serde(skip, default = "default_true")]
    pub enabled: bool,
    /// Set when the choice maps to an inactive option.
    #[serde(skip)]
    pub option_disabled: bool,
    /// Justification for a forced selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_note: Option<OverrideNote>,
    /// The choice is disabled when any of these groups triggers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_by: Vec<RuleGroup>,
    /// The choice's own options, used when no option rule maps it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PlanOption>,
    /// Attribute groups offered on the choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_groups: Vec<AttributeGroup>,
    /// Location groups offered on the choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_groups: Vec<LocationGroup>,
    /// Attribute and location selections made on the choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_attributes: Vec<Selection>,
    #[serde(skip)]
    point: PointId,
}

const fn default_max_quantity() -> u32 {
    1
}

impl Choice {
    /// Creates an unselected choice with a maximum quantity of one.
    #[must_use]
    pub fn new(id: ChoiceId, label: impl Into<String>) -> Self {
        Self {
            id,
            catalog_id: ChoiceCatalogId(id.0),
            label: label.into(),
            quantity: 0,
            max_quantity: 1,
            is_required: false,
            is_decision_default: false,
            enabled: true,
            option_disabled: false,
            override_note: None,
            disabled_by: Vec::new(),
            options: Vec::new(),
            attribute_groups: Vec::new(),
            location_groups: Vec::new(),
            selected_attributes: Vec::new(),
            point: PointId(0),
        }
    }

    /// Sets the catalog id.
    #[must_use]
    pub const fn with_catalog_id(mut self, catalog_id: ChoiceCatalogId) -> Self {
        self.catalog_id = catalog_id;
        self
    }

    /// Starts the choice selected with the given quantity.
    #[must_use]
    pub const fn selected(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the maximum quantity.
    #[must_use]
    pub const fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    /// Marks the choice required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Marks the choice as its point's default.
    #[must_use]
    pub const fn decision_default(mut self) -> Self {
        self.is_decision_default = true;
        self
    }

    /// Sets the rule groups that disable this node.
    #[must_use]
    pub fn with_rules(mut self, disabled_by: Vec<RuleGroup>) -> Self {
        self.disabled_by = disabled_by;
        self
    }

    /// Adds one of the choice's own options.
    #[must_use]
    pub fn with_option(mut self, option: PlanOption) -> Self {
        self.options.push(option);
        self
    }

    /// Offers an attribute group on the choice.
    #[must_use]
    pub fn with_attribute_group(mut self, group: AttributeGroup) -> Self {
        self.attribute_groups.push(group);
        self
    }

    /// Offers a location group on the choice.
    #[must_use]
    pub fn with_location_group(mut self, group: LocationGroup) -> Self {
        self.location_groups.push(group);
        self
    }

    /// Starts the choice with an override note.
    #[must_use]
    pub fn with_override_note(mut self, note: OverrideNote) -> Self {
        self.override_note = Some(note);
        self
    }

    /// The point this choice belongs to.
    #[must_use]
    pub const fn point(&self) -> PointId {
        self.point
    }

    /// Whether the quantity is non-zero, regardless of enablement.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.quantity > 0
    }

    /// Looks up one of the choice's own options.
    #[must_use]
    pub fn option(&self, key: &OptionKey) -> Option<&PlanOption> {
        self.options.iter().find(|o| &o.key == key)
    }

    /// Whether an attribute of the given group is among the selections.
    #[must_use]
    pub fn has_selected_attribute(&self, group: AttributeGroupId, attribute: AttributeId) -> bool {
        self.selected_attributes
            .iter()
            .any(|s| s.attribute() == Some((group, attribute)))
    }
}

/// Errors building a [`Tree`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// Two groups share an id.
    #[error("duplicate group id {0}")]
    DuplicateGroup(GroupId),
    /// Two sub-groups share an id.
    #[error("duplicate sub-group id {0}")]
    DuplicateSubGroup(SubGroupId),
    /// Two decision points share an id.
    #[error("duplicate decision point id {0}")]
    DuplicatePoint(PointId),
    /// Two choices share an id.
    #[error("duplicate choice id {0}")]
    DuplicateChoice(ChoiceId),
    /// A sub-group was added before any group.
    #[error("sub-group {0} has no enclosing group")]
    OrphanSubGroup(SubGroupId),
    /// A decision point was added before any sub-group.
    #[error("decision point {0} has no enclosing sub-group")]
    OrphanPoint(PointId),
    /// A choice was added before any decision point.
    #[error("choice {0} has no enclosing decision point")]
    OrphanChoice(ChoiceId),
    /// A choice starts with more than its maximum quantity.
    #[error("choice {choice} has quantity {quantity}, above its maximum of {max}")]
    QuantityExceedsMaximum {
        /// The choice.
        choice: ChoiceId,
        /// Its quantity.
        quantity: u32,
        /// Its maximum quantity.
        max: u32,
    },
    /// A choice starts with attribute or location selections it does not
    /// offer, or with more units placed than it allows.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// A single-pick point starts with several selected choices.
    #[error("decision point {point} allows one selection but has {selected}")]
    TooManySelections {
        /// The point.
        point: PointId,
        /// How many of its choices are selected.
        selected: usize,
    },
}

/// A decision tree snapshot.
///
/// Build one with [`TreeBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Tree {
    groups: Vec<Group>,
    pub(crate) points: Vec<DecisionPoint>,
    pub(crate) choices: Vec<Choice>,
    point_index: HashMap<PointId, usize>,
    choice_index: HashMap<ChoiceId, usize>,
    revision: u64,
}

impl Tree {
    /// Starts building a tree.
    #[must_use]
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }

    /// Groups, in display order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// All decision points, in tree order.
    #[must_use]
    pub fn points(&self) -> &[DecisionPoint] {
        &self.points
    }

    /// All choices, in tree order.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Looks up a decision point by id.
    #[must_use]
    pub fn point(&self, id: PointId) -> Option<&DecisionPoint> {
        self.point_index.get(&id).map(|&i| &self.points[i])
    }

    /// Looks up a choice by id.
    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choice_index.get(&id).map(|&i| &self.choices[i])
    }

    /// The decision point owning `choice`.
    #[must_use]
    pub fn point_of(&self, choice: ChoiceId) -> Option<&DecisionPoint> {
        self.choice(choice).and_then(|c| self.point(c.point))
    }

    /// The choices of a point, in display order.
    pub fn choices_in(&self, point: PointId) -> impl Iterator<Item = &Choice> + '_ {
        self.point(point)
            .into_iter()
            .flat_map(|p| p.choices.iter())
            .filter_map(|&id| self.choice(id))
    }

    /// Whether the node exists in this tree.
    #[must_use]
    pub fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Point(id) => self.point_index.contains_key(&id),
            NodeRef::Choice(id) => self.choice_index.contains_key(&id),
        }
    }

    /// Number of points plus number of choices.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.points.len() + self.choices.len()
    }

    /// Incremented by every mutation of the tree.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the choice has a non-zero quantity. Unknown choices are not
    /// selected.
    #[must_use]
    pub fn is_selected(&self, choice: ChoiceId) -> bool {
        self.choice(choice).is_some_and(Choice::is_selected)
    }

    /// Whether the choice is selected and both it and its point are enabled.
    #[must_use]
    pub fn is_effectively_selected(&self, choice: ChoiceId) -> bool {
        self.choice(choice).is_some_and(|c| {
            c.is_selected() && c.enabled && self.point(c.point).is_some_and(|p| p.enabled)
        })
    }

    /// Whether any choice of the point is effectively selected.
    #[must_use]
    pub fn point_has_effective_selection(&self, point: PointId) -> bool {
        self.point(point).is_some_and(|p| {
            p.enabled
                && p.choices
                    .iter()
                    .filter_map(|&id| self.choice(id))
                    .any(|c| c.is_selected() && c.enabled)
        })
    }

    /// Ids of every choice with a non-zero quantity, in tree order.
    pub fn selected_choices(&self) -> impl Iterator<Item = ChoiceId> + '_ {
        self.choices
            .iter()
            .filter(|c| c.is_selected())
            .map(|c| c.id)
    }

    /// A "Point: Choice" label for display.
    #[must_use]
    pub fn label(&self, choice: ChoiceId) -> Option<String> {
        let c = self.choice(choice)?;
        let p = self.point(c.point)?;
        Some(format!("{}: {}", p.label, c.label))
    }

    /// Decision-default choices that could fill a point with no selection.
    ///
    /// Disabled points, points past their cut-off, and defaults that are
    /// disabled or map to an inactive option are skipped. Single-pick points
    /// offer only their first remaining default.
    #[must_use]
    pub fn pending_decision_defaults(&self) -> Vec<ChoiceId> {
        let mut pending = Vec::new();

        for point in self.points.iter().filter(|p| p.enabled && !p.is_past_cut_off) {
            if self.choices_in(point.id).any(Choice::is_selected) {
                continue;
            }
            let defaults = self
                .choices_in(point.id)
                .filter(|c| c.is_decision_default && c.enabled && !c.option_disabled)
                .map(|c| c.id);
            if point.pick_type.is_exclusive() {
                pending.extend(defaults.take(1));
            } else {
                pending.extend(defaults);
            }
        }

        pending
    }

    /// Sets a choice's quantity. Returns `false` if the choice is unknown.
    pub(crate) fn set_quantity(&mut self, choice: ChoiceId, quantity: u32) -> bool {
        let Some(&i) = self.choice_index.get(&choice) else {
            return false;
        };
        if self.choices[i].quantity != quantity {
            self.choices[i].quantity = quantity;
            self.touch();
        }
        true
    }

    pub(crate) fn set_override_note(&mut self, choice: ChoiceId, note: Option<OverrideNote>) {
        let Some(&i) = self.choice_index.get(&choice) else {
            return;
        };
        if self.choices[i].override_note != note {
            self.choices[i].override_note = note;
            self.touch();
        }
    }

    pub(crate) fn set_selected_attributes(&mut self, choice: ChoiceId, selections: Vec<Selection>) {
        if let Some(&i) = self.choice_index.get(&choice) {
            self.choices[i].selected_attributes = selections;
            self.touch();
        }
    }

    /// Flags or clears the monotony conflict on one attribute of a choice.
    pub(crate) fn set_attribute_conflict(
        &mut self,
        choice: ChoiceId,
        group: AttributeGroupId,
        attribute: AttributeId,
        conflict: bool,
    ) {
        let Some(&i) = self.choice_index.get(&choice) else {
            return;
        };
        let target = self.choices[i]
            .attribute_groups
            .iter_mut()
            .filter(|g| g.id == group)
            .flat_map(|g| g.attributes.iter_mut())
            .find(|a| a.id == attribute);
        let Some(target) = target else {
            return;
        };
        if target.monotony_conflict != conflict {
            target.monotony_conflict = conflict;
            self.touch();
        }
    }

    pub(crate) const fn touch(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn point_position(&self, id: PointId) -> Option<usize> {
        self.point_index.get(&id).copied()
    }

    pub(crate) fn choice_position(&self, id: ChoiceId) -> Option<usize> {
        self.choice_index.get(&id).copied()
    }
}

/// Incremental [`Tree`] construction in display order.
///
/// Each sub-group attaches to the last group added, each point to the last
/// sub-group and each choice to the last point. The first error encountered
/// is reported by [`TreeBuilder::build`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
    error: Option<TreeError>,
}

impl TreeBuilder {
    fn fail(&mut self, error: TreeError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Adds a group after the existing ones.
    #[must_use]
    pub fn group(mut self, id: GroupId, label: impl Into<String>) -> Self {
        if self.tree.groups.iter().any(|g| g.id == id) {
            self.fail(TreeError::DuplicateGroup(id));
            return self;
        }
        self.tree.groups.push(Group {
            id,
            label: label.into(),
            sub_groups: Vec::new(),
        });
        self
    }

    /// Adds a sub-group to the last group.
    #[must_use]
    pub fn sub_group(mut self, id: SubGroupId, label: impl Into<String>) -> Self {
        let duplicate = self
            .tree
            .groups
            .iter()
            .flat_map(|g| &g.sub_groups)
            .any(|s| s.id == id);
        if duplicate {
            self.fail(TreeError::DuplicateSubGroup(id));
            return self;
        }
        let Some(group) = self.tree.groups.last_mut() else {
            self.fail(TreeError::OrphanSubGroup(id));
            return self;
        };
        group.sub_groups.push(SubGroup {
            id,
            label: label.into(),
            points: Vec::new(),
        });
        self
    }

    /// Adds a decision point to the last sub-group. Any choice ids already
    /// on the point are dropped; choices are attached with
    /// [`TreeBuilder::choice`].
    #[must_use]
    pub fn point(mut self, mut point: DecisionPoint) -> Self {
        if self.tree.point_index.contains_key(&point.id) {
            self.fail(TreeError::DuplicatePoint(point.id));
            return self;
        }
        let Some(sub_group) = self
            .tree
            .groups
            .last_mut()
            .and_then(|g| g.sub_groups.last_mut())
        else {
            self.fail(TreeError::OrphanPoint(point.id));
            return self;
        };
        sub_group.points.push(point.id);
        point.sub_group = sub_group.id;
        point.choices.clear();
        self.tree
            .point_index
            .insert(point.id, self.tree.points.len());
        self.tree.points.push(point);
        self
    }

    /// Adds a choice to the last decision point.
    ///
    /// The choice's quantity must not exceed its maximum, and its
    /// attribute and location selections must be valid for it.
    #[must_use]
    pub fn choice(mut self, mut choice: Choice) -> Self {
        if self.tree.choice_index.contains_key(&choice.id) {
            self.fail(TreeError::DuplicateChoice(choice.id));
            return self;
        }
        if choice.quantity > choice.max_quantity {
            self.fail(TreeError::QuantityExceedsMaximum {
                choice: choice.id,
                quantity: choice.quantity,
                max: choice.max_quantity,
            });
            return self;
        }
        if let Err(error) = validate_selections(&choice, &choice.selected_attributes) {
            self.fail(error.into());
            return self;
        }
        let Some(point) = self.tree.points.last_mut() else {
            self.fail(TreeError::OrphanChoice(choice.id));
            return self;
        };
        point.choices.push(choice.id);
        choice.point = point.id;
        self.tree
            .choice_index
            .insert(choice.id, self.tree.choices.len());
        self.tree.choices.push(choice);
        self
    }

    /// Finishes the tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`TreeError`] hit while adding nodes, or
    /// [`TreeError::TooManySelections`] if a single-pick point starts with
    /// more than one selected choice.
    pub fn build(self) -> Result<Tree, TreeError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let tree = self.tree;
        for point in &tree.points {
            if !point.pick_type.is_exclusive() {
                continue;
            }
            let selected = tree.choices_in(point.id).filter(|c| c.is_selected()).count();
            if selected > 1 {
                return Err(TreeError::TooManySelections {
                    point: point.id,
                    selected,
                });
            }
        }

        tracing::debug!(
            points = tree.points.len(),
            choices = tree.choices.len(),
            "built decision tree"
        );
        Ok(tree)
    }
}
