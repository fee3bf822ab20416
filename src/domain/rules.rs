//! Disablement rules and option-mapping rules.
//!
//! Points and choices carry their own `disabled_by` rule groups. The
//! [`RuleTable`] compiles those embedded rules, together with the plan's
//! option-mapping rules, into a dependency graph that the engine uses to find
//! which nodes a toggle can affect and to report authoring errors such as
//! cycles or references to nodes that are not in the tree.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::{
    algo::{is_cyclic_directed, tarjan_scc},
    graphmap::DiGraphMap,
    visit::Bfs,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    ids::{ChoiceId, NodeRef, OptionKey, PointId},
    tree::Tree,
};

/// Whether a rule requires or forbids its referenced selections.
///
/// Stored as its numeric code: `1` for must-have, `2` for must-not-have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RuleType {
    /// The owner is disabled unless every referenced point and choice is
    /// selected.
    MustHave = 1,
    /// The owner is disabled if any referenced point or choice is selected.
    MustNotHave = 2,
}

/// A rule type code other than 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown rule type {0}; expected 1 (must have) or 2 (must not have)")]
pub struct InvalidRuleType(pub u8);

impl TryFrom<u8> for RuleType {
    type Error = InvalidRuleType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::MustHave),
            2 => Ok(Self::MustNotHave),
            other => Err(InvalidRuleType(other)),
        }
    }
}

impl From<RuleType> for u8 {
    fn from(rule_type: RuleType) -> Self {
        rule_type as Self
    }
}

/// A single condition over a set of points and/or choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Must-have or must-not-have.
    pub rule_type: RuleType,
    /// Referenced decision points. A point counts as selected when any of its
    /// choices is selected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PointId>,
    /// Referenced choices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceId>,
}

impl Rule {
    /// A rule requiring all of `choices` to be selected.
    #[must_use]
    pub fn must_have_choices(choices: impl IntoIterator<Item = ChoiceId>) -> Self {
        Self {
            rule_type: RuleType::MustHave,
            points: Vec::new(),
            choices: choices.into_iter().collect(),
        }
    }

    /// A rule forbidding any of `choices` from being selected.
    #[must_use]
    pub fn must_not_have_choices(choices: impl IntoIterator<Item = ChoiceId>) -> Self {
        Self {
            rule_type: RuleType::MustNotHave,
            points: Vec::new(),
            choices: choices.into_iter().collect(),
        }
    }

    /// A rule requiring every point in `points` to have a selection.
    #[must_use]
    pub fn must_have_points(points: impl IntoIterator<Item = PointId>) -> Self {
        Self {
            rule_type: RuleType::MustHave,
            points: points.into_iter().collect(),
            choices: Vec::new(),
        }
    }

    /// A rule forbidding a selection in any point of `points`.
    #[must_use]
    pub fn must_not_have_points(points: impl IntoIterator<Item = PointId>) -> Self {
        Self {
            rule_type: RuleType::MustNotHave,
            points: points.into_iter().collect(),
            choices: Vec::new(),
        }
    }

    /// A rule with nothing to reference. Such rules never trigger.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.points.is_empty() && self.choices.is_empty()
    }

    /// All nodes this rule references.
    pub fn references(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.points
            .iter()
            .copied()
            .map(NodeRef::Point)
            .chain(self.choices.iter().copied().map(NodeRef::Choice))
    }
}

/// A conjunction of rules.
///
/// The owner of a list of rule groups is disabled when *any* group has *all*
/// of its rules triggered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// The rules that must all trigger for this group to disable its owner.
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// Creates a group from a list of rules.
    #[must_use]
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Creates a group containing a single rule.
    #[must_use]
    pub fn single(rule: Rule) -> Self {
        Self { rules: vec![rule] }
    }
}

/// One condition of an [`OptionRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRuleChoice {
    /// The choice the condition is about.
    pub choice: ChoiceId,
    /// `true` if the choice must be selected, `false` if it must not be.
    #[serde(default = "default_must_have")]
    pub must_have: bool,
}

const fn default_must_have() -> bool {
    true
}

/// Maps a combination of choices onto a plan option.
///
/// A choice named as must-have in an option rule maps to `option_key`
/// whenever the rule's other conditions hold. This is how structural choices
/// (for example an elevation) change which option a downstream choice prices
/// as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRule {
    /// The plan option produced by this combination.
    pub option_key: OptionKey,
    /// The conditions of the rule.
    pub choices: Vec<OptionRuleChoice>,
}

impl OptionRule {
    /// Creates an option rule.
    #[must_use]
    pub fn new(option_key: impl Into<OptionKey>, choices: Vec<OptionRuleChoice>) -> Self {
        Self {
            option_key: option_key.into(),
            choices,
        }
    }

    fn names_as_subject(&self, choice: ChoiceId) -> bool {
        self.choices
            .iter()
            .any(|condition| condition.must_have && condition.choice == choice)
    }

    fn holds_for(&self, tree: &Tree, subject: ChoiceId) -> bool {
        self.choices.iter().all(|condition| {
            if condition.choice == subject {
                return condition.must_have;
            }
            tree.is_selected(condition.choice) == condition.must_have
        })
    }
}

/// A rule reference to a node that does not exist in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingReference {
    /// The point or choice that owns the rule.
    pub owner: NodeRef,
    /// The referenced node that could not be found.
    pub missing: NodeRef,
}

/// The compiled rule set of a tree.
///
/// Built once per tree snapshot with [`RuleTable::compile`]. The embedded
/// `disabled_by` rules stay on the tree nodes; the table holds the option
/// rules and two graphs over [`NodeRef`]s:
///
/// - the *rule graph*, with an edge from every referenced node to the node
///   owning the rule. Cycles in this graph are authoring errors.
/// - the *influence graph*, which adds containment (choice ↔ point) and
///   option-rule partnerships. A toggle can only affect nodes reachable from
///   the toggled choice in this graph.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    option_rules: Vec<OptionRule>,
    rule_graph: DiGraphMap<NodeRef, ()>,
    influence: DiGraphMap<NodeRef, ()>,
    option_partners: HashMap<ChoiceId, BTreeSet<ChoiceId>>,
    option_subjects: HashSet<ChoiceId>,
    dangling: Vec<DanglingReference>,
}

impl RuleTable {
    /// Compiles the rules embedded in `tree` together with the plan's option
    /// rules.
    ///
    /// References to nodes missing from the tree are recorded (see
    /// [`RuleTable::dangling_references`]) rather than rejected, so that
    /// upstream data problems degrade to disabled nodes instead of errors.
    #[instrument(level = "debug", skip_all, fields(points = tree.points().len(), options = option_rules.len()))]
    #[must_use]
    pub fn compile(tree: &Tree, option_rules: Vec<OptionRule>) -> Self {
        let mut table = Self {
            option_rules,
            ..Self::default()
        };

        for point in tree.points() {
            let owner = NodeRef::Point(point.id);
            table.add_node(owner);
            for choice in point.choices() {
                table.add_containment(point.id, *choice);
            }
            for rule in point.disabled_by.iter().flat_map(|group| &group.rules) {
                table.add_rule_edges(tree, owner, rule);
            }
        }

        for choice in tree.choices() {
            let owner = NodeRef::Choice(choice.id);
            for rule in choice.disabled_by.iter().flat_map(|group| &group.rules) {
                table.add_rule_edges(tree, owner, rule);
            }
        }

        let partnerships: Vec<Vec<ChoiceId>> = table
            .option_rules
            .iter()
            .map(|rule| rule.choices.iter().map(|c| c.choice).collect())
            .collect();
        for members in partnerships {
            for &a in &members {
                if tree.choice(a).is_none() {
                    tracing::warn!("option rule references unknown choice {a}");
                    continue;
                }
                for &b in &members {
                    if a != b && tree.choice(b).is_some() {
                        table.option_partners.entry(a).or_default().insert(b);
                        table
                            .influence
                            .add_edge(NodeRef::Choice(a), NodeRef::Choice(b), ());
                    }
                }
            }
        }

        table.option_subjects = table
            .option_rules
            .iter()
            .flat_map(|rule| &rule.choices)
            .filter(|condition| condition.must_have)
            .map(|condition| condition.choice)
            .collect();

        if !table.dangling.is_empty() {
            tracing::warn!(
                "{} rule reference(s) point at nodes missing from the tree",
                table.dangling.len()
            );
        }

        table
    }

    fn add_node(&mut self, node: NodeRef) {
        self.rule_graph.add_node(node);
        self.influence.add_node(node);
    }

    fn add_containment(&mut self, point: PointId, choice: ChoiceId) {
        let point = NodeRef::Point(point);
        let choice = NodeRef::Choice(choice);
        self.add_node(choice);
        // a point's selection follows its choices, and a choice only counts
        // as selected while its point is enabled
        self.influence.add_edge(choice, point, ());
        self.influence.add_edge(point, choice, ());
    }

    fn add_rule_edges(&mut self, tree: &Tree, owner: NodeRef, rule: &Rule) {
        for reference in rule.references() {
            if !tree.contains(reference) {
                tracing::debug!("{owner} references missing {reference}");
                self.dangling.push(DanglingReference {
                    owner,
                    missing: reference,
                });
                continue;
            }
            self.rule_graph.add_edge(reference, owner, ());
            self.influence.add_edge(reference, owner, ());
        }
    }

    /// The option-mapping rules of the plan.
    #[must_use]
    pub fn option_rules(&self) -> &[OptionRule] {
        &self.option_rules
    }

    /// Rule references to nodes that are not part of the tree.
    #[must_use]
    pub fn dangling_references(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Whether any rules depend on each other in a loop.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.rule_graph)
    }

    /// Every rule cycle, as sorted sets of nodes.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<NodeRef>> {
        let mut cycles = Vec::new();

        for mut component in tarjan_scc(&self.rule_graph) {
            if component.len() > 1 {
                component.sort();
                cycles.push(component);
                continue;
            }

            let Some(&node) = component.first() else {
                continue;
            };

            if self.rule_graph.contains_edge(node, node) {
                cycles.push(vec![node]);
            }
        }

        cycles.sort();
        cycles
    }

    /// Nodes whose rules directly reference `node`.
    pub fn dependents(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        if self.rule_graph.contains_node(node) {
            Some(
                self.rule_graph
                    .neighbors_directed(node, petgraph::Direction::Outgoing),
            )
        } else {
            None
        }
        .into_iter()
        .flatten()
    }

    /// Every node a change to any of `sources` can reach, sources included.
    #[must_use]
    pub fn influenced_by(&self, sources: impl IntoIterator<Item = NodeRef>) -> BTreeSet<NodeRef> {
        let mut reached = BTreeSet::new();
        for source in sources {
            if !reached.insert(source) || !self.influence.contains_node(source) {
                continue;
            }
            let mut bfs = Bfs::new(&self.influence, source);
            while let Some(node) = bfs.next(&self.influence) {
                reached.insert(node);
            }
        }
        reached
    }

    /// Choices that share an option rule with `choice`.
    pub fn option_partners(&self, choice: ChoiceId) -> impl Iterator<Item = ChoiceId> + '_ {
        self.option_partners
            .get(&choice)
            .into_iter()
            .flatten()
            .copied()
    }

    /// The option keys `choice` maps to in the current selection state,
    /// assuming the choice itself is selected.
    ///
    /// Choices not named by any option rule map to all of their own options.
    #[must_use]
    pub fn mapped_options(&self, tree: &Tree, choice: ChoiceId) -> BTreeSet<OptionKey> {
        let Some(node) = tree.choice(choice) else {
            return BTreeSet::new();
        };

        if !self.option_subjects.contains(&choice) {
            return node.options.iter().map(|o| o.key.clone()).collect();
        }

        self.option_rules
            .iter()
            .filter(|rule| rule.names_as_subject(choice) && rule.holds_for(tree, choice))
            .map(|rule| rule.option_key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::fixtures;

    #[test_case(1, Ok(RuleType::MustHave); "must have")]
    #[test_case(2, Ok(RuleType::MustNotHave); "must not have")]
    #[test_case(0, Err(InvalidRuleType(0)); "zero is invalid")]
    #[test_case(3, Err(InvalidRuleType(3)); "three is invalid")]
    fn rule_type_from_code(code: u8, expected: Result<RuleType, InvalidRuleType>) {
        assert_eq!(RuleType::try_from(code), expected);
    }

    #[test]
    fn rules_are_stored_with_numeric_codes() {
        let rule: Rule = serde_yaml::from_str("rule_type: 2\nchoices: [4]\n").unwrap();
        assert_eq!(rule, Rule::must_not_have_choices([ChoiceId(4)]));

        let json = serde_json::to_value(Rule::must_have_choices([ChoiceId(1)])).unwrap();
        assert_eq!(json, serde_json::json!({ "rule_type": 1, "choices": [1] }));

        let invalid: Result<Rule, _> = serde_yaml::from_str("rule_type: MustHave\nchoices: [1]\n");
        assert!(invalid.is_err());
    }

    #[test]
    fn empty_rule_is_malformed() {
        let rule = Rule {
            rule_type: RuleType::MustHave,
            points: Vec::new(),
            choices: Vec::new(),
        };
        assert!(rule.is_malformed());
        assert!(!Rule::must_have_choices([ChoiceId(1)]).is_malformed());
    }

    #[test]
    fn compile_links_references_to_owners() {
        let tree = fixtures::example_tree();
        let table = RuleTable::compile(&tree, Vec::new());

        let dependents: Vec<_> = table
            .dependents(NodeRef::Choice(fixtures::A1))
            .collect();
        assert_eq!(dependents, vec![NodeRef::Choice(fixtures::B1)]);
        assert!(!table.has_cycles());
        assert!(table.dangling_references().is_empty());
    }

    #[test]
    fn dangling_references_are_recorded() {
        let tree = fixtures::tree_with_dangling_reference();
        let table = RuleTable::compile(&tree, Vec::new());

        assert_eq!(
            table.dangling_references(),
            &[DanglingReference {
                owner: NodeRef::Choice(fixtures::B1),
                missing: NodeRef::Choice(ChoiceId(999)),
            }]
        );
    }

    #[test]
    fn detects_rule_cycles() {
        let tree = fixtures::cyclic_tree();
        let table = RuleTable::compile(&tree, Vec::new());

        assert!(table.has_cycles());
        assert_eq!(
            table.cycles(),
            vec![vec![
                NodeRef::Choice(fixtures::C1),
                NodeRef::Choice(fixtures::C2)
            ]]
        );
    }

    #[test]
    fn influence_reaches_through_containment_and_rules() {
        let tree = fixtures::example_tree();
        let table = RuleTable::compile(&tree, Vec::new());

        let reached = table.influenced_by([NodeRef::Choice(fixtures::A2)]);
        assert!(reached.contains(&NodeRef::Point(fixtures::POINT_A)));
        assert!(reached.contains(&NodeRef::Choice(fixtures::A1)));
        assert!(reached.contains(&NodeRef::Choice(fixtures::B1)));
    }

    #[test]
    fn mapped_options_follow_structural_selection() {
        let tree = fixtures::mapping_tree();
        let table = RuleTable::compile(&tree, fixtures::mapping_rules());

        // elevation A is selected in the fixture
        let mapped = table.mapped_options(&tree, fixtures::PORCH);
        assert_eq!(mapped, BTreeSet::from([OptionKey::new("PORCH-A")]));

        let partners: Vec<_> = table.option_partners(fixtures::PORCH).collect();
        assert_eq!(partners, vec![fixtures::ELEVATION_A, fixtures::ELEVATION_B]);
    }

    #[test]
    fn unmapped_choice_uses_own_options() {
        let tree = fixtures::mapping_tree();
        let table = RuleTable::compile(&tree, fixtures::mapping_rules());

        let mapped = table.mapped_options(&tree, fixtures::ELEVATION_B);
        assert_eq!(mapped, BTreeSet::from([OptionKey::new("ELEV-B")]));
    }
}
