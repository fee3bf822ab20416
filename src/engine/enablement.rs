//! Fixed-point evaluation of which points and choices are selectable.
//!
//! A node is disabled when any of its rule groups has all of its rules
//! triggered. Rules look at *effective* selections (a selected choice that is
//! enabled inside an enabled point), so disabling one node can change whether
//! another node's rules trigger. The evaluator repeats whole passes over the
//! tree until no flag changes, or until the pass limit is reached, in which
//! case the nodes still flipping are left disabled.

use std::num::NonZeroUsize;

use tracing::instrument;

use crate::domain::{
    ids::NodeRef,
    rules::{Rule, RuleGroup, RuleTable, RuleType},
    tree::Tree,
};

/// What an enablement evaluation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnablementReport {
    /// Number of passes run, including the final pass that saw no change.
    pub passes: usize,
    /// `false` if the pass limit was hit before the flags settled.
    pub converged: bool,
    /// Nodes forced disabled because they had not settled.
    pub failed_closed: Vec<NodeRef>,
    /// Nodes whose `enabled` flag differs from before the evaluation.
    pub changed: Vec<NodeRef>,
}

/// Recomputes `enabled` on every point and choice, and `option_disabled` on
/// every choice.
///
/// Quantities are never touched.
pub fn evaluate_enablement(tree: &mut Tree, rules: &RuleTable) -> EnablementReport {
    evaluate_with_limit(tree, rules, None)
}

/// Like [`evaluate_enablement`], with the number of passes additionally
/// capped at `limit`.
#[instrument(level = "debug", skip(tree, rules), fields(nodes = tree.node_count()))]
pub fn evaluate_with_limit(
    tree: &mut Tree,
    rules: &RuleTable,
    limit: Option<NonZeroUsize>,
) -> EnablementReport {
    let before = flags(tree);

    // start from a clean slate so the result depends on quantities only
    for point in &mut tree.points {
        point.enabled = true;
    }
    for choice in &mut tree.choices {
        choice.enabled = true;
    }

    let cap = limit.map_or(usize::MAX, NonZeroUsize::get).min(tree.node_count() + 1);
    let mut report = EnablementReport::default();
    let mut last_changed = Vec::new();

    while report.passes < cap {
        report.passes += 1;
        last_changed = run_pass(tree);
        if last_changed.is_empty() {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        tracing::warn!(
            "enablement did not settle after {} passes, disabling {} node(s)",
            report.passes,
            last_changed.len()
        );
        for &node in &last_changed {
            set_enabled(tree, node, false);
        }
        report.failed_closed = last_changed;
    }

    let mut option_flags_changed = false;
    for i in 0..tree.choices.len() {
        let current: &Tree = tree;
        let choice = &current.choices[i];
        let option_disabled = rules
            .mapped_options(current, choice.id)
            .iter()
            .any(|key| choice.option(key).is_some_and(|o| !o.is_active));
        if tree.choices[i].option_disabled != option_disabled {
            tree.choices[i].option_disabled = option_disabled;
            option_flags_changed = true;
        }
    }

    let after = flags(tree);
    report.changed = before
        .into_iter()
        .zip(after)
        .filter(|(a, b)| a.1 != b.1)
        .map(|(a, _)| a.0)
        .collect();

    if !report.changed.is_empty() || option_flags_changed {
        tree.touch();
    }

    tracing::debug!(
        passes = report.passes,
        changed = report.changed.len(),
        "evaluated enablement"
    );
    report
}

/// Computes the next flags from the current ones and applies them. Returns the
/// nodes that flipped.
fn run_pass(tree: &mut Tree) -> Vec<NodeRef> {
    let current: &Tree = tree;
    let points: Vec<bool> = current
        .points
        .iter()
        .map(|p| !is_disabled(current, &p.disabled_by))
        .collect();
    let choices: Vec<bool> = current
        .choices
        .iter()
        .map(|c| !is_disabled(current, &c.disabled_by))
        .collect();

    let mut flipped = Vec::new();
    for (point, enabled) in tree.points.iter_mut().zip(points) {
        if point.enabled != enabled {
            point.enabled = enabled;
            flipped.push(NodeRef::Point(point.id));
        }
    }
    for (choice, enabled) in tree.choices.iter_mut().zip(choices) {
        if choice.enabled != enabled {
            choice.enabled = enabled;
            flipped.push(NodeRef::Choice(choice.id));
        }
    }
    flipped
}

fn is_disabled(tree: &Tree, groups: &[RuleGroup]) -> bool {
    groups
        .iter()
        .any(|group| !group.rules.is_empty() && group.rules.iter().all(|r| triggers(tree, r)))
}

/// Whether a single rule currently counts against its owner.
pub(crate) fn triggers(tree: &Tree, rule: &Rule) -> bool {
    if rule.is_malformed() {
        return false;
    }
    if rule.references().any(|node| !tree.contains(node)) {
        return true;
    }

    match rule.rule_type {
        RuleType::MustHave => {
            let points = rule
                .points
                .iter()
                .all(|&p| tree.point_has_effective_selection(p));
            let choices = rule
                .choices
                .iter()
                .all(|&c| tree.is_effectively_selected(c));
            !(points && choices)
        }
        RuleType::MustNotHave => {
            rule.points
                .iter()
                .any(|&p| tree.point_has_effective_selection(p))
                || rule
                    .choices
                    .iter()
                    .any(|&c| tree.is_effectively_selected(c))
        }
    }
}

fn flags(tree: &Tree) -> Vec<(NodeRef, bool)> {
    tree.points
        .iter()
        .map(|p| (NodeRef::Point(p.id), p.enabled))
        .chain(tree.choices.iter().map(|c| (NodeRef::Choice(c.id), c.enabled)))
        .collect()
}

fn set_enabled(tree: &mut Tree, node: NodeRef, enabled: bool) {
    match node {
        NodeRef::Point(id) => {
            if let Some(i) = tree.point_position(id) {
                tree.points[i].enabled = enabled;
            }
        }
        NodeRef::Choice(id) => {
            if let Some(i) = tree.choice_position(id) {
                tree.choices[i].enabled = enabled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        domain::ids::{ChoiceId, PointId},
        fixtures,
    };

    fn enabled(tree: &Tree, choice: ChoiceId) -> bool {
        tree.choice(choice).unwrap().enabled
    }

    #[test]
    fn must_have_disables_when_reference_unselected() {
        let mut tree = fixtures::example_tree();
        let rules = RuleTable::compile(&tree, Vec::new());

        let report = evaluate_enablement(&mut tree, &rules);
        assert!(report.converged);
        assert!(enabled(&tree, fixtures::B1));

        tree.set_quantity(fixtures::A1, 0);
        tree.set_quantity(fixtures::A2, 1);
        let report = evaluate_enablement(&mut tree, &rules);

        assert!(!enabled(&tree, fixtures::B1));
        assert_eq!(report.changed, vec![NodeRef::Choice(fixtures::B1)]);
        // quantities are left alone
        assert!(tree.is_selected(fixtures::B1));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut tree = fixtures::chain_tree(6);
        let rules = RuleTable::compile(&tree, Vec::new());

        evaluate_enablement(&mut tree, &rules);
        let first: Vec<bool> = tree.choices().iter().map(|c| c.enabled).collect();
        let revision = tree.revision();

        let report = evaluate_enablement(&mut tree, &rules);
        let second: Vec<bool> = tree.choices().iter().map(|c| c.enabled).collect();

        assert_eq!(first, second);
        assert!(report.changed.is_empty());
        assert_eq!(tree.revision(), revision);
    }

    #[test]
    fn disablement_propagates_along_chains() {
        // every link requires the previous one; the head is unselected
        let mut tree = fixtures::chain_tree(5);
        let rules = RuleTable::compile(&tree, Vec::new());

        let report = evaluate_enablement(&mut tree, &rules);

        assert!(report.converged);
        assert!(report.passes >= 5);
        assert!(enabled(&tree, ChoiceId(1)));
        for id in 2..=5 {
            assert!(!enabled(&tree, ChoiceId(id)), "link {id} should be disabled");
        }
    }

    #[test]
    fn oscillating_rules_fail_closed() {
        let mut tree = fixtures::oscillating_tree();
        let rules = RuleTable::compile(&tree, Vec::new());

        let report = evaluate_enablement(&mut tree, &rules);

        assert!(!report.converged);
        assert!(!enabled(&tree, fixtures::C1));
        assert!(!enabled(&tree, fixtures::C2));
        assert_eq!(
            report.failed_closed,
            vec![NodeRef::Choice(fixtures::C1), NodeRef::Choice(fixtures::C2)]
        );
    }

    #[test]
    fn pass_limit_caps_evaluation() {
        let mut tree = fixtures::chain_tree(8);
        let rules = RuleTable::compile(&tree, Vec::new());

        let report = evaluate_with_limit(&mut tree, &rules, NonZeroUsize::new(2));

        assert_eq!(report.passes, 2);
        assert!(!report.converged);
    }

    #[test]
    fn dangling_reference_fails_closed() {
        let mut tree = fixtures::tree_with_dangling_reference();
        let rules = RuleTable::compile(&tree, Vec::new());

        evaluate_enablement(&mut tree, &rules);

        assert!(!enabled(&tree, fixtures::B1));
    }

    #[test_case(Rule::must_have_choices(Vec::new()); "empty must have")]
    #[test_case(Rule::must_not_have_points(Vec::new()); "empty must not have")]
    fn malformed_rules_never_trigger(rule: Rule) {
        let tree = fixtures::example_tree();
        assert!(!triggers(&tree, &rule));
    }

    #[test_case(Rule::must_have_points([fixtures::POINT_A]), false; "must have satisfied point")]
    #[test_case(Rule::must_have_choices([fixtures::A1, fixtures::A2]), true; "must have partially selected")]
    #[test_case(Rule::must_not_have_choices([fixtures::A2]), false; "must not have unselected")]
    #[test_case(Rule::must_not_have_points([fixtures::POINT_B]), true; "must not have selected point")]
    #[test_case(Rule::must_not_have_points([PointId(404)]), true; "must not have missing point")]
    fn rule_triggers(rule: Rule, expected: bool) {
        let tree = fixtures::example_tree();
        assert_eq!(triggers(&tree, &rule), expected);
    }

    #[test]
    fn disabled_point_hides_its_selections() {
        let mut tree = fixtures::gated_point_tree();
        let rules = RuleTable::compile(&tree, Vec::new());

        evaluate_enablement(&mut tree, &rules);

        // the gate point is disabled, so its selected choice no longer
        // satisfies the downstream rule
        assert!(!tree.point(fixtures::GATED_POINT).unwrap().enabled);
        assert!(!enabled(&tree, fixtures::DOWNSTREAM));
    }

    #[test]
    fn inactive_mapped_option_disables_choice() {
        let mut tree = fixtures::mapping_tree();
        let rules = RuleTable::compile(&tree, fixtures::mapping_rules());

        evaluate_enablement(&mut tree, &rules);
        assert!(!tree.choice(fixtures::PORCH).unwrap().option_disabled);

        tree.set_quantity(fixtures::ELEVATION_A, 0);
        tree.set_quantity(fixtures::ELEVATION_B, 1);
        evaluate_enablement(&mut tree, &rules);

        // the porch maps to PORCH-B under elevation B, which is inactive
        assert!(tree.choice(fixtures::PORCH).unwrap().option_disabled);
    }
}
