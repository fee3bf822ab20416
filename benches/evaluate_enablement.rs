//! Enablement evaluation and cascading deselection over a long chain of
//! must-have rules, where each link depends on the one before it.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use homecfg::{
    Config, EditMode, Session, SessionContext, Toggle, Tree,
    domain::{
        Choice, ChoiceId, DecisionPoint, PickType, PointId, Rule, RuleGroup, RuleTable,
        ids::{GroupId, SubGroupId},
    },
    engine::{NonInteractive, evaluate_enablement},
};

const LINKS: u32 = 200;

/// Builds a tree with every link selected.
fn chain(n: u32) -> Tree {
    let mut builder = Tree::builder()
        .group(GroupId(1), "Interior")
        .sub_group(SubGroupId(1), "Chain")
        .point(DecisionPoint::new(PointId(1), "Chain", PickType::Pick0ormore));
    for k in 1..=n {
        let mut link = Choice::new(ChoiceId(k), format!("Link {k}")).selected(1);
        if k > 1 {
            link = link.with_rules(vec![RuleGroup::single(Rule::must_have_choices([
                ChoiceId(k - 1),
            ]))]);
        }
        builder = builder.choice(link);
    }
    builder.build().unwrap()
}

fn evaluate(c: &mut Criterion) {
    let tree = chain(LINKS);
    let rules = RuleTable::compile(&tree, Vec::new());

    c.bench_function("evaluate enablement", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| evaluate_enablement(&mut tree, &rules),
            BatchSize::SmallInput,
        );
    });
}

fn cascade(c: &mut Criterion) {
    let session = Session::new(
        chain(LINKS),
        Vec::new(),
        SessionContext::default(),
        EditMode::NewScenario,
        Config::default(),
    );

    c.bench_function("deselect chain head", |b| {
        b.iter_batched(
            || session.clone(),
            |mut session| {
                session
                    .toggle(Toggle::deselect(ChoiceId(1)), &mut NonInteractive::accept_all())
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, evaluate, cascade);
criterion_main!(benches);
