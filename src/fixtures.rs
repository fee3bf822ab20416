//! Trees shared by the unit tests.

use crate::domain::{
    context::{Lot, MonotonyRule, Plan, PlanOptionPrice, SalesPhase},
    ids::{
        AttributeCommunityId, AttributeGroupId, AttributeId, ChoiceCatalogId, ChoiceId, GroupId,
        LocationGroupId, LocationId, LotId, PlanId, PointId, SalesPhaseId, SubGroupId,
    },
    money::Money,
    rules::{OptionRule, OptionRuleChoice, Rule, RuleGroup},
    selection::{Attribute, AttributeGroup, Location, LocationGroup},
    tree::{Choice, DecisionPoint, PickType, PlanOption, PointCategory, Tree, TreeBuilder},
};

pub const POINT_A: PointId = PointId(1);
pub const POINT_B: PointId = PointId(2);
pub const A1: ChoiceId = ChoiceId(1);
pub const A2: ChoiceId = ChoiceId(2);
pub const B1: ChoiceId = ChoiceId(3);

pub const C1: ChoiceId = ChoiceId(11);
pub const C2: ChoiceId = ChoiceId(12);

pub const GATED_POINT: PointId = PointId(2);
pub const DOWNSTREAM: ChoiceId = ChoiceId(3);

pub const ELEVATION_A: ChoiceId = ChoiceId(21);
pub const ELEVATION_B: ChoiceId = ChoiceId(22);
pub const PORCH: ChoiceId = ChoiceId(31);
pub const PORCH_LIGHT: ChoiceId = ChoiceId(36);

pub const CABINETS: ChoiceId = ChoiceId(41);
pub const PAINT_GROUP: AttributeGroupId = AttributeGroupId(1);
pub const WHITE: AttributeId = AttributeId(1);
pub const ROOMS: LocationGroupId = LocationGroupId(1);
pub const KITCHEN: LocationId = LocationId(1);
pub const BATH: LocationId = LocationId(2);

pub const ELEV_COLONIAL: ChoiceId = ChoiceId(51);
pub const ELEV_CRAFTSMAN: ChoiceId = ChoiceId(52);
pub const SIDING: ChoiceId = ChoiceId(61);
pub const BODY_COLOR: AttributeGroupId = AttributeGroupId(10);
pub const SAGE: AttributeId = AttributeId(11);
pub const TRIM_COLOR: AttributeGroupId = AttributeGroupId(20);
pub const WHITE_TRIM: AttributeId = AttributeId(21);
pub const SHUTTERS: ChoiceId = ChoiceId(71);
pub const SHUTTER_COLOR: AttributeGroupId = AttributeGroupId(30);
pub const BLACK: AttributeId = AttributeId(31);

pub const FANS: ChoiceId = ChoiceId(91);
pub const FIREPLACE: ChoiceId = ChoiceId(101);

pub const FOUNDATION: ChoiceId = ChoiceId(111);
pub const SLAB_FINISH_DEFAULT: ChoiceId = ChoiceId(121);

pub const LATE_CHOICE: ChoiceId = ChoiceId(131);

fn skeleton() -> TreeBuilder {
    Tree::builder()
        .group(GroupId(1), "Exterior")
        .sub_group(SubGroupId(1), "Structure")
}

pub fn requires(choices: impl IntoIterator<Item = ChoiceId>) -> Vec<RuleGroup> {
    vec![RuleGroup::single(Rule::must_have_choices(choices))]
}

fn condition(choice: ChoiceId, must_have: bool) -> OptionRuleChoice {
    OptionRuleChoice { choice, must_have }
}

fn attribute(id: AttributeId, label: &str, community: u32) -> Attribute {
    Attribute {
        community_id: AttributeCommunityId(community),
        ..Attribute::new(id, label)
    }
}

/// Point A picks one of A1 and A2; B1 in point B requires A1.
pub fn example_tree() -> Tree {
    example_tree_with(
        DecisionPoint::new(POINT_B, "Point B", PickType::Pick0or1),
        Choice::new(B1, "B1"),
    )
}

/// The example tree with point B and B1 swapped out. B1 is selected and
/// still requires A1.
pub fn example_tree_with(point_b: DecisionPoint, b1: Choice) -> Tree {
    skeleton()
        .point(DecisionPoint::new(POINT_A, "Point A", PickType::Pick1))
        .choice(Choice::new(A1, "A1").selected(1))
        .choice(Choice::new(A2, "A2"))
        .point(point_b)
        .choice(b1.selected(1).with_rules(requires([A1])))
        .build()
        .unwrap()
}

pub fn tree_with_dangling_reference() -> Tree {
    skeleton()
        .point(DecisionPoint::new(POINT_A, "Point A", PickType::Pick1))
        .choice(Choice::new(A1, "A1").selected(1))
        .choice(Choice::new(A2, "A2"))
        .point(DecisionPoint::new(POINT_B, "Point B", PickType::Pick0or1))
        .choice(
            Choice::new(B1, "B1")
                .selected(1)
                .with_rules(requires([ChoiceId(999)])),
        )
        .build()
        .unwrap()
}

pub fn cyclic_tree() -> Tree {
    skeleton()
        .point(DecisionPoint::new(PointId(10), "Loop", PickType::Pick0ormore))
        .choice(Choice::new(C1, "C1").selected(1).with_rules(requires([C2])))
        .choice(Choice::new(C2, "C2").selected(1).with_rules(requires([C1])))
        .build()
        .unwrap()
}

/// C1 and C2 each exclude the other, so neither setting is stable.
pub fn oscillating_tree() -> Tree {
    let excludes = |other: ChoiceId| vec![RuleGroup::single(Rule::must_not_have_choices([other]))];
    skeleton()
        .point(DecisionPoint::new(PointId(10), "Swing", PickType::Pick0ormore))
        .choice(Choice::new(C1, "C1").selected(1).with_rules(excludes(C2)))
        .choice(Choice::new(C2, "C2").selected(1).with_rules(excludes(C1)))
        .build()
        .unwrap()
}

/// Links `1..=n`, each requiring the previous one. Every link but the first
/// is selected.
pub fn chain_tree(n: u32) -> Tree {
    let mut builder =
        skeleton().point(DecisionPoint::new(PointId(1), "Chain", PickType::Pick0ormore));
    for k in 1..=n {
        let mut link = Choice::new(ChoiceId(k), format!("Link {k}"));
        if k > 1 {
            link = link.selected(1).with_rules(requires([ChoiceId(k - 1)]));
        }
        builder = builder.choice(link);
    }
    builder.build().unwrap()
}

/// A point disabled by an unselected switch, holding a selection another
/// choice depends on.
pub fn gated_point_tree() -> Tree {
    let switch = ChoiceId(1);
    skeleton()
        .point(DecisionPoint::new(PointId(1), "Switch", PickType::Pick0or1))
        .choice(Choice::new(switch, "On"))
        .point(
            DecisionPoint::new(GATED_POINT, "Gated", PickType::Pick0or1)
                .with_rules(requires([switch])),
        )
        .choice(Choice::new(ChoiceId(2), "Inside").selected(1))
        .point(DecisionPoint::new(PointId(3), "Downstream", PickType::Pick0or1))
        .choice(
            Choice::new(DOWNSTREAM, "Follower")
                .selected(1)
                .with_rules(vec![RuleGroup::single(Rule::must_have_points([GATED_POINT]))]),
        )
        .build()
        .unwrap()
}

/// A structural elevation point whose selection decides which option the
/// porch maps to. The option under elevation B is inactive.
pub fn mapping_tree() -> Tree {
    mapping_builder().build().unwrap()
}

fn mapping_builder() -> TreeBuilder {
    skeleton()
        .point(
            DecisionPoint::new(PointId(20), "Elevation", PickType::Pick1)
                .with_category(PointCategory::Elevation)
                .structural(),
        )
        .choice(
            Choice::new(ELEVATION_A, "Elevation A")
                .selected(1)
                .with_option(PlanOption::new("ELEV-A", Money::from_dollars(8_000))),
        )
        .choice(
            Choice::new(ELEVATION_B, "Elevation B")
                .with_option(PlanOption::new("ELEV-B", Money::from_dollars(9_000))),
        )
        .point(DecisionPoint::new(PointId(30), "Porch", PickType::Pick0or1))
        .choice(
            Choice::new(PORCH, "Covered porch")
                .selected(1)
                .with_option(PlanOption::new("PORCH-A", Money::from_dollars(5_000)))
                .with_option(PlanOption::new("PORCH-B", Money::from_dollars(6_500)).inactive()),
        )
}

/// The mapping tree plus a porch light whose option depends on the porch.
pub fn porch_light_tree() -> Tree {
    mapping_builder()
        .point(DecisionPoint::new(PointId(35), "Lighting", PickType::Pick0or1))
        .choice(
            Choice::new(PORCH_LIGHT, "Porch light")
                .selected(1)
                .with_option(PlanOption::new("LIGHT-PORCH", Money::from_dollars(400)))
                .with_option(PlanOption::new("LIGHT-WALL", Money::from_dollars(250))),
        )
        .build()
        .unwrap()
}

pub fn porch_light_rules() -> Vec<OptionRule> {
    let mut rules = mapping_rules();
    rules.push(OptionRule::new(
        "LIGHT-PORCH",
        vec![condition(PORCH_LIGHT, true), condition(PORCH, true)],
    ));
    rules.push(OptionRule::new(
        "LIGHT-WALL",
        vec![condition(PORCH_LIGHT, true), condition(PORCH, false)],
    ));
    rules
}

pub fn mapping_rules() -> Vec<OptionRule> {
    vec![
        OptionRule::new(
            "PORCH-A",
            vec![condition(PORCH, true), condition(ELEVATION_B, false)],
        ),
        OptionRule::new(
            "PORCH-B",
            vec![condition(PORCH, true), condition(ELEVATION_A, false)],
        ),
    ]
}

/// Up to four cabinets, painted and placed by room.
pub fn cabinet_choice() -> Choice {
    Choice::new(CABINETS, "Upper cabinets")
        .with_max_quantity(4)
        .with_attribute_group(AttributeGroup {
            id: PAINT_GROUP,
            label: "Paint".to_string(),
            attributes: vec![Attribute::new(WHITE, "White")],
        })
        .with_location_group(LocationGroup {
            id: ROOMS,
            label: "Rooms".to_string(),
            locations: vec![
                Location {
                    id: KITCHEN,
                    label: "Kitchen".to_string(),
                },
                Location {
                    id: BATH,
                    label: "Bath".to_string(),
                },
            ],
        })
}

pub fn cabinet_tree() -> Tree {
    skeleton()
        .point(DecisionPoint::new(PointId(40), "Cabinets", PickType::Pick0or1))
        .choice(cabinet_choice().selected(1))
        .build()
        .unwrap()
}

/// Elevation, siding and shutters on a lot whose neighbours already use the
/// craftsman elevation and some of the colors.
pub fn monotony_tree() -> Tree {
    skeleton()
        .point(
            DecisionPoint::new(PointId(50), "Elevation", PickType::Pick1)
                .with_category(PointCategory::Elevation)
                .structural(),
        )
        .choice(
            Choice::new(ELEV_COLONIAL, "Colonial")
                .selected(1)
                .with_option(PlanOption::new("ELEV-COL", Money::from_dollars(6_000))),
        )
        .choice(
            Choice::new(ELEV_CRAFTSMAN, "Craftsman")
                .with_catalog_id(ChoiceCatalogId(4001))
                .with_option(PlanOption::new("ELEV-CRA", Money::from_dollars(8_000))),
        )
        .point(DecisionPoint::new(PointId(60), "Siding", PickType::Pick0or1))
        .choice(
            Choice::new(SIDING, "Lap siding")
                .selected(1)
                .with_attribute_group(AttributeGroup {
                    id: BODY_COLOR,
                    label: "Body color".to_string(),
                    attributes: vec![
                        attribute(SAGE, "Sage", 901),
                        attribute(AttributeId(12), "Sand", 902),
                    ],
                })
                .with_attribute_group(AttributeGroup {
                    id: TRIM_COLOR,
                    label: "Trim color".to_string(),
                    attributes: vec![attribute(WHITE_TRIM, "White", 903)],
                }),
        )
        .point(DecisionPoint::new(PointId(70), "Shutters", PickType::Pick0or1))
        .choice(
            Choice::new(SHUTTERS, "Louvered shutters")
                .selected(1)
                .with_attribute_group(AttributeGroup {
                    id: SHUTTER_COLOR,
                    label: "Shutter color".to_string(),
                    attributes: vec![
                        attribute(BLACK, "Black", 903),
                        attribute(AttributeId(32), "Green", 905),
                    ],
                }),
        )
        .build()
        .unwrap()
}

/// An elevation and a fireplace off the plan's list, plus two fans on it.
pub fn priced_tree() -> Tree {
    skeleton()
        .point(
            DecisionPoint::new(PointId(80), "Elevation", PickType::Pick1)
                .with_category(PointCategory::Elevation),
        )
        .choice(
            Choice::new(ChoiceId(81), "Craftsman")
                .selected(1)
                .with_option(PlanOption::new("ELEV-CRAFT", Money::from_dollars(8_000))),
        )
        .point(DecisionPoint::new(PointId(90), "Ceiling fans", PickType::Pick0or1))
        .choice(
            Choice::new(FANS, "Fan")
                .with_max_quantity(4)
                .selected(2)
                .with_option(PlanOption::new("FAN", Money::from_dollars(300))),
        )
        .point(DecisionPoint::new(PointId(100), "Fireplace", PickType::Pick0or1))
        .choice(
            Choice::new(FIREPLACE, "Gas fireplace")
                .selected(1)
                .with_option(PlanOption::new("FIREPLACE", Money::from_dollars(4_000))),
        )
        .build()
        .unwrap()
}

/// A required foundation and an unselected point with a default.
pub fn required_tree() -> Tree {
    skeleton()
        .point(DecisionPoint::new(PointId(110), "Foundation", PickType::Pick1))
        .choice(Choice::new(FOUNDATION, "Slab").required().selected(1))
        .choice(Choice::new(ChoiceId(112), "Crawlspace"))
        .point(DecisionPoint::new(PointId(120), "Slab finish", PickType::Pick1))
        .choice(Choice::new(SLAB_FINISH_DEFAULT, "Broom").decision_default())
        .choice(Choice::new(ChoiceId(122), "Stained"))
        .build()
        .unwrap()
}

pub fn cut_off_tree() -> Tree {
    skeleton()
        .point(DecisionPoint::new(PointId(130), "Appliances", PickType::Pick0or1).past_cut_off())
        .choice(Choice::new(LATE_CHOICE, "Gas range"))
        .build()
        .unwrap()
}

pub fn plan() -> Plan {
    Plan {
        id: PlanId(1),
        name: "Aspen".to_string(),
        list_price: Money::from_dollars(300_000),
        options: vec![PlanOptionPrice {
            key: "FAN".into(),
            price: Money::from_dollars(250),
        }],
    }
}

pub fn lot() -> Lot {
    Lot {
        id: LotId(1),
        premium: Money::from_dollars(15_000),
        phased_pricing_enabled: false,
        sales_phase: Some(SalesPhase {
            id: SalesPhaseId(1),
            plan_prices: vec![(PlanId(1), Money::from_dollars(310_000))],
        }),
        monotony_rules: vec![MonotonyRule {
            edh_plan_id: PlanId(1),
            elevation_catalog_ids: vec![ChoiceCatalogId(4001)],
            color_scheme_catalog_ids: Vec::new(),
            color_scheme_attribute_community_ids: vec![
                AttributeCommunityId(901),
                AttributeCommunityId(903),
            ],
        }],
    }
}
