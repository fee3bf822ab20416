//! Plan, lot and sales-program data the engine reads but never mutates.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ids::{
        AttributeCommunityId, ChoiceCatalogId, LotId, OptionKey, PlanId, SalesPhaseId,
        SalesProgramId,
    },
    money::Money,
};

/// A price-list entry of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptionPrice {
    /// Financial option number.
    pub key: OptionKey,
    /// Unit price on this plan.
    pub price: Money,
}

/// The floor plan being configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan id.
    pub id: PlanId,
    /// Display name.
    pub name: String,
    /// Base house price.
    pub list_price: Money,
    /// The plan's standard options. Options not listed here are priced as
    /// non-standard selections.
    #[serde(default)]
    pub options: Vec<PlanOptionPrice>,
}

impl Plan {
    /// The plan's price for an option, if the option is standard on this plan.
    #[must_use]
    pub fn option_price(&self, key: &OptionKey) -> Option<Money> {
        self.options.iter().find(|o| &o.key == key).map(|o| o.price)
    }
}

/// Plan prices that apply while a lot is in a particular sales phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesPhase {
    /// Phase id.
    pub id: SalesPhaseId,
    /// Phase-specific base prices, keyed by plan.
    #[serde(default)]
    pub plan_prices: Vec<(PlanId, Money)>,
}

impl SalesPhase {
    /// The phase's base price for a plan.
    #[must_use]
    pub fn plan_price(&self, plan: PlanId) -> Option<Money> {
        self.plan_prices
            .iter()
            .find(|(id, _)| *id == plan)
            .map(|&(_, price)| price)
    }
}

/// Catalog ids that must not repeat on neighbouring homes of one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonotonyRule {
    /// The plan the rule applies to.
    pub edh_plan_id: PlanId,
    /// Elevation choices already built next door.
    #[serde(default)]
    pub elevation_catalog_ids: Vec<ChoiceCatalogId>,
    /// Color-scheme choices already built next door.
    #[serde(default)]
    pub color_scheme_catalog_ids: Vec<ChoiceCatalogId>,
    /// Color-scheme attributes already built next door.
    #[serde(default)]
    pub color_scheme_attribute_community_ids: Vec<AttributeCommunityId>,
}

/// The homesite the home is built on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Lot id.
    pub id: LotId,
    /// Lot premium added to the price.
    #[serde(default)]
    pub premium: Money,
    /// Whether the community prices plans per sales phase.
    #[serde(default)]
    pub phased_pricing_enabled: bool,
    /// The lot's current sales phase.
    #[serde(default)]
    pub sales_phase: Option<SalesPhase>,
    /// Monotony rules derived from the lot's neighbours.
    #[serde(default)]
    pub monotony_rules: Vec<MonotonyRule>,
}

impl Lot {
    /// Monotony rules that apply to `plan`.
    pub fn monotony_rules_for(&self, plan: PlanId) -> impl Iterator<Item = &MonotonyRule> + '_ {
        self.monotony_rules
            .iter()
            .filter(move |rule| rule.edh_plan_id == plan)
    }
}

/// How a sales program affects the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalesProgramType {
    /// A flat discount off the total.
    DiscountFlatAmount,
    /// A contribution towards the buyer's closing costs.
    BuyersClosingCost,
}

/// An incentive offered on the home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesProgram {
    /// Program id.
    pub id: SalesProgramId,
    /// Display name.
    pub name: String,
    /// How the program is applied.
    pub program_type: SalesProgramType,
    /// Program amount, as a positive number.
    pub amount: Money,
}

/// A manual correction to the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    /// Reason shown to the buyer.
    pub label: String,
    /// Signed amount added to the total.
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotony_rules_are_filtered_by_plan() {
        let lot = Lot {
            id: LotId(1),
            premium: Money::ZERO,
            phased_pricing_enabled: false,
            sales_phase: None,
            monotony_rules: vec![
                MonotonyRule {
                    edh_plan_id: PlanId(1),
                    ..MonotonyRule::default()
                },
                MonotonyRule {
                    edh_plan_id: PlanId(2),
                    ..MonotonyRule::default()
                },
            ],
        };

        assert_eq!(lot.monotony_rules_for(PlanId(2)).count(), 1);
        assert_eq!(lot.monotony_rules_for(PlanId(3)).count(), 0);
    }

    #[test]
    fn phase_prices_are_looked_up_by_plan() {
        let phase = SalesPhase {
            id: SalesPhaseId(4),
            plan_prices: vec![(PlanId(1), Money::from_dollars(310_000))],
        };

        assert_eq!(phase.plan_price(PlanId(1)), Some(Money::from_dollars(310_000)));
        assert_eq!(phase.plan_price(PlanId(2)), None);
    }
}
