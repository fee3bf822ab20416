//! Price breakdown of the current selection.

use serde::Serialize;
use tracing::instrument;

use crate::domain::{
    context::{Lot, Plan, PriceAdjustment, SalesProgram, SalesProgramType},
    money::Money,
    rules::RuleTable,
    tree::{PointCategory, Tree},
};

/// Everything besides the tree that goes into a price.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceInputs<'a> {
    /// The plan; without one the base house price is zero.
    pub plan: Option<&'a Plan>,
    /// The lot; without one there is no premium and no phase pricing.
    pub lot: Option<&'a Lot>,
    /// Active sales programs.
    pub programs: &'a [SalesProgram],
    /// Manual price adjustments.
    pub adjustments: &'a [PriceAdjustment],
}

/// Totals per price category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// Plan price, or the sales-phase price under phased pricing.
    pub base_house: Money,
    /// Selected elevation options.
    pub elevation: Money,
    /// Selected options on the plan's price list.
    pub selections: Money,
    /// Selected options not on the plan's price list.
    pub non_standard_selections: Money,
    /// Lot premium.
    pub lot_premium: Money,
    /// Flat discounts applied to the total.
    pub sales_program_discount: Money,
    /// Closing-cost contributions. Reported, not deducted.
    pub closing_incentive: Money,
    /// Sum of the manual adjustments.
    pub price_adjustments: Money,
    /// Grand total.
    pub total: Money,
}

/// Folds the effectively selected choices into a [`PriceBreakdown`].
///
/// Each selected choice is priced per mapped option: at the plan's price when
/// the option is on the plan's list, otherwise at the choice's own option
/// price as a non-standard selection. Flat discounts never take the total
/// below the base house price; negative adjustments can, and the total is
/// always the sum of the reported components.
#[instrument(level = "debug", skip_all)]
#[must_use]
pub fn compute_price_breakdown(tree: &Tree, rules: &RuleTable, inputs: PriceInputs<'_>) -> PriceBreakdown {
    let mut breakdown = PriceBreakdown {
        base_house: base_house_price(inputs.plan, inputs.lot),
        lot_premium: inputs.lot.map_or(Money::ZERO, |lot| lot.premium),
        ..PriceBreakdown::default()
    };

    for choice in tree.choices() {
        if !tree.is_effectively_selected(choice.id) {
            continue;
        }
        let Some(point) = tree.point(choice.point()) else {
            continue;
        };
        for key in rules.mapped_options(tree, choice.id) {
            let standard = inputs.plan.and_then(|plan| plan.option_price(&key));
            let unit = standard
                .or_else(|| choice.option(&key).map(|o| o.price))
                .unwrap_or_default();
            let amount = unit * choice.quantity;

            if point.category == PointCategory::Elevation {
                breakdown.elevation += amount;
            } else if standard.is_some() {
                breakdown.selections += amount;
            } else {
                breakdown.non_standard_selections += amount;
            }
        }
    }

    for program in inputs.programs {
        match program.program_type {
            SalesProgramType::DiscountFlatAmount => breakdown.sales_program_discount += program.amount,
            SalesProgramType::BuyersClosingCost => breakdown.closing_incentive += program.amount,
        }
    }
    breakdown.price_adjustments = inputs.adjustments.iter().map(|a| a.amount).sum();

    let subtotal = breakdown.base_house
        + breakdown.elevation
        + breakdown.selections
        + breakdown.non_standard_selections
        + breakdown.lot_premium
        + breakdown.price_adjustments;
    let headroom = (subtotal - breakdown.base_house).max(Money::ZERO);
    breakdown.sales_program_discount = breakdown.sales_program_discount.min(headroom);
    breakdown.total = subtotal - breakdown.sales_program_discount;

    breakdown
}

fn base_house_price(plan: Option<&Plan>, lot: Option<&Lot>) -> Money {
    let Some(plan) = plan else {
        return Money::ZERO;
    };
    lot.filter(|lot| lot.phased_pricing_enabled)
        .and_then(|lot| lot.sales_phase.as_ref())
        .and_then(|phase| phase.plan_price(plan.id))
        .unwrap_or(plan.list_price)
}
