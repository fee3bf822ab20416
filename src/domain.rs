//! Domain models for the decision tree.
//!
//! This module contains the tree snapshot, its rules, the sub-selections a
//! choice can carry, and the plan/lot context used for monotony and pricing.

/// Strongly typed identifiers.
pub mod ids;
pub use ids::{ChoiceCatalogId, ChoiceId, NodeRef, OptionKey, PointCatalogId, PointId};

/// Amounts of money.
pub mod money;
pub use money::Money;

/// Disablement and option-mapping rules.
pub mod rules;
pub use rules::{
    InvalidRuleType, OptionRule, OptionRuleChoice, Rule, RuleGroup, RuleTable, RuleType,
};

/// Attribute and location sub-selections.
pub mod selection;
pub use selection::{Selection, SelectionError};

/// Plan, lot and sales-program context.
pub mod context;
pub use context::{Lot, MonotonyRule, Plan, PriceAdjustment, SalesProgram, SalesProgramType};

/// The decision tree snapshot.
pub mod tree;
pub use tree::{
    Choice, DecisionPoint, OverrideNote, PickType, PlanOption, PointCategory, Tree, TreeBuilder,
    TreeError,
};

mod config;
pub use config::Config;
