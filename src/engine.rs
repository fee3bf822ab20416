//! The rules engine.
//!
//! Everything here works on a [`Tree`](crate::domain::Tree) and its compiled
//! [`RuleTable`](crate::domain::RuleTable). The leaf modules are pure
//! functions over a snapshot; [`Session`] ties them together into the commit
//! protocol used by the command line.

/// Fixed-point evaluation of `disabled_by` rules.
pub mod enablement;
pub use enablement::{EnablementReport, evaluate_enablement, evaluate_with_limit};

/// Side effects of toggling a choice.
pub mod cascade;
pub use cascade::{DeselectionInfo, Toggle, choice_to_deselect, dependent_choices};

/// Monotony checks and overrides.
pub mod monotony;
pub use monotony::{MonotonyConflict, MonotonyState, OverrideLedger, check_monotony};

/// Price breakdowns.
pub mod price;
pub use price::{PriceBreakdown, PriceInputs, compute_price_breakdown};

/// Confirmation and override prompts.
pub mod prompt;
pub use prompt::{ImpactWarning, NonInteractive, OverrideDecision, OverrideRequest, Prompt};

mod session;
pub use session::{
    EditMode, Session, SessionContext, ToggleError, ToggleOutcome, TogglePlan,
};
