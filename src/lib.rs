//! Decision-tree configuration and constraint rules for home options.
//!
//! A home is configured by walking a tree of decision points and selecting
//! choices. Rules embedded in the tree disable points and choices based on
//! other selections, and option rules decide which plan option each choice is
//! priced as. The [`engine`] keeps a tree consistent as choices are toggled.

pub mod domain;
pub use domain::{Config, Tree};

/// The rules engine.
pub mod engine;
pub use engine::{EditMode, Session, SessionContext, Toggle, ToggleError};

/// Scenario storage.
pub mod storage;
pub use storage::Scenario;

#[cfg(test)]
mod fixtures;
