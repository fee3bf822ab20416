//! Scenario files on disk.

/// Versioned scenario documents.
pub mod scenario;
pub use scenario::{Format, LoadError, OverrideRecord, SaveError, Scenario};
