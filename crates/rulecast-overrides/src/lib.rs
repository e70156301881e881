//! # rulecast-overrides
//!
//! Combines a user's local rule customizations with central rule bodies.
//!
//! - [`OverrideConfig`]: validated `rules-config.json` (default strategy,
//!   per-path strategies, exclusions).
//! - [`LocalOverrides`]: local bodies mirroring catalog paths.
//! - [`OverrideEngine`]: applies `extend` / `replace` / `prepend` per path
//!   and appends local-only rules.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod local;
pub mod merge;

pub use config::{MergeStrategy, OverrideConfig, SEPARATOR};
pub use errors::{OverrideError, Result};
pub use local::LocalOverrides;
pub use merge::{CentralBody, MergeDecision, MergedRule, OverrideEngine};
