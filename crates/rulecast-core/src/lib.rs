//! # rulecast-core
//!
//! Foundation types shared by every rulecast crate.
//!
//! - [`types`]: project context, user intent, maturity and confidence levels
//! - [`logging`]: `tracing` subscriber setup (stderr only, stdout is reserved
//!   for the hook response)

#![deny(unsafe_code)]

pub mod logging;
pub mod types;

pub use types::{
    ActionType, Confidence, Intent, IntentCategory, Maturity, ProjectContext, Urgency,
};
