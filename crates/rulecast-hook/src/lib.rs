//! # rulecast-hook
//!
//! Prompt-submit hook that injects the engineering rules relevant to the
//! current project and request.
//!
//! - [`RuleHook`]: runs detection, selection, fetching and merging under a
//!   deadline; never fails
//! - [`format`]: Markdown rendering of the injected block
//! - [`types`]: request/response wire types and [`HookOutcome`]
//!
//! The `rulecast-hook` binary reads one [`HookRequest`] from stdin and
//! always prints a [`HookResponse`] with `"continue": true`.

#![deny(unsafe_code)]

pub mod errors;
pub mod format;
pub mod orchestrator;
pub mod types;

pub use errors::{HookError, Result};
pub use format::format_rules;
pub use orchestrator::RuleHook;
pub use types::{AppliedRule, HookMetadata, HookOutcome, HookRequest, HookResponse, StageTimings};
