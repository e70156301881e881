//! # rulecast-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RulecastSettings::default()`]
//! 2. **User file**: `~/.rulecast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `RULECAST_*` and `GITHUB_TOKEN` overrides
//!
//! Settings are passed explicitly to the pipeline; there is no global
//! instance, so tests can build whatever configuration they need.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, expand_home, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;
