//! # rulecast-selection
//!
//! Narrows the rule catalog to the few documents worth injecting for one
//! request.
//!
//! - [`Catalog`]: the read-only rule inventory, parsed from the catalog
//!   index JSON. Missing or malformed files give an empty catalog.
//! - [`CatalogStore`]: lazily-loaded, resettable holder shared across
//!   requests.
//! - [`RuleSelector`]: maturity filter, relevance scoring, and greedy
//!   all-or-nothing acceptance under a count and token budget.

#![deny(unsafe_code)]

pub mod catalog;
pub mod errors;
pub mod scoring;
pub mod selector;
pub mod store;

pub use catalog::{Catalog, RuleCategory, RuleDescriptor, topics_from_stem};
pub use errors::{CatalogError, SelectionError};
pub use scoring::{INELIGIBLE, ScoredRule, score_rule};
pub use selector::{RuleSelector, SelectionLimits, SelectionResult, filter_by_maturity};
pub use store::CatalogStore;
