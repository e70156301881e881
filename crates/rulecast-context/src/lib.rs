//! # rulecast-context
//!
//! Works out what a request is about, from two independent directions:
//!
//! - **Context detection** ([`detector`]): inspects the project tree and
//!   produces a [`ProjectContext`](rulecast_core::ProjectContext) with
//!   languages, frameworks, cloud providers, maturity and confidence. A
//!   language is only reported when its definitive marker file is present
//!   *and* at least one corroborating signal backs it.
//! - **Intent analysis** ([`intent`]): classifies the user's request text
//!   into an [`Intent`](rulecast_core::Intent) with a weighted pattern table.
//!
//! Neither side ever fails: unreadable files lower confidence, unmatched
//! text yields a general intent.

#![deny(unsafe_code)]

pub mod cloud;
pub mod dependencies;
pub mod detector;
pub mod intent;
pub mod languages;
pub mod maturity;
pub mod snapshot;

pub use detector::{ContextDetector, Detection, DetectorConfig, LanguageEvidence, Signal};
pub use intent::{IntentAnalyzer, analyze_intent};
