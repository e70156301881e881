//! Project context detection.
//!
//! [`ContextDetector`] takes one [`ProjectSnapshot`] of the project tree and
//! evaluates the language, framework, cloud and maturity tables against it.
//! Detection never fails: an unreadable root yields an empty context with
//! low confidence, and individual read errors lower confidence by one step.
//!
//! Confidence is graded per dimension (languages, frameworks, cloud
//! providers) from each detected item's signal count, and the context
//! reports the weakest dimension that found anything.

use std::path::Path;

use rulecast_core::{Confidence, ProjectContext};
use serde::Serialize;
use tracing::debug;

use crate::cloud::{CloudEvidence, detect_cloud_evidence};
use crate::dependencies::{DependencyScan, FrameworkSpec, detect_frameworks};
use crate::languages::{LANGUAGES, LanguageSpec, marker_matches, mentioned_in};
use crate::maturity::MaturitySignals;
use crate::snapshot::{ProjectSnapshot, WalkLimits};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Detector configuration.
#[derive(Clone, Debug, Default)]
pub struct DetectorConfig {
    /// Walk limits for the project snapshot.
    pub walk: WalkLimits,
}

/// A signal corroborating a language marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Signal {
    /// Source files with the language's extensions.
    SourceFiles {
        /// Number of files found.
        count: usize,
    },
    /// A lockfile or second manifest.
    Companion {
        /// File name.
        file: String,
    },
    /// A framework of the language's ecosystem.
    Framework {
        /// Framework name.
        name: String,
    },
    /// The request text mentions the language.
    Keyword,
}

/// Why a language was reported.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEvidence {
    /// Language name.
    pub language: String,
    /// Marker file that was found.
    pub marker: String,
    /// Corroborating signals (never empty).
    pub corroborations: Vec<Signal>,
}

impl LanguageEvidence {
    fn source_files(&self) -> usize {
        self.corroborations
            .iter()
            .map(|s| match s {
                Signal::SourceFiles { count } => *count,
                _ => 0,
            })
            .sum()
    }
}

/// Full detection result with the evidence behind it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// The detected context.
    pub context: ProjectContext,
    /// Per-language evidence, in the same order as `context.languages`.
    pub languages: Vec<LanguageEvidence>,
    /// Raw maturity signals.
    pub maturity: MaturitySignals,
    /// Entries or files that could not be read.
    pub read_errors: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Detector
// ─────────────────────────────────────────────────────────────────────────────

/// Detects the technical context of a project directory.
#[derive(Clone, Debug, Default)]
pub struct ContextDetector {
    config: DetectorConfig,
}

impl ContextDetector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Detect the context of `root`. `prompt` may corroborate languages.
    #[must_use]
    pub fn detect(&self, root: &Path, prompt: Option<&str>) -> ProjectContext {
        self.detect_with_evidence(root, prompt).context
    }

    /// Detect the context of `root` and keep the evidence.
    #[must_use]
    pub fn detect_with_evidence(&self, root: &Path, prompt: Option<&str>) -> Detection {
        let snapshot = ProjectSnapshot::capture(root, &self.config.walk);
        detect_from_snapshot(&snapshot, prompt)
    }
}

/// Run every detection table against an existing snapshot.
#[must_use]
pub fn detect_from_snapshot(snapshot: &ProjectSnapshot, prompt: Option<&str>) -> Detection {
    let prompt_lower = prompt.map(str::to_lowercase).unwrap_or_default();
    let scan = DependencyScan::from_snapshot(snapshot);
    let frameworks = detect_frameworks(&scan);

    let mut evidence: Vec<LanguageEvidence> = LANGUAGES
        .iter()
        .filter_map(|spec| evaluate_language(spec, snapshot, &frameworks, &prompt_lower))
        .collect();
    order_languages(&mut evidence);

    let cloud = detect_cloud_evidence(snapshot, &scan);
    let maturity = MaturitySignals::from_snapshot(snapshot);
    let read_errors = snapshot.read_errors();
    let mut confidence = confidence_for(&evidence, &frameworks, &cloud);
    if read_errors > 0 {
        confidence = confidence.degrade();
    }

    let context = ProjectContext {
        languages: evidence.iter().map(|e| e.language.clone()).collect(),
        frameworks: frameworks.iter().map(|f| f.name.to_string()).collect(),
        cloud_providers: cloud.iter().map(|c| c.name.to_string()).collect(),
        maturity: maturity.classify(),
        confidence,
    };

    debug!(
        root = %snapshot.root().display(),
        languages = ?context.languages,
        frameworks = ?context.frameworks,
        cloud = ?context.cloud_providers,
        maturity = %context.maturity,
        read_errors,
        "context detected"
    );

    Detection {
        context,
        languages: evidence,
        maturity,
        read_errors,
    }
}

fn evaluate_language(
    spec: &LanguageSpec,
    snapshot: &ProjectSnapshot,
    frameworks: &[&FrameworkSpec],
    prompt_lower: &str,
) -> Option<LanguageEvidence> {
    let present: Vec<&str> = spec
        .markers
        .iter()
        .flat_map(|m| snapshot.root_entries().filter(move |e| marker_matches(m, e)))
        .collect();
    let (marker, others) = present.split_first()?;

    let mut corroborations = Vec::new();
    let count: usize = spec.extensions.iter().map(|ext| snapshot.extension_count(ext)).sum();
    if count > 0 {
        corroborations.push(Signal::SourceFiles { count });
    }
    for file in others {
        corroborations.push(Signal::Companion {
            file: (*file).to_string(),
        });
    }
    for file in spec.companions {
        if snapshot.has_root_entry(file) {
            corroborations.push(Signal::Companion {
                file: (*file).to_string(),
            });
        }
    }
    if let Some(ecosystem) = spec.ecosystem {
        corroborations.extend(
            frameworks
                .iter()
                .filter(|f| f.ecosystem == ecosystem)
                .map(|f| Signal::Framework {
                    name: f.name.to_string(),
                }),
        );
    }
    if !prompt_lower.is_empty() && mentioned_in(spec, prompt_lower) {
        corroborations.push(Signal::Keyword);
    }

    if corroborations.is_empty() {
        debug!(language = spec.name, marker, "marker without corroboration ignored");
        return None;
    }
    Some(LanguageEvidence {
        language: spec.name.to_string(),
        marker: (*marker).to_string(),
        corroborations,
    })
}

/// Order by source file count (table order breaks ties), then move each
/// refining variant ahead of the language it refines.
fn order_languages(evidence: &mut Vec<LanguageEvidence>) {
    evidence.sort_by_key(|e| std::cmp::Reverse(e.source_files()));

    for spec in LANGUAGES {
        let Some(base) = spec.refines else {
            continue;
        };
        let variant_at = evidence.iter().position(|e| e.language == spec.name);
        let base_at = evidence.iter().position(|e| e.language == base);
        if let (Some(v), Some(b)) = (variant_at, base_at) {
            if b < v {
                let variant = evidence.remove(v);
                evidence.insert(b, variant);
            }
        }
    }
}

/// Grade one dimension from the signal count of each detected item,
/// counted beyond the item's required marker or declaration. `None` when
/// the dimension detected nothing.
fn grade(signals: impl IntoIterator<Item = usize>) -> Option<Confidence> {
    let (mut total, mut strong) = (0, 0);
    for count in signals {
        total += 1;
        if count >= 2 {
            strong += 1;
        }
    }
    match (total, strong) {
        (0, _) => None,
        (t, s) if s == t => Some(Confidence::High),
        (_, 0) => Some(Confidence::Low),
        _ => Some(Confidence::Medium),
    }
}

/// Signals behind a framework: its declaration, plus source files of a
/// detected language from the same ecosystem. A declaration alone is the
/// minimum.
fn framework_signals(framework: &FrameworkSpec, languages: &[LanguageEvidence]) -> usize {
    let has_sources = languages.iter().any(|e| {
        e.source_files() > 0
            && LANGUAGES
                .iter()
                .any(|spec| spec.name == e.language && spec.ecosystem == Some(framework.ecosystem))
    });
    1 + usize::from(has_sources)
}

fn confidence_for(
    languages: &[LanguageEvidence],
    frameworks: &[&FrameworkSpec],
    cloud: &[CloudEvidence],
) -> Confidence {
    let Some(language) = grade(languages.iter().map(|e| e.corroborations.len())) else {
        return Confidence::Low;
    };
    let framework = grade(frameworks.iter().map(|f| framework_signals(f, languages)));
    let cloud = grade(cloud.iter().map(|c| c.signals));
    [framework, cloud].into_iter().flatten().fold(language, Confidence::min)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
