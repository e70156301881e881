//! Project maturity classification.
//!
//! Three signals feed the decision: the declared version, the presence of
//! CI configuration, and the presence of deployment or infrastructure
//! configuration. Missing or contradictory signals resolve toward the
//! least mature stage.
//!
//! | version        | CI  | infra | stage          |
//! |----------------|-----|-------|----------------|
//! | any            | no  | any   | MVP            |
//! | `>= 1.0`       | yes | yes   | production     |
//! | `>= 1.0`       | yes | no    | pre-production |
//! | `0.9.x`        | yes | any   | pre-production |
//! | none           | yes | any   | pre-production |
//! | `< 0.9`        | yes | any   | MVP            |

use std::sync::LazyLock;

use regex::Regex;
use rulecast_core::Maturity;
use serde::Serialize;

use crate::snapshot::ProjectSnapshot;

/// CI configuration: (path, is directory).
const CI_MARKERS: &[(&str, bool)] = &[
    (".github/workflows", true),
    (".circleci", true),
    (".gitlab-ci.yml", false),
    ("Jenkinsfile", false),
    ("azure-pipelines.yml", false),
    (".travis.yml", false),
    ("bitbucket-pipelines.yml", false),
    ("buildkite.yml", false),
];

/// Deployment / infrastructure configuration at the root.
const INFRA_MARKERS: &[&str] = &[
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yaml",
    "compose.yml",
    "k8s",
    "kubernetes",
    "helm",
    "charts",
    "Pulumi.yaml",
    "cdk.json",
    "serverless.yml",
    "fly.toml",
    "terraform",
];

/// Manifests that may declare a version, in lookup order.
const VERSION_FILES: &[&str] = &["package.json", "Cargo.toml", "pyproject.toml", "setup.cfg", "composer.json"];

static TOML_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*version\s*=\s*["']?([0-9][^"'\s]*)"#).unwrap());

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v?(\d+)\.(\d+)").unwrap());

/// Raw maturity signals, exposed for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaturitySignals {
    /// Declared `(major, minor)` version, if any manifest has one.
    pub version: Option<(u64, u64)>,
    /// CI configuration found.
    pub has_ci: bool,
    /// Deployment or infrastructure configuration found.
    pub has_infrastructure: bool,
}

impl MaturitySignals {
    /// Collect signals from a snapshot.
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Self {
        let has_ci = CI_MARKERS.iter().any(|(path, is_dir)| {
            if *is_dir {
                snapshot.has_files_under(path)
            } else {
                snapshot.has_root_entry(path)
            }
        });
        let has_infrastructure =
            INFRA_MARKERS.iter().any(|m| snapshot.has_root_entry(m)) || snapshot.has_terraform();
        let version = VERSION_FILES
            .iter()
            .filter_map(|file| snapshot.content(file).and_then(|c| declared_version(file, c)))
            .find_map(|v| parse_version(&v));

        Self {
            version,
            has_ci,
            has_infrastructure,
        }
    }

    /// Classify the signals into a stage.
    #[must_use]
    pub fn classify(&self) -> Maturity {
        if !self.has_ci {
            return Maturity::Mvp;
        }
        match self.version {
            Some((major, _)) if major >= 1 => {
                if self.has_infrastructure {
                    Maturity::Production
                } else {
                    Maturity::PreProduction
                }
            }
            Some((0, minor)) if minor >= 9 => Maturity::PreProduction,
            Some(_) => Maturity::Mvp,
            None => Maturity::PreProduction,
        }
    }
}

fn declared_version(file: &str, content: &str) -> Option<String> {
    if file.ends_with(".json") {
        let value: serde_json::Value = serde_json::from_str(content).ok()?;
        return value.get("version")?.as_str().map(str::to_string);
    }
    TOML_VERSION_RE.captures(content).map(|c| c[1].to_string())
}

/// Parse `major.minor` from a version string (`v` prefix allowed).
#[must_use]
pub fn parse_version(version: &str) -> Option<(u64, u64)> {
    let caps = SEMVER_RE.captures(version.trim())?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
