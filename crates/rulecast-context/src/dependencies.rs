//! Dependency declarations and framework detection.
//!
//! Each manifest belongs to one [`Ecosystem`]. Framework names are only
//! matched against dependencies declared in their own ecosystem, so a
//! `react` token in a Python requirements file never implies React.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::snapshot::ProjectSnapshot;

/// Package ecosystem a manifest belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ecosystem {
    /// pip / poetry / pipenv.
    Python,
    /// npm / yarn / pnpm.
    Node,
    /// Go modules.
    Go,
    /// Cargo.
    Rust,
    /// Maven / Gradle.
    Jvm,
    /// Bundler.
    Ruby,
    /// Composer.
    Php,
}

/// How a manifest's dependencies are extracted.
#[derive(Clone, Copy, Debug)]
enum ManifestFormat {
    /// JSON object; dependency names are keys of the listed sections.
    Json(&'static [&'static str]),
    /// Free text; dependency names are extracted as tokens.
    Text,
}

/// Known manifests: (file name, ecosystem, format).
const MANIFESTS: &[(&str, Ecosystem, ManifestFormat)] = &[
    (
        "package.json",
        Ecosystem::Node,
        ManifestFormat::Json(&["dependencies", "devDependencies", "peerDependencies"]),
    ),
    ("composer.json", Ecosystem::Php, ManifestFormat::Json(&["require", "require-dev"])),
    ("requirements.txt", Ecosystem::Python, ManifestFormat::Text),
    ("requirements-dev.txt", Ecosystem::Python, ManifestFormat::Text),
    ("pyproject.toml", Ecosystem::Python, ManifestFormat::Text),
    ("Pipfile", Ecosystem::Python, ManifestFormat::Text),
    ("setup.py", Ecosystem::Python, ManifestFormat::Text),
    ("setup.cfg", Ecosystem::Python, ManifestFormat::Text),
    ("go.mod", Ecosystem::Go, ManifestFormat::Text),
    ("Cargo.toml", Ecosystem::Rust, ManifestFormat::Text),
    ("pom.xml", Ecosystem::Jvm, ManifestFormat::Text),
    ("build.gradle", Ecosystem::Jvm, ManifestFormat::Text),
    ("build.gradle.kts", Ecosystem::Jvm, ManifestFormat::Text),
    ("Gemfile", Ecosystem::Ruby, ManifestFormat::Text),
];

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[@A-Za-z0-9_./-]+").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Dependency scan
// ─────────────────────────────────────────────────────────────────────────────

/// Lowercased dependency names per ecosystem.
#[derive(Clone, Debug, Default)]
pub struct DependencyScan {
    by_ecosystem: BTreeMap<Ecosystem, BTreeSet<String>>,
}

impl DependencyScan {
    /// Extract dependencies from every manifest present in the snapshot.
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Self {
        let mut scan = Self::default();
        for (file, ecosystem, format) in MANIFESTS {
            let Some(content) = snapshot.content(file) else {
                continue;
            };
            let names = match format {
                ManifestFormat::Json(sections) => json_dependency_names(file, content, sections),
                ManifestFormat::Text => text_tokens(content),
            };
            scan.by_ecosystem.entry(*ecosystem).or_default().extend(names);
        }
        scan
    }

    /// Whether any manifest of `ecosystem` was present.
    #[must_use]
    pub fn has_ecosystem(&self, ecosystem: Ecosystem) -> bool {
        self.by_ecosystem.contains_key(&ecosystem)
    }

    /// Whether `pattern` matches a dependency in `ecosystem`.
    ///
    /// A trailing `*` makes the pattern a prefix match
    /// (`@aws-sdk/*`, `spring-boot-starter*`).
    #[must_use]
    pub fn declares(&self, ecosystem: Ecosystem, pattern: &str) -> bool {
        let Some(names) = self.by_ecosystem.get(&ecosystem) else {
            return false;
        };
        match pattern.strip_suffix('*') {
            Some(prefix) => names.iter().any(|n| n.starts_with(prefix)),
            None => names.contains(pattern),
        }
    }

    /// Whether `pattern` matches a dependency in any ecosystem.
    #[must_use]
    pub fn declares_anywhere(&self, pattern: &str) -> bool {
        self.by_ecosystem.keys().any(|eco| self.declares(*eco, pattern))
    }
}

fn json_dependency_names(file: &str, content: &str, sections: &[&str]) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            debug!(file, error = %e, "manifest is not valid JSON");
            return Vec::new();
        }
    };
    sections
        .iter()
        .filter_map(|section| value.get(section).and_then(serde_json::Value::as_object))
        .flat_map(|deps| deps.keys().map(|k| k.to_lowercase()))
        .collect()
}

fn text_tokens(content: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(content)
        .map(|m| m.as_str().trim_matches(|c| c == '.' || c == '/').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Frameworks
// ─────────────────────────────────────────────────────────────────────────────

/// A framework recognized from dependency declarations.
#[derive(Clone, Copy, Debug)]
pub struct FrameworkSpec {
    /// Catalog name of the framework.
    pub name: &'static str,
    /// Ecosystem whose manifests declare it.
    pub ecosystem: Ecosystem,
    /// Package names (trailing `*` = prefix).
    pub packages: &'static [&'static str],
}

/// Recognized frameworks.
pub const FRAMEWORKS: &[FrameworkSpec] = &[
    FrameworkSpec { name: "fastapi", ecosystem: Ecosystem::Python, packages: &["fastapi"] },
    FrameworkSpec { name: "django", ecosystem: Ecosystem::Python, packages: &["django"] },
    FrameworkSpec { name: "flask", ecosystem: Ecosystem::Python, packages: &["flask"] },
    FrameworkSpec { name: "react", ecosystem: Ecosystem::Node, packages: &["react"] },
    FrameworkSpec { name: "nextjs", ecosystem: Ecosystem::Node, packages: &["next"] },
    FrameworkSpec { name: "vue", ecosystem: Ecosystem::Node, packages: &["vue"] },
    FrameworkSpec { name: "angular", ecosystem: Ecosystem::Node, packages: &["@angular/core"] },
    FrameworkSpec { name: "express", ecosystem: Ecosystem::Node, packages: &["express"] },
    FrameworkSpec { name: "nestjs", ecosystem: Ecosystem::Node, packages: &["@nestjs/core"] },
    FrameworkSpec {
        name: "springboot",
        ecosystem: Ecosystem::Jvm,
        packages: &["spring-boot-starter*", "org.springframework.boot"],
    },
    FrameworkSpec {
        name: "gin",
        ecosystem: Ecosystem::Go,
        packages: &["github.com/gin-gonic/gin"],
    },
    FrameworkSpec {
        name: "echo",
        ecosystem: Ecosystem::Go,
        packages: &["github.com/labstack/echo*"],
    },
    FrameworkSpec { name: "axum", ecosystem: Ecosystem::Rust, packages: &["axum"] },
    FrameworkSpec { name: "actix", ecosystem: Ecosystem::Rust, packages: &["actix-web"] },
    FrameworkSpec { name: "rails", ecosystem: Ecosystem::Ruby, packages: &["rails"] },
    FrameworkSpec { name: "laravel", ecosystem: Ecosystem::Php, packages: &["laravel/framework"] },
];

/// Frameworks declared in the scan, in table order.
#[must_use]
pub fn detect_frameworks(scan: &DependencyScan) -> Vec<&'static FrameworkSpec> {
    FRAMEWORKS
        .iter()
        .filter(|spec| spec.packages.iter().any(|p| scan.declares(spec.ecosystem, p)))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
