//! Language table.
//!
//! A language is reported only when one of its marker files exists at the
//! project root *and* at least one corroborating signal backs it up: source
//! files with its extensions, a lockfile or second manifest, a framework of
//! its ecosystem, or a mention in the request text.

use globset::Glob;
use tracing::debug;

use crate::dependencies::Ecosystem;

/// Static description of a detectable language.
#[derive(Clone, Copy, Debug)]
pub struct LanguageSpec {
    /// Catalog name of the language.
    pub name: &'static str,
    /// Definitive marker files at the project root (globs allowed).
    pub markers: &'static [&'static str],
    /// Source file extensions (lowercase, no dot).
    pub extensions: &'static [&'static str],
    /// Lockfiles and secondary manifests that corroborate the marker.
    pub companions: &'static [&'static str],
    /// Request keywords, matched as case-insensitive substrings.
    pub keywords: &'static [&'static str],
    /// Ecosystem whose frameworks corroborate this language.
    pub ecosystem: Option<Ecosystem>,
    /// More general language this one refines (TypeScript refines JavaScript).
    pub refines: Option<&'static str>,
}

/// Detectable languages, in tie-break order.
pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        name: "python",
        markers: &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"],
        extensions: &["py"],
        companions: &["poetry.lock", "Pipfile.lock", "uv.lock", "setup.cfg", "requirements-dev.txt"],
        keywords: &["python", "pytest", "django", "fastapi", "flask", "pip install"],
        ecosystem: Some(Ecosystem::Python),
        refines: None,
    },
    LanguageSpec {
        name: "typescript",
        markers: &["tsconfig.json"],
        extensions: &["ts", "tsx"],
        companions: &["package.json", "tsconfig.base.json"],
        keywords: &["typescript"],
        ecosystem: Some(Ecosystem::Node),
        refines: Some("javascript"),
    },
    LanguageSpec {
        name: "javascript",
        markers: &["package.json"],
        extensions: &["js", "jsx", "mjs", "cjs"],
        companions: &["package-lock.json", "yarn.lock", "pnpm-lock.yaml", "bun.lockb"],
        keywords: &["javascript", "node.js", "nodejs", "npm "],
        ecosystem: Some(Ecosystem::Node),
        refines: None,
    },
    LanguageSpec {
        name: "go",
        markers: &["go.mod"],
        extensions: &["go"],
        companions: &["go.sum", "go.work"],
        keywords: &["golang", "goroutine"],
        ecosystem: Some(Ecosystem::Go),
        refines: None,
    },
    LanguageSpec {
        name: "rust",
        markers: &["Cargo.toml"],
        extensions: &["rs"],
        companions: &["Cargo.lock", "rust-toolchain.toml", "rust-toolchain"],
        keywords: &["rust", "cargo"],
        ecosystem: Some(Ecosystem::Rust),
        refines: None,
    },
    LanguageSpec {
        name: "kotlin",
        markers: &["build.gradle.kts", "settings.gradle.kts"],
        extensions: &["kt"],
        companions: &[],
        keywords: &["kotlin"],
        ecosystem: None,
        refines: Some("java"),
    },
    LanguageSpec {
        name: "java",
        markers: &["pom.xml", "build.gradle", "build.gradle.kts"],
        extensions: &["java"],
        companions: &["mvnw", "gradlew", "settings.gradle"],
        keywords: &["java ", "spring boot", "maven", "gradle"],
        ecosystem: Some(Ecosystem::Jvm),
        refines: None,
    },
    LanguageSpec {
        name: "ruby",
        markers: &["Gemfile"],
        extensions: &["rb"],
        companions: &["Gemfile.lock", ".ruby-version"],
        keywords: &["ruby", "rails"],
        ecosystem: Some(Ecosystem::Ruby),
        refines: None,
    },
    LanguageSpec {
        name: "php",
        markers: &["composer.json"],
        extensions: &["php"],
        companions: &["composer.lock"],
        keywords: &["php", "laravel"],
        ecosystem: Some(Ecosystem::Php),
        refines: None,
    },
    LanguageSpec {
        name: "csharp",
        markers: &["*.csproj", "*.sln"],
        extensions: &["cs"],
        companions: &["global.json", "nuget.config", "Directory.Build.props"],
        keywords: &["c#", "csharp", ".net", "dotnet"],
        ecosystem: None,
        refines: None,
    },
];

/// Whether a root entry name matches a marker (exact name or glob).
#[must_use]
pub fn marker_matches(marker: &str, entry: &str) -> bool {
    if !marker.contains(['*', '?', '[']) {
        return marker == entry;
    }
    match Glob::new(marker) {
        Ok(glob) => glob.compile_matcher().is_match(entry),
        Err(e) => {
            debug!(marker, error = %e, "invalid marker glob");
            false
        }
    }
}

/// Whether the request text mentions the language.
#[must_use]
pub fn mentioned_in(spec: &LanguageSpec, prompt_lower: &str) -> bool {
    spec.keywords.iter().any(|k| prompt_lower.contains(k))
}

/// Look up a language by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_glob_markers() {
        assert!(marker_matches("Cargo.toml", "Cargo.toml"));
        assert!(!marker_matches("Cargo.toml", "cargo.toml"));
        assert!(marker_matches("*.csproj", "Api.csproj"));
        assert!(!marker_matches("*.csproj", "Api.sln"));
    }

    #[test]
    fn keywords_are_substrings() {
        let rust = find("rust").unwrap();
        // substring semantics: "trust" contains "rust"
        assert!(mentioned_in(rust, "do you trust this approach"));
        assert!(!mentioned_in(rust, "hello world"));
    }

    #[test]
    fn go_keyword_avoids_common_word() {
        let go = find("go").unwrap();
        assert!(!mentioned_in(go, "let's go ahead and fix it"));
        assert!(mentioned_in(go, "a golang service"));
    }

    #[test]
    fn variants_refine_existing_languages() {
        for spec in LANGUAGES {
            if let Some(base) = spec.refines {
                assert!(find(base).is_some(), "{} refines unknown {base}", spec.name);
            }
        }
    }
}
