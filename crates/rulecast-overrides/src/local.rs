//! Local override bodies.
//!
//! Local rule bodies live in a directory inside the project that mirrors
//! catalog paths: `.claude/rules-local/languages/python/testing.md`
//! overrides `languages/python/testing.md`. Markdown files whose path is
//! not in the catalog are local-only rules. A `README.md` at the top of the
//! directory documents it and is never loaded as a rule.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Maximum directory depth scanned for local bodies.
const MAX_DEPTH: usize = 8;

fn is_directory_readme(relative: &str) -> bool {
    !relative.contains('/') && relative.eq_ignore_ascii_case("readme.md")
}

/// Local rule bodies keyed by forward-slash relative path.
#[derive(Clone, Debug, Default)]
pub struct LocalOverrides {
    bodies: BTreeMap<String, String>,
}

impl LocalOverrides {
    /// Build from explicit `(path, body)` pairs.
    pub fn from_pairs<I, P, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<String>,
    {
        Self {
            bodies: pairs.into_iter().map(|(p, b)| (p.into(), b.into())).collect(),
        }
    }

    /// Scan `dir` for `.md` files. A missing directory yields no overrides;
    /// unreadable files are skipped with a warning.
    pub fn scan(dir: &Path) -> Self {
        let mut bodies = BTreeMap::new();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no local override directory");
            return Self { bodies };
        }

        for entry in WalkDir::new(dir).max_depth(MAX_DEPTH).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable override entry");
                    continue;
                }
            };
            let is_markdown = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
            if !entry.file_type().is_file() || !is_markdown {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if is_directory_readme(&relative) {
                debug!(file = %relative, "override directory readme skipped");
                continue;
            }
            match fs::read_to_string(entry.path()) {
                Ok(body) => {
                    let _ = bodies.insert(relative, body);
                }
                Err(e) => warn!(file = %relative, error = %e, "skipping unreadable override file"),
            }
        }
        debug!(dir = %dir.display(), count = bodies.len(), "local overrides loaded");
        Self { bodies }
    }

    /// Local body for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.bodies.get(path.trim_start_matches('/')).map(String::as_str)
    }

    /// All local paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.bodies.keys().map(String::as_str)
    }

    /// Number of local bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether there are no local bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
