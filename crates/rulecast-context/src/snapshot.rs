//! One-pass capture of the project tree.
//!
//! Detection never touches the filesystem after [`ProjectSnapshot::capture`]:
//! every table (languages, frameworks, cloud, maturity) reads from the same
//! immutable snapshot. Walk and read failures are counted, not raised.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Directories excluded from the walk by default.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "out",
    "target",
    "vendor",
    ".venv",
    "venv",
    ".next",
    ".nuxt",
    "coverage",
    "__pycache__",
];

/// Default walk depth below the project root.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Default cap on walked entries, so huge monorepos stay fast.
pub const DEFAULT_MAX_ENTRIES: usize = 5000;

/// Root-level files whose contents are read into the snapshot.
const CONTENT_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "requirements-dev.txt",
    "pyproject.toml",
    "Pipfile",
    "setup.py",
    "setup.cfg",
    "go.mod",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "Gemfile",
    "composer.json",
];

/// Terraform files read per snapshot.
const MAX_TERRAFORM_FILES: usize = 32;

/// Largest file read into the snapshot.
const MAX_CONTENT_BYTES: u64 = 512 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Walk limits for [`ProjectSnapshot::capture`].
#[derive(Clone, Debug)]
pub struct WalkLimits {
    /// Maximum depth below the root.
    pub max_depth: usize,
    /// Maximum number of entries visited.
    pub max_entries: usize,
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_entries: DEFAULT_MAX_ENTRIES,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

/// Immutable view of a project tree.
#[derive(Clone, Debug, Default)]
pub struct ProjectSnapshot {
    root: PathBuf,
    root_entries: BTreeSet<String>,
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
    extensions: BTreeMap<String, usize>,
    contents: BTreeMap<String, String>,
    terraform: Vec<String>,
    read_errors: usize,
    readable: bool,
}

impl ProjectSnapshot {
    /// Walk `root` and read the manifest files detection needs.
    pub fn capture(root: &Path, limits: &WalkLimits) -> Self {
        let mut snapshot = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };

        match fs::read_dir(root) {
            Ok(entries) => {
                snapshot.readable = true;
                for entry in entries {
                    match entry {
                        Ok(entry) => {
                            let _ = snapshot
                                .root_entries
                                .insert(entry.file_name().to_string_lossy().into_owned());
                        }
                        Err(_) => snapshot.read_errors += 1,
                    }
                }
            }
            Err(e) => {
                debug!(root = %root.display(), error = %e, "project root unreadable");
                snapshot.read_errors += 1;
                return snapshot;
            }
        }

        snapshot.walk(limits);
        snapshot.read_contents();
        snapshot
    }

    fn walk(&mut self, limits: &WalkLimits) {
        let walker = WalkDir::new(&self.root)
            .max_depth(limits.max_depth)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !limits
                        .exclude_dirs
                        .iter()
                        .any(|d| entry.file_name().to_string_lossy() == d.as_str())
            });

        for (visited, entry) in walker.enumerate() {
            if visited >= limits.max_entries {
                debug!(limit = limits.max_entries, "walk entry limit reached");
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    self.read_errors += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");

            if entry.file_type().is_dir() {
                let _ = self.dirs.insert(relative);
                continue;
            }

            if let Some(ext) = entry.path().extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if ext == "tf" && self.terraform.len() < MAX_TERRAFORM_FILES {
                    self.terraform.push(relative.clone());
                }
                *self.extensions.entry(ext).or_insert(0) += 1;
            }
            let _ = self.files.insert(relative);
        }
    }

    fn read_contents(&mut self) {
        let mut wanted: Vec<String> = CONTENT_FILES
            .iter()
            .filter(|name| self.root_entries.contains(**name))
            .map(|name| (*name).to_string())
            .collect();
        wanted.extend(self.terraform.iter().cloned());

        for relative in wanted {
            let path = self.root.join(&relative);
            let too_large = fs::metadata(&path).is_ok_and(|m| m.len() > MAX_CONTENT_BYTES);
            if too_large {
                debug!(file = %relative, "skipping oversized file");
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let _ = self.contents.insert(relative, content);
                }
                Err(e) => {
                    debug!(file = %relative, error = %e, "failed to read project file");
                    self.read_errors += 1;
                }
            }
        }
    }

    /// Project root this snapshot was taken from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the root directory itself could be listed.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Number of entries or files that could not be read.
    #[must_use]
    pub fn read_errors(&self) -> usize {
        self.read_errors
    }

    /// Names of files and directories directly under the root.
    pub fn root_entries(&self) -> impl Iterator<Item = &str> {
        self.root_entries.iter().map(String::as_str)
    }

    /// Whether `name` exists directly under the root.
    #[must_use]
    pub fn has_root_entry(&self, name: &str) -> bool {
        self.root_entries.contains(name)
    }

    /// Whether a directory exists at `relative` (forward-slash separated).
    #[must_use]
    pub fn has_dir(&self, relative: &str) -> bool {
        self.dirs.contains(relative)
    }

    /// Whether any walked file lives under the `relative` directory.
    #[must_use]
    pub fn has_files_under(&self, relative: &str) -> bool {
        let prefix = format!("{}/", relative.trim_end_matches('/'));
        self.files.iter().any(|f| f.starts_with(&prefix))
    }

    /// Number of walked files with extension `ext` (lowercase, no dot).
    #[must_use]
    pub fn extension_count(&self, ext: &str) -> usize {
        self.extensions.get(ext).copied().unwrap_or(0)
    }

    /// Contents of a captured file, keyed by its relative path.
    #[must_use]
    pub fn content(&self, relative: &str) -> Option<&str> {
        self.contents.get(relative).map(String::as_str)
    }

    /// Contents of every captured Terraform file.
    pub fn terraform_sources(&self) -> impl Iterator<Item = &str> {
        self.terraform.iter().filter_map(|path| self.content(path))
    }

    /// Whether any Terraform file was found.
    #[must_use]
    pub fn has_terraform(&self) -> bool {
        !self.terraform.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
