//! Discovery of indexable files under a directory tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Decides which files are indexed.
///
/// Deny-listed directories are never descended into, dot-files are skipped,
/// and only allow-listed extensions (compared case-insensitively) pass.
#[derive(Debug, Clone)]
pub struct Eligibility {
    skip_dirs: HashSet<String>,
    extensions: HashSet<String>,
}

impl Eligibility {
    pub fn new<D, E>(skip_dirs: D, extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            skip_dirs: skip_dirs.into_iter().map(|d| d.as_ref().to_string()).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(&config.skip_dirs, &config.extensions)
    }

    /// Whether a directory with this name is walked.
    pub fn allows_dir(&self, name: &str) -> bool {
        !self.skip_dirs.contains(name)
    }

    /// Whether a file with this name is indexed, judging by the name alone.
    pub fn allows_file_name(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Whether `path` is indexed, also rejecting any path that runs through a
    /// deny-listed directory. Used for explicit file lists.
    pub fn allows_path(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let through_skipped = path
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .filter_map(|c| c.as_os_str().to_str())
            .any(|c| !self.allows_dir(c));
        !through_skipped && self.allows_file_name(name)
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Walk `root`, calling `visit` for each eligible file in walk order.
///
/// The walk stops early when `visit` returns `false`. Entries below the root
/// that cannot be read are skipped and handed to `on_error` with their path.
///
/// # Errors
///
/// Returns [`RagError::IoError`] if `root` is not a readable directory.
pub fn walk_eligible(
    root: &Path,
    eligibility: &Eligibility,
    visit: impl FnMut(PathBuf) -> bool,
    on_error: impl FnMut(PathBuf, RagError),
) -> Result<()> {
    let meta = std::fs::metadata(root).map_err(|e| RagError::io(root, e))?;
    if !meta.is_dir() {
        return Err(RagError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let entries = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry.file_name().to_str().is_some_and(|name| eligibility.allows_dir(name))
        })
        .map(|entry| {
            entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                (path, std::io::Error::from(e))
            })
        });
    visit_entries(entries, eligibility, visit, on_error);
    Ok(())
}

type WalkEntry = std::result::Result<DirEntry, (PathBuf, std::io::Error)>;

fn visit_entries(
    entries: impl IntoIterator<Item = WalkEntry>,
    eligibility: &Eligibility,
    mut visit: impl FnMut(PathBuf) -> bool,
    mut on_error: impl FnMut(PathBuf, RagError),
) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err((path, source)) => {
                on_error(path.clone(), RagError::io(path, source));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let eligible = entry.file_name().to_str().is_some_and(|n| eligibility.allows_file_name(n));
        if eligible && !visit(entry.into_path()) {
            break;
        }
    }
}

/// Collect every eligible file under `root`, sorted. Unreadable entries are
/// logged and left out.
pub fn discover_files(root: &Path, eligibility: &Eligibility) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_eligible(
        root,
        eligibility,
        |path| {
            files.push(path);
            true
        },
        |path, error| warn!(path = %path.display(), error = %error, "skipping unreadable entry"),
    )?;
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn tree() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        for dir in ["src/nested", "node_modules/pkg", ".git/objects", "venv/lib", "__pycache__"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for (path, body) in [
            ("main.go", "package main"),
            ("README.md", "# demo"),
            ("src/lib.rs", "pub fn f() {}"),
            ("src/nested/app.PY", "print(1)"),
            ("src/image.png", "not text"),
            (".env", "SECRET=1"),
            (".hidden.md", "hidden"),
            ("node_modules/pkg/index.js", "module.exports = 1"),
            (".git/objects/config.json", "{}"),
            ("venv/lib/site.py", "x = 1"),
            ("__pycache__/mod.txt", "cached"),
        ] {
            fs::write(root.join(path), body).unwrap();
        }
        temp
    }

    #[test]
    fn walk_applies_skip_rules() {
        let temp = tree();
        let files = discover_files(temp.path(), &Eligibility::default()).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["README.md", "main.go", "src/lib.rs", "src/nested/app.PY"]);
    }

    #[test]
    fn walk_stops_when_visitor_declines() {
        let temp = tree();
        let mut seen = 0;
        walk_eligible(
            temp.path(),
            &Eligibility::default(),
            |_| {
                seen += 1;
                false
            },
            |path, error| panic!("unexpected walk error at {}: {error}", path.display()),
        )
        .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn unreadable_entries_are_reported_and_skipped() {
        let temp = tree();
        let locked = temp.path().join("src/locked");
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let entries = WalkDir::new(temp.path())
            .sort_by_file_name()
            .into_iter()
            .map(|entry| entry.map_err(|e| (temp.path().to_path_buf(), std::io::Error::from(e))))
            .chain(std::iter::once(Err((locked.clone(), denied))));

        let mut visited = Vec::new();
        let mut errors = Vec::new();
        visit_entries(
            entries,
            &Eligibility::default(),
            |path| {
                visited.push(path);
                true
            },
            |path, error| errors.push((path, error)),
        );

        assert!(visited.iter().any(|p| p.ends_with("main.go")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, locked);
        assert!(matches!(errors[0].1, RagError::IoError { ref path, .. } if *path == locked));
    }

    #[test]
    fn root_named_like_a_skipped_dir_is_still_walked() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("build");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("notes.txt"), "hi").unwrap();
        assert_eq!(discover_files(&root, &Eligibility::default()).unwrap().len(), 1);
    }

    #[test]
    fn missing_root_is_io_error() {
        let err = discover_files(Path::new("/no/such/tree"), &Eligibility::default()).unwrap_err();
        assert!(matches!(err, RagError::IoError { .. }));
    }

    #[test]
    fn explicit_paths_respect_deny_list() {
        let rules = Eligibility::default();
        assert!(rules.allows_path(Path::new("src/server/handler.go")));
        assert!(!rules.allows_path(Path::new("node_modules/react/index.js")));
        assert!(!rules.allows_path(Path::new("src/.secrets.yaml")));
        assert!(!rules.allows_path(Path::new("Makefile")));
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let rules = Eligibility::new(["docs"], [".adoc"]);
        assert!(rules.allows_path(Path::new("guide/intro.adoc")));
        assert!(!rules.allows_path(Path::new("docs/intro.adoc")));
        assert!(!rules.allows_path(Path::new("main.go")));
    }
}
