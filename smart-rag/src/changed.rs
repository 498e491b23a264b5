//! Changed-file detection for incremental re-indexing.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::{RagError, Result};

/// Base reference compared against `HEAD` when none is given.
pub const DEFAULT_BASE_REF: &str = "origin/main";

/// Files changed between `base_ref` and `HEAD` in the repository at `repo`.
///
/// Runs `git diff --name-only --relative <base_ref>..HEAD`, so when `repo` is
/// a subdirectory of a work tree only changes below it are listed. Paths are
/// joined onto `repo`; files deleted since `base_ref` are dropped. A blank
/// `base_ref` means [`DEFAULT_BASE_REF`].
///
/// # Errors
///
/// Returns [`RagError::GitError`] if git cannot be started or exits non-zero.
pub async fn changed_files(repo: &Path, base_ref: &str) -> Result<Vec<PathBuf>> {
    let base_ref = match base_ref.trim() {
        "" => DEFAULT_BASE_REF,
        other => other,
    };
    let output = Command::new("git")
        .arg("diff")
        .arg("--name-only")
        .arg("--relative")
        .arg(format!("{base_ref}..HEAD"))
        .current_dir(repo)
        .output()
        .await
        .map_err(|e| RagError::GitError(format!("failed to run git in {}: {e}", repo.display())))?;

    if !output.status.success() {
        return Err(RagError::GitError(format!(
            "git diff {base_ref}..HEAD failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let mut existing = Vec::new();
    for relative in parse_name_only(&String::from_utf8_lossy(&output.stdout)) {
        let path = repo.join(relative);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            existing.push(path);
        } else {
            debug!(path = %path.display(), "changed file no longer exists");
        }
    }
    debug!(base_ref, changed = existing.len(), "detected changed files");
    Ok(existing)
}

fn parse_name_only(stdout: &str) -> Vec<&str> {
    stdout.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}
