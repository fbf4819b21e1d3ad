//! Changed-path detection for the current push.

use crate::error::{RedeployError, Result};
use tokio::process::Command;
use tracing::{info, warn};

/// Environment variable that, when set, supplies the changed paths directly
/// as a whitespace-delimited list (e.g. from a CI step).
pub const CHANGED_FILES_VAR: &str = "CHANGED_FILES";

/// Outcome of change detection.
///
/// A definite empty list and "could not determine" are distinct: after a
/// force-push or squash-merge the parent diff is unavailable, and redeploying
/// every service in that situation would be wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    Known(Vec<String>),
    Undetermined,
}

/// Determine the paths changed by the current commit.
///
/// Prefers an explicit `CHANGED_FILES` list from the environment; otherwise
/// diffs the current commit against its immediate parent. Any git failure
/// (no parent, shallow clone, not a repository) yields `Undetermined` rather
/// than a fallback scan.
pub async fn detect_changes(repo_path: &str) -> ChangeSet {
    if let Ok(raw) = std::env::var(CHANGED_FILES_VAR) {
        if !raw.trim().is_empty() {
            let paths = parse_changed_files(&raw);
            info!("Using {} changed path(s) from {}", paths.len(), CHANGED_FILES_VAR);
            return ChangeSet::Known(paths);
        }
    }

    match diff_against_parent(repo_path).await {
        Ok(paths) => ChangeSet::Known(paths),
        Err(e) => {
            warn!("Could not determine changed paths: {}", e);
            ChangeSet::Undetermined
        }
    }
}

/// Split a whitespace-delimited path list into individual paths.
pub fn parse_changed_files(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Run `git diff --name-only HEAD^ HEAD` in `repo_path` and collect the paths.
/// A non-zero exit (no parent commit, non-linear history) is an error.
pub async fn diff_against_parent(repo_path: &str) -> Result<Vec<String>> {
    info!(
        "Running (cwd = '{}'): git diff --name-only HEAD^ HEAD",
        repo_path
    );
    let diff = Command::new("git")
        .current_dir(repo_path)
        .args(["diff", "--name-only", "HEAD^", "HEAD"])
        .output()
        .await
        .map_err(|e| RedeployError::GitOperationFailed {
            operation: "diff".to_string(),
            message: format!("git diff failed to start: {}", e),
        })?;

    if !diff.status.success() {
        return Err(RedeployError::GitOperationFailed {
            operation: "diff".to_string(),
            message: String::from_utf8_lossy(&diff.stderr).trim().to_string(),
        });
    }

    let paths: Vec<String> = String::from_utf8_lossy(&diff.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(paths)
}
