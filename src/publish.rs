//! Best-effort git publishing of the updated catalog.
//!
//! Stages everything, commits with a fixed message, and pushes to the
//! pre-configured remote of the website repository. Publishing is
//! subordinate to local persistence: by the time this runs the catalog and
//! images are already on disk, so any failure here (offline, nothing to
//! commit, auth) is logged and swallowed — never rolled back, never fatal.

use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

const COMMIT_MESSAGE: &str = "Update archive catalog";

/// Stage, commit, and push the working tree at `repo_dir`.
///
/// Returns whether the push went through; callers only use this for the
/// run summary.
pub async fn publish(repo_dir: &Path) -> bool {
    for args in [
        &["add", "-A"][..],
        &["commit", "-m", COMMIT_MESSAGE][..],
        &["push"][..],
    ] {
        if !run_git(repo_dir, args).await {
            return false;
        }
    }
    info!("published catalog changes from '{}'", repo_dir.display());
    true
}

async fn run_git(repo_dir: &Path, args: &[&str]) -> bool {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(
                "git {} failed ({}): {}",
                args.join(" "),
                out.status,
                stderr.trim()
            );
            false
        }
        Err(e) => {
            warn!("git {} could not run: {}", args.join(" "), e);
            false
        }
    }
}
