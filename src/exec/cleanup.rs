// src/exec/cleanup.rs

//! Best-effort removal of a path once the job has finished.

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};

/// Fixed-delay retry settings for path removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalPolicy {
    /// Total number of removal attempts.
    pub attempts: u32,
    /// Delay before each attempt.
    pub delay: Duration,
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Remove `path` (file or directory tree), retrying per `policy`.
///
/// Never fails: a missing path or exhausted retries are logged and `false`
/// is returned.
pub async fn remove_path_with_retries(path: &Path, policy: RemovalPolicy) -> bool {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) => {
            error!(path = %path.display(), error = %e, "path to remove is not accessible");
            return false;
        }
    };

    let mut last_err: Option<io::Error> = None;
    for attempt in 1..=policy.attempts.max(1) {
        tokio::time::sleep(policy.delay).await;

        let res = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        match res {
            Ok(()) => {
                info!(path = %path.display(), attempt, "removed path after job completion");
                return true;
            }
            Err(e) => {
                debug!(path = %path.display(), attempt, error = %e, "path removal attempt failed");
                last_err = Some(e);
            }
        }
    }

    if let Some(e) = last_err {
        error!(
            path = %path.display(),
            attempts = policy.attempts,
            error = %e,
            "giving up removing path"
        );
    }
    false
}
