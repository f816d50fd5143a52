// src/engine/dispatch.rs

//! "Run task by name" entry point.

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::errors::{Result, WrapError};

use super::runner::TaskRunner;

/// Run every task whose name matches `name`, each on its own worker.
///
/// Matching follows `CaseSensitiveTaskNames`. Returns `TaskNotFound` when
/// nothing matches and `TasksFailed` with every task error otherwise.
pub async fn run_tasks_by_name(runner: &TaskRunner, name: &str) -> Result<()> {
    let config = runner.config().clone();
    let mut workers = JoinSet::new();

    for task in config.tasks_named(name) {
        let runner = runner.clone();
        let task = task.clone();
        workers.spawn(async move { runner.run(&task).await });
    }

    if workers.is_empty() {
        return Err(WrapError::TaskNotFound(name.to_string()));
    }
    info!(task = %name, workers = workers.len(), "dispatched matching tasks");

    let mut failures = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(err),
            Err(e) => {
                error!(task = %name, error = %e, "task worker panicked or was cancelled");
                failures.push(WrapError::Other(anyhow::anyhow!("task worker failed: {e}")));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(WrapError::TasksFailed(failures))
    }
}
