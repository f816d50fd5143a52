#![allow(dead_code)]

pub use wrapngo_test_utils::builders;
pub use wrapngo_test_utils::fakes;
pub use wrapngo_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wrapngo::config::ConfigFile;
use wrapngo::engine::TaskRunner;
use wrapngo::exec::{Archiver, RemovalPolicy};
use wrapngo::logging::OutputSink;

/// Runner over `config` with a short removal policy so tests stay fast.
pub fn test_runner(
    config: ConfigFile,
    sink: Arc<dyn OutputSink>,
    archiver: Arc<dyn Archiver>,
) -> (TaskRunner, CancellationToken) {
    let interrupt = CancellationToken::new();
    let runner = TaskRunner::new(Arc::new(config), sink, archiver, interrupt.clone())
        .with_removal_policy(RemovalPolicy {
            attempts: 3,
            delay: Duration::from_millis(10),
        });
    (runner, interrupt)
}
