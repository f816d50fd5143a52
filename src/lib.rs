// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod resolve;
pub mod tokenize;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_dir, load_and_validate, load_dir, write_default_config, ConfigFile};
use crate::engine::{run_tasks_by_name, TaskRunner};
use crate::errors::WrapError;
use crate::exec::TarArchiver;
use crate::logging::{LoggingHandle, TracingSink};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - `--init` (starter config)
/// - config loading (single file or config directory)
/// - `--list` / `--dry-run`
/// - SIGINT / SIGTERM handling
/// - the task runner for the requested task name
pub async fn run(args: CliArgs, logging: &LoggingHandle) -> Result<()> {
    if args.init {
        let dir = default_config_dir(args.config_dir.as_deref())?;
        match write_default_config(&dir, args.force)? {
            Some(path) => println!("wrote {}", path.display()),
            None => println!(
                "{} already contains a config.toml; use --force to overwrite it",
                dir.display()
            ),
        }
        return Ok(());
    }

    let cfg = load_config(&args)?;
    logging.apply_debug_setting(cfg.general().debug)?;

    if args.list {
        print_task_list(&cfg);
        return Ok(());
    }

    let Some(task_name) = args.task.as_deref() else {
        return Err(WrapError::ConfigError("no task name given".to_string()).into());
    };

    let interrupt = CancellationToken::new();
    let runner = TaskRunner::new(
        Arc::new(cfg),
        Arc::new(TracingSink),
        Arc::new(TarArchiver::new()),
        interrupt.clone(),
    );

    if args.dry_run {
        print_dry_run(&runner, task_name)?;
        return Ok(());
    }

    spawn_signal_listener(interrupt);
    run_tasks_by_name(&runner, task_name).await?;
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    if let Some(path) = &args.config {
        info!(path = %path.display(), "loading single config file");
        return Ok(load_and_validate(path)?);
    }
    let dir = default_config_dir(args.config_dir.as_deref())?;
    info!(dir = %dir.display(), "loading config directory");
    load_dir(&dir).map_err(|e| {
        anyhow::Error::new(e).context(format!("loading config directory {}", dir.display()))
    })
}

/// Cancel `interrupt` on Ctrl-C or SIGTERM.
fn spawn_signal_listener(interrupt: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("interrupt received; stopping running tasks");
        interrupt.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn print_task_list(cfg: &ConfigFile) {
    println!("tasks ({}):", cfg.tasks().len());
    for task in cfg.tasks() {
        println!(
            "  - {} (pre: {}, post: {}{})",
            task.name,
            task.pre_operations.len(),
            task.post_operations.len(),
            if task.allow_parallel_operations_run {
                ", parallel"
            } else {
                ""
            }
        );
    }
}

/// Print every resolved command line of the matching tasks.
fn print_dry_run(runner: &TaskRunner, name: &str) -> Result<()> {
    let config = runner.config();
    let mut matched = 0;

    println!("wrapngo dry-run");
    for task in config.tasks_named(name) {
        matched += 1;
        println!();
        println!("task: {}", task.name);
        if !task.compress_path_to_tar_before_hand.is_empty() {
            println!("  archive before job: {}", task.compress_path_to_tar_before_hand);
        }
        for planned in runner.plan(task) {
            let line = std::iter::once(planned.program.as_str())
                .chain(planned.args.iter().map(String::as_str))
                .map(quote_if_needed)
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {}: {}", planned.stage, line);
        }
        if !task.remove_path_after_job_completes.is_empty() {
            println!("  remove after job: {}", task.remove_path_after_job_completes);
        }
    }

    if matched == 0 {
        return Err(WrapError::TaskNotFound(name.to_string()).into());
    }
    debug!(tasks = matched, "dry-run complete (no execution)");
    Ok(())
}

fn quote_if_needed(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("{arg:?}")
    } else {
        arg.to_string()
    }
}
