// src/engine/runner.rs

//! Async shell that executes one task: pre-operations, job, post-operations.
//!
//! All policy decisions are delegated to [`TaskMachine`]; this module only
//! resolves templates, launches processes and wires cancellation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, OperationConfig, TaskConfig};
use crate::engine::core::{Decision, TaskMachine};
use crate::errors::{Result, WrapError};
use crate::exec::{
    remove_path_with_retries, run_process, Archiver, CancelReason, ProcessSpec, RemovalPolicy,
    RunOutcome, StdoutMode,
};
use crate::logging::{OutputSink, OutputStream};
use crate::resolve::Resolver;
use crate::tokenize::split_all;
use crate::types::Stage;

/// Everything a task run needs besides the task itself.
///
/// Cheap to clone; each spawned task worker gets its own copy.
#[derive(Clone)]
pub struct TaskRunner {
    config: Arc<ConfigFile>,
    sink: Arc<dyn OutputSink>,
    archiver: Arc<dyn Archiver>,
    removal: RemovalPolicy,
    interrupt: CancellationToken,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("tasks", &self.config.tasks().len())
            .field("removal", &self.removal)
            .field("interrupted", &self.interrupt.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// How the job step ended.
enum JobEnd {
    Finished(Result<()>),
    /// Killed because a parallel pre-operation with `StopIfUnsuccessful`
    /// failed. That operation's own result is recorded when the parallel
    /// group is settled.
    PreOperationAborted(Stage),
}

/// A resolved command line, as printed by `--dry-run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
}

/// Result reported by a spawned parallel pre-operation.
type ParallelReport = (Stage, bool, Result<()>);

/// Pre-operations running alongside the job.
struct ParallelPreOps {
    set: JoinSet<ParallelReport>,
    /// Stages of failed operations with `StopIfUnsuccessful`, in arrival order.
    aborts: mpsc::Receiver<Stage>,
    /// Cancels every still-running parallel operation.
    cancel: CancellationToken,
}

impl TaskRunner {
    pub fn new(
        config: Arc<ConfigFile>,
        sink: Arc<dyn OutputSink>,
        archiver: Arc<dyn Archiver>,
        interrupt: CancellationToken,
    ) -> Self {
        Self {
            config,
            sink,
            archiver,
            removal: RemovalPolicy::default(),
            interrupt,
        }
    }

    pub fn with_removal_policy(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub fn config(&self) -> &Arc<ConfigFile> {
        &self.config
    }

    /// Run one task to completion.
    ///
    /// The task is copied first; only the copy is touched (the archive step
    /// rewrites its `CompressPathToTarBeforeHand`).
    pub async fn run(&self, task: &TaskConfig) -> Result<()> {
        let mut task = task.clone();
        let mut machine = TaskMachine::new(task.name.clone());
        let now = Local::now().fixed_offset();

        info!(
            task = %task.name,
            parallel = task.allow_parallel_operations_run,
            pre_operations = task.pre_operations.len(),
            post_operations = task.post_operations.len(),
            "starting task"
        );

        let mut parallel = None;
        if task.allow_parallel_operations_run {
            parallel = Some(self.spawn_parallel_pre_operations(&task, now));
        } else {
            for (idx, op) in task.pre_operations.iter().enumerate() {
                if !op.enabled {
                    continue;
                }
                let stage = Stage::PreOperation(idx + 1);
                let res = self.run_operation(&task, op, stage, &self.interrupt, now).await;
                if machine.record(stage, res, op.stop_if_unsuccessful) == Decision::Abort {
                    return machine.finish();
                }
            }
        }

        machine.enter_job();
        let aborts = parallel.as_mut().map(|p| &mut p.aborts);
        match self.run_job(&mut task, aborts, now).await {
            JobEnd::Finished(res) => {
                machine.record(Stage::Job, res, task.stop_if_unsuccessful);
            }
            JobEnd::PreOperationAborted(stage) => {
                warn!(task = %task.name, %stage, "job cancelled by a failing pre-operation");
            }
        }

        if let Some(parallel) = parallel {
            self.settle_parallel(parallel, &mut machine).await;
        }

        if machine.phase().is_terminal() {
            return machine.finish();
        }

        for (idx, op) in task.post_operations.iter().enumerate() {
            if !op.enabled {
                continue;
            }
            let stage = Stage::PostOperation(idx + 1);
            let res = self.run_operation(&task, op, stage, &self.interrupt, now).await;
            if machine.record(stage, res, op.stop_if_unsuccessful) == Decision::Abort {
                break;
            }
        }

        machine.finish()
    }

    /// Resolve every command line of `task` without executing anything.
    ///
    /// The archive step is not performed, so `%CompressPathToTarBeforeHand%`
    /// shows the configured source path.
    pub fn plan(&self, task: &TaskConfig) -> Vec<PlannedCommand> {
        let general = self.config.general();
        let resolver = Resolver::new(task, self.config.global_dynamic(), &general.date_format);
        let mut planned = Vec::new();

        let mut plan_ops = |ops: &[OperationConfig], stage: fn(usize) -> Stage| {
            for (idx, op) in ops.iter().enumerate().filter(|(_, op)| op.enabled) {
                planned.push(PlannedCommand {
                    stage: stage(idx + 1),
                    program: resolver.resolve(&op.command),
                    args: self.operation_args(&resolver, op),
                });
            }
        };
        plan_ops(&task.pre_operations, Stage::PreOperation);
        plan_ops(&task.post_operations, Stage::PostOperation);

        planned.insert(
            planned
                .iter()
                .position(|p| matches!(p.stage, Stage::PostOperation(_)))
                .unwrap_or(planned.len()),
            PlannedCommand {
                stage: Stage::Job,
                program: resolver.resolve(task.job_command(general)),
                args: split_all(&resolver.resolve_all(&task.arguments), &general.argument_escape),
            },
        );

        planned
    }

    fn operation_args(&self, resolver: &Resolver<'_>, op: &OperationConfig) -> Vec<String> {
        let args = resolver.resolve_all(&op.arguments);
        if op.split_arguments {
            split_all(&args, &self.config.general().argument_escape)
        } else {
            args
        }
    }

    async fn run_operation(
        &self,
        task: &TaskConfig,
        op: &OperationConfig,
        stage: Stage,
        cancel: &CancellationToken,
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        info!(task = %task.name, %stage, "executing operation");

        let general = self.config.general();
        let resolver = Resolver::at(task, self.config.global_dynamic(), &general.date_format, now);
        let spec = ProcessSpec::new(
            resolver.resolve(&op.command),
            self.operation_args(&resolver, op),
            format!("{}: {}", task.name, stage),
        )
        .with_stdout(if op.capture_std_out {
            StdoutMode::Capture(OutputStream::Operation)
        } else {
            StdoutMode::Discard
        })
        .with_timeout(op.timeout());

        let interrupt = &self.interrupt;
        let outcome = run_process(&spec, &self.sink, async {
            cancel.cancelled().await;
            if interrupt.is_cancelled() {
                CancelReason::UserInterrupt
            } else {
                CancelReason::OperationFailed
            }
        })
        .await;

        match outcome {
            RunOutcome::Success => Ok(()),
            RunOutcome::Failed(failure) => Err(WrapError::OperationFailed {
                task: task.name.clone(),
                stage,
                reason: format!("executed operation caught an error: {failure}"),
            }),
            RunOutcome::TimedOut(after) => Err(WrapError::Timeout {
                task: task.name.clone(),
                stage,
                after,
            }),
            RunOutcome::Interrupted(CancelReason::UserInterrupt) => Err(WrapError::UserInterrupt {
                task: task.name.clone(),
                stage,
            }),
            RunOutcome::Interrupted(CancelReason::OperationFailed) => Err(WrapError::OperationFailed {
                task: task.name.clone(),
                stage,
                reason: "cancelled because the task was aborted".to_string(),
            }),
        }
    }

    fn spawn_parallel_pre_operations(&self, task: &TaskConfig, now: DateTime<FixedOffset>) -> ParallelPreOps {
        let enabled: Vec<(usize, OperationConfig)> = task
            .pre_operations
            .iter()
            .enumerate()
            .filter(|(_, op)| op.enabled)
            .map(|(idx, op)| (idx, op.clone()))
            .collect();

        let (abort_tx, aborts) = mpsc::channel(enabled.len().max(1));
        let cancel = self.interrupt.child_token();
        let mut set = JoinSet::new();

        for (idx, op) in enabled {
            let runner = self.clone();
            let task = task.clone();
            let abort_tx = abort_tx.clone();
            let cancel = cancel.clone();
            let stage = Stage::PreOperation(idx + 1);

            set.spawn(async move {
                let res = runner.run_operation(&task, &op, stage, &cancel, now).await;
                if res.is_err()
                    && op.stop_if_unsuccessful
                    && abort_tx.send(stage).await.is_err()
                {
                    debug!(task = %task.name, %stage, "job no longer listening for pre-operation failures");
                }
                (stage, op.stop_if_unsuccessful, res)
            });
        }

        ParallelPreOps { set, aborts, cancel }
    }

    /// Wait for every parallel pre-operation and feed their results to the
    /// machine. Outstanding operations are cancelled once the task aborted.
    async fn settle_parallel(&self, mut parallel: ParallelPreOps, machine: &mut TaskMachine) {
        if machine.phase().is_terminal() {
            parallel.cancel.cancel();
        }

        while let Some(joined) = parallel.set.join_next().await {
            match joined {
                Ok((stage, stop, res)) => {
                    if machine.phase().is_terminal() {
                        if let Err(err) = res {
                            debug!(task = %machine.task(), %stage, error = %err, "parallel pre-operation ended after abort");
                        }
                        continue;
                    }
                    if machine.record(stage, res, stop) == Decision::Abort {
                        parallel.cancel.cancel();
                    }
                }
                Err(e) => {
                    error!(task = %machine.task(), error = %e, "parallel pre-operation worker failed");
                }
            }
        }
    }

    async fn run_job(
        &self,
        task: &mut TaskConfig,
        mut aborts: Option<&mut mpsc::Receiver<Stage>>,
        now: DateTime<FixedOffset>,
    ) -> JobEnd {
        let general = self.config.general();
        let global_dynamic = self.config.global_dynamic();

        let source = Resolver::at(task, global_dynamic, &general.date_format, now)
            .resolve(&task.compress_path_to_tar_before_hand);
        if !source.is_empty() {
            info!(task = %task.name, source = %source, "archiving before job");
            let archived = tokio::select! {
                res = self.archiver.archive(Path::new(&source), task.overwrite_compressed) => res,
                _ = self.interrupt.cancelled() => {
                    return JobEnd::Finished(Err(WrapError::UserInterrupt {
                        task: task.name.clone(),
                        stage: Stage::Job,
                    }));
                }
            };
            match archived {
                Ok(path) => {
                    task.compress_path_to_tar_before_hand = path.to_string_lossy().into_owned();
                }
                Err(e) => {
                    let err = WrapError::ArchiveFailed {
                        task: task.name.clone(),
                        reason: format!("{e:#}"),
                    };
                    if task.stop_if_unsuccessful {
                        return JobEnd::Finished(Err(err));
                    }
                    error!(task = %task.name, error = %err, "archive step failed; continuing with job");
                }
            }
        }

        let resolver = Resolver::at(task, global_dynamic, &general.date_format, now);
        let program = resolver.resolve(task.job_command(general));
        let args = split_all(&resolver.resolve_all(&task.arguments), &general.argument_escape);
        let remove_after = resolver.resolve(&task.remove_path_after_job_completes);

        if let Some(rx) = aborts.as_deref_mut()
            && let Ok(stage) = rx.try_recv()
        {
            info!(task = %task.name, %stage, "parallel pre-operation already failed; job not started");
            if !remove_after.is_empty() {
                remove_path_with_retries(Path::new(&remove_after), self.removal).await;
            }
            return JobEnd::PreOperationAborted(stage);
        }

        let spec = ProcessSpec::new(program, args, format!("{}: {}", task.name, Stage::Job))
            .with_stdout(StdoutMode::Capture(OutputStream::Job));

        info!(task = %task.name, "executing job");
        let mut sibling_failure: Option<Stage> = None;
        let outcome = run_process(
            &spec,
            &self.sink,
            job_cancellation(&self.interrupt, aborts, &mut sibling_failure),
        )
        .await;

        if !matches!(outcome, RunOutcome::Interrupted(CancelReason::UserInterrupt))
            && !remove_after.is_empty()
        {
            remove_path_with_retries(Path::new(&remove_after), self.removal).await;
        }

        let res = match outcome {
            RunOutcome::Success => {
                info!(task = %task.name, "job completed successfully");
                Ok(())
            }
            RunOutcome::Failed(failure) => Err(WrapError::JobFailed {
                task: task.name.clone(),
                reason: failure.to_string(),
            }),
            RunOutcome::TimedOut(after) => Err(WrapError::Timeout {
                task: task.name.clone(),
                stage: Stage::Job,
                after,
            }),
            RunOutcome::Interrupted(CancelReason::UserInterrupt) => Err(WrapError::UserInterrupt {
                task: task.name.clone(),
                stage: Stage::Job,
            }),
            RunOutcome::Interrupted(CancelReason::OperationFailed) => {
                return JobEnd::PreOperationAborted(sibling_failure.unwrap_or(Stage::Job));
            }
        };
        JobEnd::Finished(res)
    }
}

/// Resolves when the user interrupts or a parallel pre-operation reports a
/// fatal failure, whichever happens first. The failing stage is stored in
/// `slot`.
async fn job_cancellation(
    interrupt: &CancellationToken,
    aborts: Option<&mut mpsc::Receiver<Stage>>,
    slot: &mut Option<Stage>,
) -> CancelReason {
    let sibling = async {
        if let Some(rx) = aborts
            && let Some(stage) = rx.recv().await
        {
            *slot = Some(stage);
            return;
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = interrupt.cancelled() => CancelReason::UserInterrupt,
        _ = sibling => CancelReason::OperationFailed,
    }
}
