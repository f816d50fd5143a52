// src/engine/core.rs

//! Pure per-task state machine.
//!
//! [`TaskMachine`] tracks the phase of one task run and decides, for every
//! finished unit (operation or job), whether the task continues or aborts.
//! It has no Tokio types, spawns nothing and performs no IO, so the policy
//! can be tested without launching processes. The async shell in
//! [`crate::engine::runner`] feeds it results.

use tracing::{error, info, warn};

use crate::errors::{Result, WrapError};
use crate::types::{Phase, Stage};

/// What the shell should do after a unit finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

/// Per-run state of a single task.
///
/// - A failure aborts the task iff it is a user interrupt or the failing
///   unit has its own `StopIfUnsuccessful` set.
/// - Tolerated failures are logged. A tolerated post-operation failure is
///   kept as the task result unless a later post-operation succeeds.
#[derive(Debug)]
pub struct TaskMachine {
    task: String,
    phase: Phase,
    failure: Option<WrapError>,
    trailing_error: Option<WrapError>,
    tolerated: usize,
}

impl TaskMachine {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            phase: Phase::PreOps,
            failure: None,
            trailing_error: None,
            tolerated: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Number of failures that were logged but did not abort the task.
    pub fn tolerated_failures(&self) -> usize {
        self.tolerated
    }

    /// `PreOps -> Job`. No-op in any other phase.
    pub fn enter_job(&mut self) {
        if self.phase == Phase::PreOps {
            self.phase = Phase::Job;
        }
    }

    /// Record the result of one unit.
    ///
    /// A job result (successful or tolerated) moves the machine to
    /// `PostOps`. Once terminal, every further result is ignored and
    /// `Abort` is returned.
    pub fn record(&mut self, stage: Stage, result: Result<()>, stop_if_unsuccessful: bool) -> Decision {
        if self.phase.is_terminal() {
            if let Err(err) = result {
                warn!(task = %self.task, %stage, error = %err, "result after task finished; ignoring");
            }
            return Decision::Abort;
        }

        match result {
            Ok(()) => {
                info!(task = %self.task, %stage, "finished successfully");
                if matches!(stage, Stage::PostOperation(_)) {
                    self.trailing_error = None;
                }
                if stage == Stage::Job {
                    self.phase = Phase::PostOps;
                }
                Decision::Continue
            }
            Err(err) if err.is_interrupt() || stop_if_unsuccessful => {
                error!(task = %self.task, %stage, error = %err, "aborting task");
                self.failure = Some(err);
                self.phase = Phase::Aborted;
                Decision::Abort
            }
            Err(err) => {
                warn!(task = %self.task, %stage, error = %err, "failure tolerated; continuing");
                self.tolerated += 1;
                match stage {
                    Stage::PostOperation(_) => self.trailing_error = Some(err),
                    Stage::Job => self.phase = Phase::PostOps,
                    Stage::PreOperation(_) => {}
                }
                Decision::Continue
            }
        }
    }

    /// Close the run and produce the task result.
    pub fn finish(mut self) -> Result<()> {
        if self.phase == Phase::Aborted {
            return match self.failure.take() {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }

        self.phase = Phase::Done;
        match self.trailing_error.take() {
            Some(err) => {
                error!(task = %self.task, error = %err, "task finished with an unrecovered failure");
                Err(err)
            }
            None => {
                info!(task = %self.task, tolerated = self.tolerated, "task completed");
                Ok(())
            }
        }
    }
}
