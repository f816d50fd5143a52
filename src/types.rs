// src/types.rs

use std::fmt;

/// Where inside a task a unit of work runs.
///
/// Operation numbers are 1-based positions in the configured list, counting
/// disabled entries, so log lines line up with the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreOperation(usize),
    Job,
    PostOperation(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::PreOperation(n) => write!(f, "PreOperation #{n}"),
            Stage::Job => write!(f, "Job"),
            Stage::PostOperation(n) => write!(f, "PostOperation #{n}"),
        }
    }
}

/// Phase of the per-task state machine.
///
/// `PreOps -> Job -> PostOps -> Done`, with `Aborted` reachable from any
/// non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreOps,
    Job,
    PostOps,
    Done,
    Aborted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }
}
