// src/engine/mod.rs

//! Task orchestration.
//!
//! A task run walks `PreOps -> Job -> PostOps -> Done`, with `Aborted`
//! reachable from every phase. The pure state machine lives in [`core`];
//! the async/IO shell that launches processes is [`runner`], and
//! [`dispatch`] is the by-name entry point used by the CLI.

pub mod core;
pub mod dispatch;
pub mod runner;

pub use core::{Decision, TaskMachine};
pub use dispatch::run_tasks_by_name;
pub use runner::{PlannedCommand, TaskRunner};
