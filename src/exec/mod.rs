// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] launches a single external process with `tokio::process`
//!   and races its exit against a timeout and a cancellation future.
//! - [`archive`] provides the `Archiver` trait and the `tar`-backed
//!   implementation used before the job.
//! - [`cleanup`] removes the post-job path with bounded retries.

pub mod archive;
pub mod cleanup;
pub mod runner;

pub use archive::{Archiver, TarArchiver};
pub use cleanup::{remove_path_with_retries, RemovalPolicy};
pub use runner::{
    run_process, CancelReason, ProcessFailure, ProcessSpec, RunOutcome, StdoutMode,
};
