// src/exec/archive.rs

//! Pluggable archival step run before the job.
//!
//! The engine talks to an [`Archiver`] instead of creating archives itself.
//! Production uses [`TarArchiver`], which shells out to the system `tar`;
//! tests can swap in an implementation that never touches the filesystem.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use tracing::{debug, info};

use crate::exec::runner::{run_process, ProcessSpec, RunOutcome};
use crate::logging::{OutputSink, TracingSink};
use crate::resolve::format_date;

/// Date format appended to archive names.
pub const ARCHIVE_DATE_FORMAT: &str = "YYYY-MM-DD_hhmmssms";

/// Creates an archive of a path and returns the archive's location.
pub trait Archiver: Send + Sync + std::fmt::Debug {
    fn archive<'a>(
        &'a self,
        source: &'a Path,
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;
}

/// `tar -czf` based archiver.
///
/// `<parent>/<name>` becomes `<parent>/<name>-<YYYY-MM-DD_hhmmssms>.tar.gz`,
/// containing `<name>` relative to `<parent>`.
#[derive(Debug, Clone)]
pub struct TarArchiver {
    program: String,
}

impl Default for TarArchiver {
    fn default() -> Self {
        Self {
            program: "tar".to_string(),
        }
    }
}

impl TarArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target path for an archive of `source` created now.
    pub fn archive_path(source: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("cannot archive {:?}: no file name", source))?;
        let stamp = format_date(&Local::now(), ARCHIVE_DATE_FORMAT);
        let parent = parent_dir(source);
        Ok(parent.join(format!("{name}-{stamp}.tar.gz")))
    }

    async fn create(&self, source: &Path, overwrite: bool) -> Result<PathBuf> {
        tokio::fs::metadata(source)
            .await
            .with_context(|| format!("reading archive source {:?}", source))?;

        let output = Self::archive_path(source)?;
        if tokio::fs::try_exists(&output).await.unwrap_or(false) {
            if !overwrite {
                bail!("archive already exists: {}", output.display());
            }
            tokio::fs::remove_file(&output)
                .await
                .with_context(|| format!("removing existing archive {:?}", output))?;
            debug!(archive = %output.display(), "removed existing archive");
        }

        let parent = parent_dir(source);
        let name = source
            .file_name()
            .ok_or_else(|| anyhow!("cannot archive {:?}: no file name", source))?;

        let spec = ProcessSpec::new(
            self.program.clone(),
            vec![
                "-czf".to_string(),
                output.to_string_lossy().into_owned(),
                "-C".to_string(),
                parent.to_string_lossy().into_owned(),
                name.to_string_lossy().into_owned(),
            ],
            "archive",
        )
        .with_inherit_stdin(false);

        let sink: Arc<dyn OutputSink> = Arc::new(TracingSink);
        match run_process(&spec, &sink, std::future::pending()).await {
            RunOutcome::Success => {
                info!(source = %source.display(), archive = %output.display(), "archive created");
                Ok(output)
            }
            RunOutcome::Failed(failure) => Err(anyhow!("tar failed: {failure}")),
            other => Err(anyhow!("tar did not complete: {other:?}")),
        }
    }
}

impl Archiver for TarArchiver {
    fn archive<'a>(
        &'a self,
        source: &'a Path,
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(self.create(source, overwrite))
    }
}

fn parent_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
