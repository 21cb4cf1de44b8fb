//! Permanent log files
//!
//! The engine's output lands in a transient log in the working directory.
//! After the run it is copied to `<stem>-<YYYY-MM-DD-HH:MM:SS>.log`, and the
//! transient copy is removed only once that copy succeeded.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp layout used in permanent log names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Permanent log path for a run that finished at `now`
pub fn permanent_log_path(log_dir: &Path, stem: &str, now: &DateTime<Local>) -> PathBuf {
    log_dir.join(format!("{}-{}.log", stem, now.format(TIMESTAMP_FORMAT)))
}

/// Copy `transient` into `log_dir` under a timestamped name, then remove it.
///
/// On copy failure the transient log is left where it is and the error is
/// returned. A failed removal after a good copy is only logged.
pub fn finalize_log(
    transient: &Path,
    log_dir: &Path,
    stem: &str,
    now: &DateTime<Local>,
) -> Result<PathBuf> {
    let destination = permanent_log_path(log_dir, stem, now);

    fs::copy(transient, &destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            transient.display(),
            destination.display()
        )
    })?;

    if let Err(e) = fs::remove_file(transient) {
        tracing::warn!("Failed to remove {}: {}", transient.display(), e);
    }

    tracing::debug!("Log saved to {}", destination.display());
    Ok(destination)
}
