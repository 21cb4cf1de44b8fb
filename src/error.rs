//! Error handling for the setup wrapper
//!
//! Every failure the wrapper can report on its own maps to a fixed process
//! exit code. A non-zero exit from the automation engine is not an error here:
//! it is carried by `PlaybookOutcome` and becomes the process exit code as is.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for usage errors and a missing inventory file (`EX_USAGE`).
pub const EXIT_USAGE: i32 = 64;

/// Exit code when the automation engine is missing and could not be installed.
pub const EXIT_ENGINE_MISSING: i32 = 32;

/// Exit code for unexpected runtime failures (spawn, I/O).
pub const EXIT_FAILURE: i32 = 1;

/// Main error type for the setup wrapper
#[derive(Error, Debug)]
pub enum SetupError {
    /// Bad or unknown flag, `-h`, or conflicting operation modes
    #[error("{0}")]
    Usage(String),

    /// Automation engine is not on PATH and the install path is exhausted
    #[error("{engine} could not be found on PATH")]
    EngineMissing { engine: String },

    /// Inventory path does not name an existing file
    #[error("inventory file not found: {}", .0.display())]
    InventoryMissing(PathBuf),

    /// The automation engine could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO errors (transient log, output pipe)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create an engine-missing error
    pub fn engine_missing(engine: impl Into<String>) -> Self {
        Self::EngineMissing {
            engine: engine.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::InventoryMissing(_) => EXIT_USAGE,
            Self::EngineMissing { .. } => EXIT_ENGINE_MISSING,
            Self::Spawn { .. } | Self::Io(_) => EXIT_FAILURE,
        }
    }
}
