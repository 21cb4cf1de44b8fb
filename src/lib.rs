//! Setup wrapper library
//!
//! Prepares the host for the automation engine and runs one of the install,
//! backup, restore or rekey playbooks, keeping a log of every run.

pub mod cli;
pub mod command_runner;
pub mod config;
pub mod distro;
pub mod error;
pub mod log_file;
pub mod output;
pub mod playbook_runner;
pub mod process_guard;
pub mod sanity;
pub mod types;

pub use cli::Cli;
pub use command_runner::{CommandRunner, RealCommandRunner};
pub use config::{SetupConfig, Settings};
pub use distro::{DistroDetector, DistroInfo, Distribution};
pub use error::{SetupError, EXIT_ENGINE_MISSING, EXIT_USAGE};
pub use playbook_runner::{Invocation, PlaybookOutcome, run_playbook};
pub use types::{ExtraVar, OperationMode};
