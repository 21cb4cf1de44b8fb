//! Abstraction over external programs used while preparing the host.
//!
//! The environment prober needs two things from the outside world: whether a
//! program is on PATH, and the exit status of a package-manager command.
//! [`CommandRunner`] puts both behind a trait so the install decisions can be
//! tested without touching the real package manager.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::process_guard::{CommandDeathSignal, RegisteredChild};

pub trait CommandRunner {
    /// Resolve `program` on PATH
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run a command with inherited stdio and return its exit status.
    fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;
}

/// Production implementation backed by [`std::process::Command`].
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        tracing::info!("Running: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .with_death_signal()
            .spawn()
            .with_context(|| format!("Failed to run '{program}'"))?;
        let registered = RegisteredChild::register(child.id());

        let status = child.wait();
        drop(registered);
        status.with_context(|| format!("Failed waiting for '{program}'"))
    }
}

/// Records every call and answers from canned state.
#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::os::unix::process::ExitStatusExt;

    #[derive(Default)]
    pub struct RecordingRunner {
        /// Whether `locate` finds the program
        pub present: Cell<bool>,
        /// Flip `present` to true after this many `run_status` calls
        pub installs_after: Option<usize>,
        pub calls: RefCell<Vec<Vec<String>>>,
        pub lookups: Cell<usize>,
    }

    impl RecordingRunner {
        pub fn present() -> Self {
            let runner = Self::default();
            runner.present.set(true);
            runner
        }

        pub fn absent() -> Self {
            Self::default()
        }

        pub fn installing_after(calls: usize) -> Self {
            Self {
                installs_after: Some(calls),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.lookups.set(self.lookups.get() + 1);
            self.present
                .get()
                .then(|| PathBuf::from("/usr/bin").join(program))
        }

        fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.borrow_mut().push(call);

            if self.installs_after == Some(self.calls.borrow().len()) {
                self.present.set(true);
            }
            Ok(ExitStatus::from_raw(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_runner_locates_sh() {
        let runner = RealCommandRunner;
        assert!(runner.locate("sh").is_some());
        assert!(runner.locate("this_binary_definitely_does_not_exist_12345").is_none());
    }

    #[test]
    fn test_real_runner_status() {
        let runner = RealCommandRunner;
        assert!(runner.run_status("true", &[]).unwrap().success());

        let status = runner.run_status("sh", &["-c", "exit 3"]).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_real_runner_unregisters_reaped_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}", pid_file.display());

        let runner = RealCommandRunner;
        assert!(runner.run_status("sh", &["-c", &script]).unwrap().success());

        let pid: u32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        let registry = crate::process_guard::ChildRegistry::global();
        assert!(!registry.lock().unwrap().contains(pid));
    }

    #[test]
    fn test_real_runner_missing_program() {
        let runner = RealCommandRunner;
        let err = runner
            .run_status("this_binary_definitely_does_not_exist_12345", &[])
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run"));
    }
}
