use clap::{ArgAction, ArgGroup, Parser};
use std::path::{Component, Path, PathBuf};

use crate::config::{DEFAULT_INVENTORY, SetupConfig};
use crate::error::{EXIT_USAGE, SetupError};
use crate::types::{ExtraVar, OperationMode};

/// Prepare the host and run the install, backup, restore or rekey playbook
#[derive(Parser, Debug)]
#[command(name = "setup")]
#[command(about = "Prepare the host and run the install, backup, restore or rekey playbook")]
#[command(version)]
#[command(disable_help_flag = true)]
#[command(args_override_self = true)]
#[command(
    override_usage = "setup [-i INVENTORY_FILE] [-e KEY=VALUE]... [-b|-r|-k] [-h] [-- ANSIBLE_OPTIONS...]"
)]
#[command(group(ArgGroup::new("mode").args(["backup", "restore", "rekey"])))]
#[command(after_help = "Any options after -- are passed to ansible-playbook unchanged.")]
pub struct Cli {
    /// Path to the inventory file
    #[arg(short = 'i', value_name = "INVENTORY_FILE", default_value = DEFAULT_INVENTORY)]
    pub inventory: PathBuf,

    /// Extra variable passed to ansible-playbook (repeatable)
    #[arg(short = 'e', value_name = "KEY=VALUE", allow_hyphen_values = true)]
    pub extra_vars: Vec<String>,

    /// Back up the installation (backup.yml)
    #[arg(short = 'b')]
    pub backup: bool,

    /// Restore the installation from a backup (restore.yml)
    #[arg(short = 'r')]
    pub restore: bool,

    /// Generate a new secret key (rekey.yml)
    #[arg(short = 'k')]
    pub rekey: bool,

    /// Show this help message and exit
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Options forwarded verbatim to ansible-playbook
    #[arg(last = true, value_name = "ANSIBLE_OPTIONS")]
    pub ansible_options: Vec<String>,
}

impl Cli {
    /// Parse the process arguments, exiting with the usage status on any failure.
    ///
    /// `-h` also exits with the usage status, matching unknown flags.
    pub fn parse_or_exit() -> Self {
        match <Self as Parser>::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let code = match err.kind() {
                    clap::error::ErrorKind::DisplayVersion => 0,
                    _ => EXIT_USAGE,
                };
                let _ = err.print();
                std::process::exit(code);
            }
        }
    }

    /// Parse an explicit argument list (first item is the program name).
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args).map_err(|e| SetupError::usage(e.to_string()))
    }

    pub fn mode(&self) -> OperationMode {
        if self.backup {
            OperationMode::Backup
        } else if self.restore {
            OperationMode::Restore
        } else if self.rekey {
            OperationMode::Rekey
        } else {
            OperationMode::Install
        }
    }

    /// Turn parsed flags into the immutable run configuration.
    ///
    /// The inventory path is resolved against `cwd`; symlinks are resolved
    /// when the file exists.
    pub fn into_config(self, cwd: &Path) -> SetupConfig {
        let mode = self.mode();
        let inventory = absolutize(&self.inventory, cwd);
        let extra_vars = self.extra_vars.into_iter().map(ExtraVar::new).collect();
        SetupConfig::new(inventory, extra_vars, self.ansible_options, mode)
    }
}

/// Absolute form of `path`: canonical when it exists, otherwise normalized lexically.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    joined
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(&joined))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
