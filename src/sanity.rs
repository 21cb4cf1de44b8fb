//! Pre-flight checks for the host
//!
//! Two checks run before the engine is invoked:
//! - the automation engine is on PATH, installing it through the system
//!   package manager on RHEL-family distributions and Fedora when it is not
//! - the inventory file exists
//!
//! Either failure prints remediation steps and stops the run.

use crate::command_runner::CommandRunner;
use crate::config::{SetupConfig, Settings};
use crate::distro::{DistroDetector, DistroInfo, Distribution};
use crate::error::{Result, SetupError};
use crate::output;

/// EPEL release package for a RHEL major version
pub fn epel_release_url(major: u32) -> String {
    format!("https://dl.fedoraproject.org/pub/epel/epel-release-latest-{major}.noarch.rpm")
}

/// Package-manager commands that install `package` on this distribution.
///
/// Empty when the distribution is not one the installer knows how to handle.
pub fn install_commands(info: &DistroInfo, package: &str) -> Vec<Vec<String>> {
    let cmd = |parts: &[&str]| parts.iter().map(|p| p.to_string()).collect::<Vec<_>>();

    match &info.distribution {
        d if d.is_rhel_family() => {
            let mut commands = Vec::new();
            if let Some(major @ (6 | 7)) = info.major_version {
                commands.push(cmd(&["yum", "install", "-y", &epel_release_url(major)]));
            }
            commands.push(cmd(&["yum", "install", "-y", package]));
            commands
        }
        Distribution::Fedora => vec![cmd(&["dnf", "install", "-y", package])],
        _ => Vec::new(),
    }
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Make sure the automation engine is on PATH.
///
/// When it is already present this performs no package-manager calls. When it
/// is missing, an install is attempted for known distributions; failures of
/// the package manager are only logged, and a final PATH lookup decides.
pub fn ensure_engine_installed(
    runner: &dyn CommandRunner,
    detector: &DistroDetector,
    settings: &Settings,
    config: &SetupConfig,
) -> Result<()> {
    if let Some(path) = runner.locate(&settings.engine) {
        tracing::debug!("{} found at {}", settings.engine, path.display());
        return Ok(());
    }

    tracing::info!("{} not found on PATH, attempting install", settings.engine);
    if config.bundle_install {
        tracing::info!("bundle_install requested; engine install path is unchanged");
    }

    let info = detector.detect();
    let commands = install_commands(&info, &settings.engine_package);

    if commands.is_empty() {
        tracing::warn!("No automatic install available for distribution '{}'", info.distribution);
    } else if !is_running_as_root() {
        tracing::warn!("Not running as root; package installation will likely fail");
    }

    for command in &commands {
        let (program, args) = match command.split_first() {
            Some(split) => split,
            None => continue,
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match runner.run_status(program, &args) {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!("{} exited with {}", command.join(" "), status),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }

    if runner.locate(&settings.engine).is_some() {
        tracing::info!("{} installed", settings.engine);
        return Ok(());
    }

    print_engine_missing(settings, &info);
    Err(SetupError::engine_missing(&settings.engine))
}

fn print_engine_missing(settings: &Settings, info: &DistroInfo) {
    let mut lines = vec![
        format!("{} could not be found on PATH.", settings.engine),
        String::new(),
    ];
    match &info.distribution {
        d if d.is_rhel_family() => {
            lines.push("Solution: enable EPEL and install the engine:".to_string());
            lines.push(format!("  yum install -y {}", settings.engine_package));
        }
        Distribution::Fedora => {
            lines.push("Solution: install the engine:".to_string());
            lines.push(format!("  dnf install -y {}", settings.engine_package));
        }
        other => {
            lines.push(format!(
                "Automatic install is not supported on '{}'.",
                other
            ));
            lines.push(format!(
                "Solution: install {} with your package manager and try again.",
                settings.engine_package
            ));
        }
    }
    output::error_box("Setup - Pre-flight Check Failed", &lines);
}

/// Inventory must name an existing file.
pub fn check_inventory(config: &SetupConfig) -> Result<()> {
    if config.inventory.is_file() {
        return Ok(());
    }

    output::error_box(
        "Setup - Inventory File Missing",
        &[
            format!("No inventory file at {}", config.inventory.display()),
            String::new(),
            "Solution: edit the inventory file in this directory, or point".to_string(),
            "to another one with: setup -i <inventory_file>".to_string(),
        ],
    );
    Err(SetupError::InventoryMissing(config.inventory.clone()))
}
