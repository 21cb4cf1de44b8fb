//! Run configuration
//!
//! `SetupConfig` is built once by the argument parser and then only read.
//! `Settings` carries the environment contract: which engine to look for,
//! which package provides it, where logs go and which root the distribution
//! probes read from.

use std::env;
use std::path::{Path, PathBuf};

use crate::types::{ExtraVar, OperationMode};

/// Engine executable looked up on PATH
pub const DEFAULT_ENGINE: &str = "ansible-playbook";

/// Package providing the engine on RHEL-family distributions and Fedora
pub const DEFAULT_ENGINE_PACKAGE: &str = "ansible";

/// Inventory used when `-i` is not given
pub const DEFAULT_INVENTORY: &str = "inventory";

/// Everything the parser decided about this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Absolute path to the inventory file (existence is checked later)
    pub inventory: PathBuf,
    /// `-e` tokens in command-line order
    pub extra_vars: Vec<ExtraVar>,
    /// Tokens after `--`, forwarded verbatim
    pub passthrough: Vec<String>,
    pub mode: OperationMode,
    /// Set when any extra var has the `bundle_install` key
    pub bundle_install: bool,
}

impl SetupConfig {
    pub fn new(
        inventory: PathBuf,
        extra_vars: Vec<ExtraVar>,
        passthrough: Vec<String>,
        mode: OperationMode,
    ) -> Self {
        let bundle_install = extra_vars.iter().any(ExtraVar::is_bundle_install);
        Self {
            inventory,
            extra_vars,
            passthrough,
            mode,
            bundle_install,
        }
    }

    pub fn playbook(&self) -> &'static str {
        self.mode.playbook()
    }

    pub fn log_name(&self) -> &'static str {
        self.mode.log_name()
    }
}

/// Environment-driven settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `SETUP_ENGINE`
    pub engine: String,
    /// `SETUP_ENGINE_PACKAGE`
    pub engine_package: String,
    /// `SETUP_LOG_DIR`; `None` means the working directory
    pub log_dir: Option<PathBuf>,
    /// `SETUP_HOST_ROOT`
    pub host_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            engine_package: DEFAULT_ENGINE_PACKAGE.to_string(),
            log_dir: None,
            host_root: PathBuf::from("/"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            engine: get("SETUP_ENGINE").unwrap_or(defaults.engine),
            engine_package: get("SETUP_ENGINE_PACKAGE").unwrap_or(defaults.engine_package),
            log_dir: get("SETUP_LOG_DIR").map(PathBuf::from),
            host_root: get("SETUP_HOST_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.host_root),
        }
    }

    /// Directory that receives permanent logs
    pub fn log_dir_or(&self, cwd: &Path) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| cwd.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine, "ansible-playbook");
        assert_eq!(settings.host_root, PathBuf::from("/"));
    }

    #[test]
    fn test_settings_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("SETUP_ENGINE", "/opt/bin/ansible-playbook"),
            ("SETUP_LOG_DIR", "/var/log/tower"),
            ("SETUP_HOST_ROOT", "/mnt/sysroot"),
        ]));
        assert_eq!(settings.engine, "/opt/bin/ansible-playbook");
        assert_eq!(settings.engine_package, "ansible");
        assert_eq!(settings.log_dir_or(Path::new("/tmp")), PathBuf::from("/var/log/tower"));
        assert_eq!(settings.host_root, PathBuf::from("/mnt/sysroot"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings = Settings::from_lookup(lookup_from(&[("SETUP_ENGINE", "  "), ("SETUP_LOG_DIR", "")]));
        assert_eq!(settings.engine, DEFAULT_ENGINE);
        assert_eq!(settings.log_dir_or(Path::new("/work")), PathBuf::from("/work"));
    }

    #[test]
    fn test_bundle_install_flag() {
        let config = SetupConfig::new(
            PathBuf::from("/srv/inventory"),
            vec![ExtraVar::new("a=1"), ExtraVar::new("bundle_install=true")],
            vec![],
            OperationMode::Install,
        );
        assert!(config.bundle_install);

        let config = SetupConfig::new(
            PathBuf::from("/srv/inventory"),
            vec![ExtraVar::new("a=1")],
            vec![],
            OperationMode::Backup,
        );
        assert!(!config.bundle_install);
        assert_eq!(config.playbook(), "backup.yml");
        assert_eq!(config.log_name(), "backup.log");
    }
}
