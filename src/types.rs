//! Typed values for a setup run
//!
//! `OperationMode` replaces the playbook/log-name pair the wrapper would
//! otherwise juggle as loose strings.

use strum::{Display, EnumIter, EnumString};

/// Which playbook a run executes. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Install,
    Backup,
    Restore,
    Rekey,
}

impl OperationMode {
    /// Playbook file handed to the automation engine
    pub fn playbook(self) -> &'static str {
        match self {
            Self::Install => "install.yml",
            Self::Backup => "backup.yml",
            Self::Restore => "restore.yml",
            Self::Rekey => "rekey.yml",
        }
    }

    /// Name of the transient log written in the working directory
    pub fn log_name(self) -> &'static str {
        match self {
            Self::Install => "setup.log",
            Self::Backup => "backup.log",
            Self::Restore => "restore.log",
            Self::Rekey => "rekey.log",
        }
    }

    /// Transient log name without its `.log` suffix
    pub fn log_stem(self) -> &'static str {
        let name = self.log_name();
        name.strip_suffix(".log").unwrap_or(name)
    }

    /// Backup, restore and rekey must run their handlers even after a failed task.
    pub fn forces_handlers(self) -> bool {
        !matches!(self, Self::Install)
    }
}

/// One `-e KEY=VALUE` token, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraVar(String);

/// Extra var key that requests the bundled (offline) install.
pub const BUNDLE_INSTALL_KEY: &str = "bundle_install";

impl ExtraVar {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Text before the first `=`, or the whole token when there is none
    pub fn key(&self) -> &str {
        self.0.split_once('=').map_or(self.0.as_str(), |(key, _)| key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_bundle_install(&self) -> bool {
        self.key() == BUNDLE_INSTALL_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mode_table() {
        assert_eq!(OperationMode::default(), OperationMode::Install);
        assert_eq!(OperationMode::Install.playbook(), "install.yml");
        assert_eq!(OperationMode::Backup.playbook(), "backup.yml");
        assert_eq!(OperationMode::Restore.log_name(), "restore.log");
        assert_eq!(OperationMode::Rekey.log_name(), "rekey.log");
        assert_eq!(OperationMode::Install.log_stem(), "setup");
    }

    #[test]
    fn test_only_install_skips_force_handlers() {
        for mode in OperationMode::iter() {
            assert_eq!(mode.forces_handlers(), mode != OperationMode::Install);
        }
    }

    #[test]
    fn test_mode_parse() {
        let mode: OperationMode = "rekey".parse().unwrap();
        assert_eq!(mode, OperationMode::Rekey);
        assert_eq!(OperationMode::Backup.to_string(), "backup");
    }

    #[test]
    fn test_extra_var_key() {
        let var = ExtraVar::new("admin_password=s3cr=t");
        assert_eq!(var.key(), "admin_password");
        assert_eq!(var.as_str(), "admin_password=s3cr=t");

        assert!(ExtraVar::new("bundle_install=false").is_bundle_install());
        assert!(!ExtraVar::new("bundle_install_path=/tmp").is_bundle_install());
        assert_eq!(ExtraVar::new("@vars.yml").key(), "@vars.yml");
    }
}
