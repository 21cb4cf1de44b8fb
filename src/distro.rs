//! Linux distribution detection
//!
//! Detection runs a fixed chain of probes over files under a host root
//! (`/` in production). The first probe that recognises the system wins.
//! Only the RHEL family and Fedora get special treatment by the installer, so
//! everything else collapses into `Distribution::Other`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Distribution families the engine installer knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Distribution {
    Rhel,
    CentOs,
    OracleLinux,
    Fedora,
    /// Any other id, including `unknown` when no probe matched
    Other(String),
}

pub const UNKNOWN_ID: &str = "unknown";

impl Distribution {
    /// Map an os-release style id to a distribution.
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "rhel" => Self::Rhel,
            "centos" => Self::CentOs,
            "ol" => Self::OracleLinux,
            "fedora" => Self::Fedora,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Rhel => "rhel",
            Self::CentOs => "centos",
            Self::OracleLinux => "ol",
            Self::Fedora => "fedora",
            Self::Other(id) => id,
        }
    }

    /// RHEL and its rebuilds, which need EPEL for the engine on 6 and 7.
    pub fn is_rhel_family(&self) -> bool {
        matches!(self, Self::Rhel | Self::CentOs | Self::OracleLinux)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One step of the detection chain.
pub trait DistroProbe {
    /// Distribution id if this probe recognises the system under `root`
    fn probe(&self, root: &Path) -> Option<String>;
}

/// `ID=` field of `/etc/os-release`
pub struct OsReleaseProbe;

impl DistroProbe for OsReleaseProbe {
    fn probe(&self, root: &Path) -> Option<String> {
        let content = fs::read_to_string(host_path(root, "etc/os-release")).ok()?;
        parse_os_release_id(&content)
    }
}

/// Presence of a release marker file implies a fixed id
pub struct MarkerFileProbe {
    pub file: &'static str,
    pub id: &'static str,
}

impl DistroProbe for MarkerFileProbe {
    fn probe(&self, root: &Path) -> Option<String> {
        host_path(root, self.file)
            .exists()
            .then(|| self.id.to_string())
    }
}

/// First line of `/etc/redhat-release` matched against known product names
pub struct RedhatReleaseProbe;

impl DistroProbe for RedhatReleaseProbe {
    fn probe(&self, root: &Path) -> Option<String> {
        let content = fs::read_to_string(host_path(root, "etc/redhat-release")).ok()?;
        let first = content.lines().next()?.trim_start();

        let id = if first.starts_with("Red Hat Enterprise Linux") {
            "rhel"
        } else if first.starts_with("CentOS") {
            "centos"
        } else if first.starts_with("Fedora") {
            "fedora"
        } else {
            return None;
        };
        Some(id.to_string())
    }
}

/// Files that may carry the release number, in lookup order
const RELEASE_FILES: &[&str] = &[
    "etc/system-release",
    "etc/centos-release",
    "etc/fedora-release",
    "etc/redhat-release",
];

/// Detection result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroInfo {
    pub distribution: Distribution,
    /// Major release, only read for the RHEL family
    pub major_version: Option<u32>,
}

/// Runs the probe chain against a host root.
pub struct DistroDetector {
    root: PathBuf,
    probes: Vec<Box<dyn DistroProbe>>,
}

impl DistroDetector {
    /// Detector with the standard probe order
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_probes(
            root,
            vec![
                Box::new(OsReleaseProbe),
                Box::new(MarkerFileProbe {
                    file: "etc/centos-release",
                    id: "centos",
                }),
                Box::new(MarkerFileProbe {
                    file: "etc/fedora-release",
                    id: "fedora",
                }),
                Box::new(RedhatReleaseProbe),
            ],
        )
    }

    pub fn with_probes(root: impl Into<PathBuf>, probes: Vec<Box<dyn DistroProbe>>) -> Self {
        Self {
            root: root.into(),
            probes,
        }
    }

    pub fn distribution(&self) -> Distribution {
        let id = self
            .probes
            .iter()
            .find_map(|probe| probe.probe(&self.root))
            .unwrap_or_else(|| UNKNOWN_ID.to_string());
        Distribution::from_id(&id)
    }

    /// Major release number from the first existing release file.
    ///
    /// Only the first existing file is consulted; an unparseable one yields `None`.
    pub fn major_version(&self) -> Option<u32> {
        let path = RELEASE_FILES
            .iter()
            .map(|file| host_path(&self.root, file))
            .find(|path| path.exists())?;

        match fs::read_to_string(&path) {
            Ok(content) => parse_release_major(&content),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn detect(&self) -> DistroInfo {
        let distribution = self.distribution();
        let major_version = if distribution.is_rhel_family() {
            self.major_version()
        } else {
            None
        };

        tracing::info!(
            "Detected distribution: {} (major version {:?})",
            distribution,
            major_version
        );

        DistroInfo {
            distribution,
            major_version,
        }
    }
}

fn host_path(root: &Path, relative: &str) -> PathBuf {
    root.join(relative)
}

/// `ID` value from os-release content, quotes stripped
pub fn parse_os_release_id(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|id| !id.is_empty())
}

/// First run of digits following the word `release`.
///
/// `"CentOS Linux release 7.9.2009 (Core)"` yields 7.
pub fn parse_release_major(content: &str) -> Option<u32> {
    let first = content.lines().next()?;
    let (_, rest) = first.split_once(" release ")?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
