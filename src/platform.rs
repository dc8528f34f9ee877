//! Platform profile value objects
//!
//! One static table entry per supported platform family. The planner never
//! branches on a family string directly; it reads the profile fields.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Supported platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformFamily {
    /// Debian and Ubuntu
    Debian,
    /// RHEL, CentOS, Amazon Linux
    RhelLike,
}

impl PlatformFamily {
    /// Get a human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformFamily::Debian => "debian",
            PlatformFamily::RhelLike => "rhel-like",
        }
    }
}

impl FromStr for PlatformFamily {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debian" => Ok(PlatformFamily::Debian),
            "rhel-like" | "rhel" => Ok(PlatformFamily::RhelLike),
            other => Err(DriverError::UnsupportedPlatform {
                family: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static description of how one platform family runs the webserver
///
/// Constructed once from the table below; never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Family this profile belongs to
    pub family: PlatformFamily,
    /// Packages that provide the webserver, in install order
    pub packages: &'static [&'static str],
    /// Root of the webserver configuration tree
    pub config_dir: &'static str,
    /// Service unit name
    pub service_name: &'static str,
    /// Whether modules are enabled dynamically (a2enmod) rather than
    /// compiled in / configured statically
    pub dynamic_module_enable: bool,
}

const DEBIAN: PlatformProfile = PlatformProfile {
    family: PlatformFamily::Debian,
    packages: &["apache2"],
    config_dir: "/etc/apache2",
    service_name: "apache2",
    dynamic_module_enable: true,
};

const RHEL_LIKE: PlatformProfile = PlatformProfile {
    family: PlatformFamily::RhelLike,
    packages: &["httpd24", "mod24_ssl"],
    config_dir: "/etc/httpd",
    service_name: "httpd",
    dynamic_module_enable: false,
};

impl PlatformProfile {
    /// Look up the profile for a family; total over the enum
    pub fn resolve(family: PlatformFamily) -> &'static PlatformProfile {
        match family {
            PlatformFamily::Debian => &DEBIAN,
            PlatformFamily::RhelLike => &RHEL_LIKE,
        }
    }

    /// Parse a family string and resolve it in one step
    pub fn resolve_str(family: &str) -> DriverResult<&'static PlatformProfile> {
        Ok(Self::resolve(family.parse()?))
    }

    /// Directory holding available site configs
    pub fn sites_available(&self) -> PathBuf {
        PathBuf::from(self.config_dir).join("sites-available")
    }

    /// Directory holding enabled site configs
    pub fn sites_enabled(&self) -> PathBuf {
        PathBuf::from(self.config_dir).join("sites-enabled")
    }

    /// Directory holding per-application SSL material
    pub fn ssl_dir(&self) -> PathBuf {
        PathBuf::from(self.config_dir).join("ssl")
    }

    /// Main server configuration file
    pub fn main_config(&self) -> PathBuf {
        PathBuf::from(self.config_dir).join("conf").join("httpd.conf")
    }
}
