//! Host manifest loading
//!
//! The deployment orchestrator hands the driver one TOML manifest per host
//! describing the application, platform family, appserver adapter, SSL
//! material and per-field webserver overrides. Raw override/default tables
//! are kept as untyped JSON values; `settings::assemble` interprets them.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DriverError, DriverResult};
use crate::platform::PlatformFamily;
use crate::settings::RawSettings;

/// Identity of the deployed application
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Application {
    /// Short identifier used in file names and paths
    pub shortname: String,

    /// Domains served, primary first
    #[serde(default)]
    pub domains: Vec<String>,

    /// Deployment root; defaults to /srv/www/<shortname>
    #[serde(default)]
    pub deploy_dir: Option<PathBuf>,
}

impl Application {
    /// Primary domain (first declared), falling back to the shortname
    pub fn primary_domain(&self) -> &str {
        self.domains
            .first()
            .map(String::as_str)
            .unwrap_or(&self.shortname)
    }

    /// Domains other than the primary
    pub fn alias_domains(&self) -> &[String] {
        if self.domains.len() > 1 {
            &self.domains[1..]
        } else {
            &[]
        }
    }

    /// Effective deployment root
    pub fn deploy_root(&self) -> PathBuf {
        self.deploy_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/srv/www").join(&self.shortname))
    }
}

/// Appserver adapter declaration
#[derive(Debug, Clone, Deserialize)]
pub struct AppserverSection {
    /// Adapter name; adapters outside the supported registry leave the
    /// webserver unconfigured for the application (not an error)
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Pin for the passenger module package
    #[serde(default)]
    pub passenger_version: Option<String>,

    /// Remaining adapter parameters (listen port, socket path, app env)
    #[serde(flatten)]
    pub params: RawSettings,
}

impl Default for AppserverSection {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            passenger_version: None,
            params: RawSettings::new(),
        }
    }
}

fn default_adapter() -> String {
    "null".to_string()
}

/// Webserver tuning section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebserverSection {
    /// Files to remove from sites-enabled (distribution default sites)
    #[serde(default)]
    pub remove_default_sites: Vec<String>,

    /// Platform-level defaults map
    #[serde(default)]
    pub defaults: RawSettings,

    /// Per-application overrides map
    #[serde(default)]
    pub overrides: RawSettings,
}

/// SSL material supplied for the application
///
/// Every item is optional; absent items are skipped, never errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslMaterial {
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default)]
    pub certificate: Option<String>,

    #[serde(default)]
    pub chain: Option<String>,

    #[serde(default)]
    pub dhparams: Option<String>,
}

impl SslMaterial {
    /// SSL vhost generation needs at least a key pair
    pub fn enabled(&self) -> bool {
        self.private_key.is_some() && self.certificate.is_some()
    }
}

/// Raw key/value providers consumed by `settings::assemble`
pub trait SettingsSource {
    /// Platform-level defaults map
    fn defaults_for(&self, family: PlatformFamily) -> RawSettings;

    /// Per-application overrides map
    fn overrides_for(&self, app: &Application) -> RawSettings;
}

/// One host manifest
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Platform family of the host
    pub platform: PlatformFamily,

    /// Application served by this host
    pub application: Application,

    #[serde(default)]
    pub appserver: AppserverSection,

    #[serde(default)]
    pub webserver: WebserverSection,

    #[serde(default)]
    pub ssl: SslMaterial,
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> DriverResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| DriverError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&raw).map_err(|message| DriverError::Manifest {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse manifest TOML
    pub fn parse(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }
}

impl SettingsSource for Manifest {
    fn defaults_for(&self, _family: PlatformFamily) -> RawSettings {
        self.webserver.defaults.clone()
    }

    fn overrides_for(&self, _app: &Application) -> RawSettings {
        self.webserver.overrides.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
platform = "debian"

[application]
shortname = "exampleapp"
domains = ["example.com", "www.example.com"]
"#;

    #[test]
    fn parse_minimal_manifest() {
        let manifest = Manifest::parse(MINIMAL).unwrap();
        assert_eq!(manifest.platform, PlatformFamily::Debian);
        assert_eq!(manifest.application.shortname, "exampleapp");
        assert_eq!(manifest.application.primary_domain(), "example.com");
        assert_eq!(
            manifest.application.alias_domains(),
            &["www.example.com".to_string()]
        );
        assert_eq!(manifest.appserver.adapter, "null");
        assert!(manifest.webserver.remove_default_sites.is_empty());
        assert!(!manifest.ssl.enabled());
    }

    #[test]
    fn parse_full_manifest() {
        let raw = r#"
platform = "rhel-like"

[application]
shortname = "shop"
domains = ["shop.example.com"]
deploy_dir = "/opt/shop"

[appserver]
adapter = "puma"
port = 3000

[webserver]
remove_default_sites = ["000-default.conf"]

[webserver.overrides]
keepalive_timeout = 30
extra_config_ssl = true

[ssl]
private_key = "KEY"
certificate = "CERT"
"#;
        let manifest = Manifest::parse(raw).unwrap();
        assert_eq!(manifest.platform, PlatformFamily::RhelLike);
        assert_eq!(manifest.application.deploy_root(), PathBuf::from("/opt/shop"));
        assert_eq!(manifest.appserver.adapter, "puma");
        assert_eq!(
            manifest.appserver.params.get("port").and_then(|v| v.as_u64()),
            Some(3000)
        );
        assert_eq!(manifest.webserver.remove_default_sites, ["000-default.conf"]);
        assert_eq!(
            manifest
                .webserver
                .overrides
                .get("extra_config_ssl")
                .and_then(|v| v.as_bool()),
            Some(true)
        );
        assert!(manifest.ssl.enabled());
        assert!(manifest.ssl.chain.is_none());
    }

    #[test]
    fn deploy_root_defaults_under_srv() {
        let manifest = Manifest::parse(MINIMAL).unwrap();
        assert_eq!(
            manifest.application.deploy_root(),
            PathBuf::from("/srv/www/exampleapp")
        );
    }

    #[test]
    fn primary_domain_falls_back_to_shortname() {
        let raw = r#"
platform = "debian"

[application]
shortname = "bare"
"#;
        let manifest = Manifest::parse(raw).unwrap();
        assert_eq!(manifest.application.primary_domain(), "bare");
    }

    #[test]
    fn load_missing_file_is_manifest_error() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.toml")).unwrap_err();
        assert!(matches!(err, DriverError::Manifest { .. }));
    }
}
