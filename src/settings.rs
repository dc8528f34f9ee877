//! Settings assembly
//!
//! Pure merge of built-in defaults, the platform defaults map and the
//! per-application overrides map into one fully resolved record. No I/O;
//! identical inputs always produce an identical `ResolvedSettings`, which is
//! what makes re-planning a phase safe.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::config::Application;
use crate::error::{DriverError, DriverResult};
use crate::platform::PlatformProfile;

/// Raw key/value settings map as supplied by a `SettingsSource`
pub type RawSettings = serde_json::Map<String, Value>;

/// Fully resolved webserver settings for one application
///
/// Every field carries a value after assembly; there is no unresolved state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub keepalive_timeout: u32,
    pub limit_request_body: u64,
    pub proxy_timeout: u32,
    pub ssl_for_legacy_browsers: bool,
    pub extra_config: String,
    pub extra_config_ssl: String,
    pub port: u16,
    pub ssl_port: u16,
}

impl ResolvedSettings {
    /// Access log path for the application's primary domain
    pub fn access_log(&self, primary_domain: &str) -> PathBuf {
        self.log_dir.join(format!("{primary_domain}.access.log"))
    }

    /// Error log path for the application's primary domain
    pub fn error_log(&self, primary_domain: &str) -> PathBuf {
        self.log_dir.join(format!("{primary_domain}.error.log"))
    }
}

/// Built-in defaults applied when neither map supplies a field
mod defaults {
    pub const LOG_LEVEL: &str = "info";
    pub const KEEPALIVE_TIMEOUT: u32 = 15;
    pub const LIMIT_REQUEST_BODY: u64 = 1_048_576;
    pub const PROXY_TIMEOUT: u32 = 60;
    pub const PORT: u16 = 80;
    pub const SSL_PORT: u16 = 443;
}

/// Merge defaults and overrides into a `ResolvedSettings`
///
/// Precedence per field: overrides map, then defaults map, then built-in
/// default. `log_dir` consults only the overrides map before falling back to
/// `/var/log/<service>`. The raw `extra_config_ssl = true` sentinel resolves
/// to the value of `extra_config`.
pub fn assemble(
    app: &Application,
    platform_defaults: &RawSettings,
    overrides: &RawSettings,
    profile: &PlatformProfile,
) -> DriverResult<ResolvedSettings> {
    if app.shortname.trim().is_empty() {
        return Err(DriverError::MissingApplicationIdentity);
    }

    let lookup = |key: &str| overrides.get(key).or_else(|| platform_defaults.get(key));

    let extra_config = pick_string(lookup("extra_config"), "");
    let extra_config_ssl = match lookup("extra_config_ssl") {
        Some(Value::Bool(true)) => extra_config.clone(),
        other => pick_string(other, ""),
    };

    let log_dir = match overrides.get("log_dir").and_then(Value::as_str) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/var/log").join(profile.service_name),
    };

    Ok(ResolvedSettings {
        log_dir,
        log_level: pick_string(lookup("log_level"), defaults::LOG_LEVEL),
        keepalive_timeout: pick_u32(lookup("keepalive_timeout"), defaults::KEEPALIVE_TIMEOUT),
        limit_request_body: pick_u64(lookup("limit_request_body"), defaults::LIMIT_REQUEST_BODY),
        proxy_timeout: pick_u32(lookup("proxy_timeout"), defaults::PROXY_TIMEOUT),
        ssl_for_legacy_browsers: pick_bool(lookup("ssl_for_legacy_browsers"), false),
        extra_config,
        extra_config_ssl,
        port: pick_u16(lookup("port"), defaults::PORT),
        ssl_port: pick_u16(lookup("ssl_port"), defaults::SSL_PORT),
    })
}

fn pick_string(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn pick_bool(value: Option<&Value>, fallback: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(fallback)
}

fn pick_u64(value: Option<&Value>, fallback: u64) -> u64 {
    value.and_then(Value::as_u64).unwrap_or(fallback)
}

fn pick_u32(value: Option<&Value>, fallback: u32) -> u32 {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(fallback)
}

fn pick_u16(value: Option<&Value>, fallback: u16) -> u16 {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(fallback)
}
