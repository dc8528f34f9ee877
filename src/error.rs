//! Error types for sitewright
//!
//! One `thiserror` enum for the whole driver; every variant is fatal to the
//! phase that raised it. Retry policy belongs to the invoking orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Main error type for driver operations
#[derive(Error, Debug)]
pub enum DriverError {
    /// Platform family string not in the supported table
    #[error("unsupported platform family '{family}'")]
    UnsupportedPlatform { family: String },

    /// Application declaration has no usable shortname
    #[error("application is missing a shortname")]
    MissingApplicationIdentity,

    /// Appserver adapter requires a platform we are not on
    #[error("appserver '{adapter}' is only supported on the debian platform family")]
    UnsupportedAppserverOnPlatform { adapter: String },

    /// An action could not be applied to the host
    #[error("{action} failed: {cause}")]
    ActionFailed { action: String, cause: String },

    /// A deploy-side phase ran before configure ever completed
    #[error("phase '{phase}' requires a completed configure run")]
    NotConfigured { phase: String },

    /// Host manifest could not be read or parsed
    #[error("invalid host manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// Lifecycle state file could not be read or parsed
    #[error("invalid state file {path}: {message}")]
    State { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
