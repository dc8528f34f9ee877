//! Persisted lifecycle state
//!
//! The orchestrator invokes the driver once per phase, as separate
//! processes, so the phase state machine lives in a small TOML file. An
//! exclusive advisory lock is held for the duration of a phase run so two
//! concurrent invocations cannot interleave.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Lifecycle position of the managed application on this host
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    #[default]
    Uninitialized,
    SetupDone,
    Configured,
    DeployPending,
    Deployed,
    UndeployDone,
}

impl DriverState {
    /// Whether configure has completed for the current provisioning cycle
    pub fn has_configured(&self) -> bool {
        matches!(
            self,
            DriverState::Configured | DriverState::DeployPending | DriverState::Deployed
        )
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DriverState::Uninitialized => "uninitialized",
            DriverState::SetupDone => "setup_done",
            DriverState::Configured => "configured",
            DriverState::DeployPending => "deploy_pending",
            DriverState::Deployed => "deployed",
            DriverState::UndeployDone => "undeploy_done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    state: DriverState,
    updated_at: DateTime<Utc>,
}

/// Loads, saves and locks the state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

/// Exclusive lock on the state file, released on drop
pub struct StateLock {
    file: File,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl StateStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional store location for an application under a state directory
    pub fn for_application(state_dir: &Path, shortname: &str) -> Self {
        Self::new(state_dir.join(format!("{shortname}.state.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the exclusive phase lock
    pub fn lock(&self) -> DriverResult<StateLock> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.path.with_extension("lock"))?;
        file.lock_exclusive()?;
        Ok(StateLock { file })
    }

    /// Read the persisted state; a missing file means uninitialized
    pub fn load(&self) -> DriverResult<DriverState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DriverState::Uninitialized)
            }
            Err(e) => return Err(e.into()),
        };
        let parsed: StateFile = toml::from_str(&raw).map_err(|e| DriverError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(parsed.state)
    }

    /// Persist a new state with the current timestamp
    pub fn save(&self, state: DriverState) -> DriverResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StateFile {
            state,
            updated_at: Utc::now(),
        };
        let raw = toml::to_string_pretty(&file).map_err(|e| DriverError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(std::fs::write(&self.path, raw)?)
    }
}
