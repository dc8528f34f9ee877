//! Filesystem abstraction
//!
//! Narrow interface the executor and planner use for host file state, so
//! tests can run against an in-memory implementation. `LocalFs` is the real
//! thing: atomic writes via temp-file-then-rename, SHA-256 content hashes
//! for change detection.

use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::DriverResult;

/// Abstract host filesystem interface
pub trait FileSystem {
    /// Read file content
    fn read_to_string(&self, path: &Path) -> DriverResult<String>;

    /// Write file content atomically, creating parent directories
    fn write_atomic(&self, path: &Path, content: &str) -> DriverResult<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path exists and is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and parents
    fn create_dir_all(&self, path: &Path) -> DriverResult<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> DriverResult<()>;

    /// Compute SHA-256 hash of file content
    fn hash_file(&self, path: &Path) -> DriverResult<String>;

    /// Set permission bits on an existing path
    fn set_mode(&self, path: &Path, mode: u32) -> DriverResult<()>;
}

/// Compute the SHA-256 hash of in-memory content
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// Real host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn read_to_string(&self, path: &Path) -> DriverResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> DriverResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> DriverResult<()> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn remove_file(&self, path: &Path) -> DriverResult<()> {
        Ok(std::fs::remove_file(path)?)
    }

    fn hash_file(&self, path: &Path) -> DriverResult<String> {
        Ok(hash_content(&std::fs::read_to_string(path)?))
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> DriverResult<()> {
        use std::os::unix::fs::PermissionsExt;
        Ok(std::fs::set_permissions(
            path,
            std::fs::Permissions::from_mode(mode),
        )?)
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> DriverResult<()> {
        Ok(())
    }
}

/// In-memory filesystem for unit tests
///
/// Uses `Arc<Mutex<>>` internally so it can be cloned and shared.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockFileSystem {
    inner: std::sync::Arc<std::sync::Mutex<MockState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    files: std::collections::HashMap<PathBuf, String>,
    dirs: std::collections::HashSet<PathBuf>,
    modes: std::collections::HashMap<PathBuf, u32>,
}

#[cfg(test)]
impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let mut state = self.inner.lock().unwrap();
        state.files.insert(path.into(), content.into());
    }

    pub fn insert_dir(&self, path: impl Into<PathBuf>) {
        let mut state = self.inner.lock().unwrap();
        state.dirs.insert(path.into());
    }

    pub fn mode_of(&self, path: &Path) -> Option<u32> {
        self.inner.lock().unwrap().modes.get(path).copied()
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> DriverResult<String> {
        let state = self.inner.lock().unwrap();
        state.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found").into()
        })
    }

    fn write_atomic(&self, path: &Path, content: &str) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        if let Some(parent) = path.parent() {
            state.dirs.insert(parent.to_path_buf());
        }
        state.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.inner.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        state.files.remove(path).map(|_| ()).ok_or_else(|| {
            crate::error::DriverError::from(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file not found",
            ))
        })
    }

    fn hash_file(&self, path: &Path) -> DriverResult<String> {
        Ok(hash_content(&self.read_to_string(path)?))
    }

    fn set_mode(&self, path: &Path, mode: u32) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        state.modes.insert(path.to_path_buf(), mode);
        Ok(())
    }
}
