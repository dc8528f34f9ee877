//! Shared fixtures for integration tests
//!
//! `MemFs` is an in-memory FileSystem, `SimExecutor` applies actions against
//! a simulated host (package set, module set, shared MemFs, guarded command
//! markers) and `RecordingController` captures service calls. Handles are
//! `Arc`-shared so tests can keep a clone while the driver owns the other.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sitewright::fs::hash_content;
use sitewright::{
    Action, DriverResult, Executor, FileSystem, Manifest, ServiceController,
};

#[derive(Clone, Default)]
pub struct MemFs {
    inner: Arc<Mutex<MemState>>,
}

#[derive(Default)]
struct MemState {
    files: HashMap<PathBuf, String>,
    dirs: HashSet<PathBuf>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(path.into(), content.into());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(Path::new(path))
            .cloned()
    }
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> DriverResult<String> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
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
        self.inner.lock().unwrap().dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> DriverResult<()> {
        self.inner
            .lock()
            .unwrap()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found").into()
            })
    }

    fn hash_file(&self, path: &Path) -> DriverResult<String> {
        Ok(hash_content(&self.read_to_string(path)?))
    }

    fn set_mode(&self, _path: &Path, _mode: u32) -> DriverResult<()> {
        Ok(())
    }
}

/// Executor against a simulated host
#[derive(Clone)]
pub struct SimExecutor {
    fs: MemFs,
    inner: Arc<Mutex<SimState>>,
}

#[derive(Default)]
struct SimState {
    packages: HashSet<String>,
    modules: HashSet<String>,
    commands: HashSet<String>,
}

impl SimExecutor {
    pub fn new(fs: MemFs) -> Self {
        Self {
            fs,
            inner: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn installed_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> =
            self.inner.lock().unwrap().packages.iter().cloned().collect();
        packages.sort();
        packages
    }

    pub fn enabled_modules(&self) -> usize {
        self.inner.lock().unwrap().modules.len()
    }
}

impl Executor for SimExecutor {
    fn execute(&mut self, action: &Action) -> DriverResult<bool> {
        let changed = match action {
            Action::InstallPackage { name, .. } => {
                self.inner.lock().unwrap().packages.insert(name.clone())
            }
            Action::EnableModule { name } => {
                self.inner.lock().unwrap().modules.insert(name.clone())
            }
            Action::EnsureDirectory { path, .. } => {
                if self.fs.is_dir(path) {
                    false
                } else {
                    self.fs.create_dir_all(path)?;
                    true
                }
            }
            Action::WriteFile { path, content, .. } => {
                if self.fs.exists(path) && self.fs.hash_file(path)? == hash_content(content) {
                    false
                } else {
                    self.fs.write_atomic(path, content)?;
                    true
                }
            }
            Action::DeleteFile { path } => {
                if self.fs.exists(path) {
                    self.fs.remove_file(path)?;
                    true
                } else {
                    false
                }
            }
            Action::RunCommand { command, .. } => {
                self.inner.lock().unwrap().commands.insert(command.clone())
            }
        };
        Ok(changed)
    }
}

/// Records every service call in order
#[derive(Clone, Default)]
pub struct RecordingController {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("reload"))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl ServiceController for RecordingController {
    fn define(&mut self, service: &str) -> DriverResult<()> {
        self.calls.lock().unwrap().push(format!("define {service}"));
        Ok(())
    }

    fn start(&mut self, service: &str) -> DriverResult<()> {
        self.calls.lock().unwrap().push(format!("start {service}"));
        Ok(())
    }

    fn reload(&mut self, service: &str) -> DriverResult<()> {
        self.calls.lock().unwrap().push(format!("reload {service}"));
        Ok(())
    }
}

/// Manifest for a puma-backed application with one default site to remove
pub fn manifest(platform: &str) -> Manifest {
    manifest_with_adapter(platform, "puma")
}

pub fn manifest_with_adapter(platform: &str, adapter: &str) -> Manifest {
    let raw = format!(
        r#"
platform = "{platform}"

[application]
shortname = "exampleapp"
domains = ["example.com", "www.example.com"]

[appserver]
adapter = "{adapter}"
port = 3000

[webserver]
remove_default_sites = ["000-default.conf"]
"#
    );
    Manifest::parse(&raw).unwrap()
}
