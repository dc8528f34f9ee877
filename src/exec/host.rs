//! Host executor
//!
//! Applies planned actions through the FileSystem and CommandRunner seams.
//! Change detection rules:
//! - packages: installed-query before install
//! - modules: a2query before a2enmod
//! - files: SHA-256 content compare before write
//! - deletes: absence is a successful no-op
//! - commands: `skip_if` guard decides

use tracing::debug;

use crate::action::Action;
use crate::error::{DriverError, DriverResult};
use crate::exec::{CommandRunner, Executor};
use crate::fs::{hash_content, FileSystem};
use crate::platform::{PlatformFamily, PlatformProfile};

/// Executor backed by the real host (or mock seams in tests)
pub struct HostExecutor<FS: FileSystem, R: CommandRunner> {
    fs: FS,
    runner: R,
    profile: &'static PlatformProfile,
}

impl<FS: FileSystem, R: CommandRunner> HostExecutor<FS, R> {
    pub fn new(fs: FS, runner: R, profile: &'static PlatformProfile) -> Self {
        Self {
            fs,
            runner,
            profile,
        }
    }

    fn install_package(&mut self, name: &str, version: Option<&str>) -> DriverResult<bool> {
        let (query, install) = match self.profile.family {
            PlatformFamily::Debian => (
                format!("dpkg -s {name} > /dev/null 2>&1"),
                match version {
                    Some(ver) => format!(
                        "DEBIAN_FRONTEND=noninteractive apt-get install -y {name}={ver}"
                    ),
                    None => format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {name}"),
                },
            ),
            PlatformFamily::RhelLike => (
                format!("rpm -q {name} > /dev/null 2>&1"),
                match version {
                    Some(ver) => format!("yum install -y {name}-{ver}"),
                    None => format!("yum install -y {name}"),
                },
            ),
        };

        if self.runner.check(&query)? {
            return Ok(false);
        }
        self.run_for_effect(&format!("package[{name}]"), &install)?;
        Ok(true)
    }

    fn enable_module(&mut self, name: &str) -> DriverResult<bool> {
        if self.runner.check(&format!("a2query -m {name}"))? {
            return Ok(false);
        }
        self.run_for_effect(&format!("module[{name}]"), &format!("a2enmod {name}"))?;
        Ok(true)
    }

    fn ensure_directory(&mut self, path: &std::path::Path, mode: u32) -> DriverResult<bool> {
        if self.fs.is_dir(path) {
            return Ok(false);
        }
        self.fs.create_dir_all(path)?;
        self.fs.set_mode(path, mode)?;
        Ok(true)
    }

    fn write_file(&mut self, path: &std::path::Path, content: &str, mode: u32) -> DriverResult<bool> {
        if self.fs.exists(path) {
            if self.fs.hash_file(path)? == hash_content(content) {
                return Ok(false);
            }
            if let Ok(current) = self.fs.read_to_string(path) {
                let diff = similar::TextDiff::from_lines(current.as_str(), content)
                    .unified_diff()
                    .header("current", "planned")
                    .to_string();
                debug!(path = %path.display(), "replacing file content\n{diff}");
            }
        }
        self.fs.write_atomic(path, content)?;
        self.fs.set_mode(path, mode)?;
        Ok(true)
    }

    fn delete_file(&mut self, path: &std::path::Path) -> DriverResult<bool> {
        if !self.fs.exists(path) {
            return Ok(false);
        }
        self.fs.remove_file(path)?;
        Ok(true)
    }

    fn run_command(&mut self, command: &str, skip_if: Option<&str>) -> DriverResult<bool> {
        if let Some(guard) = skip_if {
            if self.runner.check(guard)? {
                return Ok(false);
            }
        }
        self.run_for_effect(&format!("execute[{command}]"), command)?;
        Ok(true)
    }

    fn run_for_effect(&mut self, action: &str, command: &str) -> DriverResult<()> {
        let output = self.runner.run(command)?;
        if output.success {
            Ok(())
        } else {
            Err(DriverError::ActionFailed {
                action: action.to_string(),
                cause: if output.stderr.is_empty() {
                    "command exited with a failure status".to_string()
                } else {
                    output.stderr
                },
            })
        }
    }
}

impl<FS: FileSystem, R: CommandRunner> Executor for HostExecutor<FS, R> {
    fn execute(&mut self, action: &Action) -> DriverResult<bool> {
        let changed = match action {
            Action::InstallPackage { name, version } => {
                self.install_package(name, version.as_deref())?
            }
            Action::EnableModule { name } => self.enable_module(name)?,
            Action::EnsureDirectory { path, mode } => self.ensure_directory(path, *mode)?,
            Action::WriteFile {
                path,
                content,
                mode,
            } => self.write_file(path, content, *mode)?,
            Action::DeleteFile { path } => self.delete_file(path)?,
            Action::RunCommand { command, skip_if } => {
                self.run_command(command, skip_if.as_deref())?
            }
        };
        debug!(%action, changed, "applied");
        Ok(changed)
    }
}
