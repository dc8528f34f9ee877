//! Action execution
//!
//! The planner decides, executors apply. `Executor::execute` returns whether
//! host state actually changed; a true idempotent no-op must report `false`,
//! because that bit is what gates the deferred reload notifications.

pub mod host;
pub mod service;

use crate::action::Action;
use crate::error::DriverResult;

pub use host::HostExecutor;
pub use service::{ServiceController, SystemdController};

/// Applies actions to the host
pub trait Executor {
    /// Apply one action; `Ok(true)` when host state changed
    fn execute(&mut self, action: &Action) -> DriverResult<bool>;
}

/// Outcome of a shell command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stderr: String,
}

/// Shell-out seam so tests never spawn real package managers
pub trait CommandRunner {
    /// Run a command for effect
    fn run(&mut self, command: &str) -> DriverResult<CommandOutput>;

    /// Run a side-effect-free guard query; `true` when the guard holds
    fn check(&mut self, command: &str) -> DriverResult<bool>;
}

/// Runs commands through `sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str) -> DriverResult<CommandOutput> {
        let output = std::process::Command::new("sh")
            .args(["-c", command])
            .output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn check(&mut self, command: &str) -> DriverResult<bool> {
        let output = std::process::Command::new("sh")
            .args(["-c", command])
            .output()?;
        Ok(output.status.success())
    }
}
