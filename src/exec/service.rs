//! Service control
//!
//! `define` registers the service target for the current run so later reload
//! notifications have something to land on; it never touches the host.
//! `start` and `reload` do, through the CommandRunner seam.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{DriverError, DriverResult};
use crate::exec::CommandRunner;

/// Controls the platform's webserver service
pub trait ServiceController {
    /// Register the service target for this run
    fn define(&mut self, service: &str) -> DriverResult<()>;

    /// Start the service if it is not running
    fn start(&mut self, service: &str) -> DriverResult<()>;

    /// Reload the service configuration
    fn reload(&mut self, service: &str) -> DriverResult<()>;
}

/// systemd-backed controller
pub struct SystemdController<R: CommandRunner> {
    runner: R,
    defined: HashSet<String>,
}

impl<R: CommandRunner> SystemdController<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            defined: HashSet::new(),
        }
    }

    fn run_unit_command(&mut self, verb: &str, service: &str) -> DriverResult<()> {
        let output = self.runner.run(&format!("systemctl {verb} {service}"))?;
        if output.success {
            Ok(())
        } else {
            Err(DriverError::ActionFailed {
                action: format!("service[{service}] {verb}"),
                cause: if output.stderr.is_empty() {
                    "command exited with a failure status".to_string()
                } else {
                    output.stderr
                },
            })
        }
    }
}

impl<R: CommandRunner> ServiceController for SystemdController<R> {
    fn define(&mut self, service: &str) -> DriverResult<()> {
        if self.defined.insert(service.to_string()) {
            debug!(service, "service target defined");
        }
        Ok(())
    }

    fn start(&mut self, service: &str) -> DriverResult<()> {
        if self
            .runner
            .check(&format!("systemctl is-active --quiet {service}"))?
        {
            return Ok(());
        }
        self.run_unit_command("start", service)
    }

    fn reload(&mut self, service: &str) -> DriverResult<()> {
        if !self.defined.contains(service) {
            warn!(service, "reload requested for an undefined service target");
        }
        self.run_unit_command("reload", service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRunner {
        checks: HashMap<String, bool>,
        ran: Vec<String>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&mut self, command: &str) -> DriverResult<CommandOutput> {
            self.ran.push(command.to_string());
            Ok(CommandOutput {
                success: true,
                stderr: String::new(),
            })
        }

        fn check(&mut self, command: &str) -> DriverResult<bool> {
            Ok(self.checks.get(command).copied().unwrap_or(false))
        }
    }

    #[test]
    fn define_does_not_touch_the_host() {
        let mut controller = SystemdController::new(FakeRunner::default());
        controller.define("apache2").unwrap();
        controller.define("apache2").unwrap();
        assert!(controller.runner.ran.is_empty());
    }

    #[test]
    fn start_skips_active_service() {
        let mut runner = FakeRunner::default();
        runner
            .checks
            .insert("systemctl is-active --quiet apache2".to_string(), true);
        let mut controller = SystemdController::new(runner);
        controller.start("apache2").unwrap();
        assert!(controller.runner.ran.is_empty());
    }

    #[test]
    fn start_starts_inactive_service() {
        let mut controller = SystemdController::new(FakeRunner::default());
        controller.start("httpd").unwrap();
        assert_eq!(controller.runner.ran, vec!["systemctl start httpd"]);
    }

    #[test]
    fn reload_invokes_systemctl() {
        let mut controller = SystemdController::new(FakeRunner::default());
        controller.define("apache2").unwrap();
        controller.reload("apache2").unwrap();
        assert_eq!(controller.runner.ran, vec!["systemctl reload apache2"]);
    }
}
