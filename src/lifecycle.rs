//! Lifecycle driver
//!
//! Orchestrates one phase invocation: lock state, check the phase
//! precondition, resolve settings, plan, execute, dispatch coalesced
//! reloads, persist the state transition. Single-threaded and synchronous;
//! the first action failure aborts the phase.

use clap::ValueEnum;
use tracing::{debug, info};

use crate::catalog::AppserverCatalog;
use crate::config::{Manifest, SettingsSource};
use crate::error::{DriverError, DriverResult};
use crate::exec::{Executor, ServiceController};
use crate::fs::FileSystem;
use crate::notify::{Direction, NotificationAggregator};
use crate::planner::{self, PlanContext};
use crate::platform::PlatformProfile;
use crate::settings::assemble;
use crate::state::{DriverState, StateStore};

/// Lifecycle entry points, in orchestrator invocation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Phase {
    Setup,
    Configure,
    BeforeDeploy,
    Deploy,
    BeforeUndeploy,
    Undeploy,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Configure => "configure",
            Phase::BeforeDeploy => "before_deploy",
            Phase::Deploy => "deploy",
            Phase::BeforeUndeploy => "before_undeploy",
            Phase::Undeploy => "undeploy",
        }
    }

    /// Which reload direction the phase serves; setup precedes the first
    /// deploy and serves neither
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Phase::Setup => None,
            Phase::Configure | Phase::BeforeDeploy | Phase::Deploy => Some(Direction::Deploy),
            Phase::BeforeUndeploy | Phase::Undeploy => Some(Direction::Undeploy),
        }
    }

    /// Phases that (re-)register the service target before anything else
    pub fn defines_service(&self) -> bool {
        matches!(
            self,
            Phase::Setup | Phase::Configure | Phase::BeforeDeploy | Phase::BeforeUndeploy
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for a driver run
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverOptions {
    /// Plan only; no execution, no service calls, no state transition
    pub dry_run: bool,
}

/// What a phase run did
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub state: DriverState,
    pub planned: Vec<String>,
    pub changed: usize,
    pub reloaded: Vec<String>,
}

/// Drives lifecycle phases against one host manifest
pub struct LifecycleDriver<'a, FS, E, C>
where
    FS: FileSystem,
    E: Executor,
    C: ServiceController,
{
    manifest: &'a Manifest,
    profile: &'static PlatformProfile,
    catalog: &'a dyn AppserverCatalog,
    fs: FS,
    executor: E,
    services: C,
    store: StateStore,
    options: DriverOptions,
}

impl<'a, FS, E, C> LifecycleDriver<'a, FS, E, C>
where
    FS: FileSystem,
    E: Executor,
    C: ServiceController,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manifest: &'a Manifest,
        catalog: &'a dyn AppserverCatalog,
        fs: FS,
        executor: E,
        services: C,
        store: StateStore,
        options: DriverOptions,
    ) -> Self {
        Self {
            manifest,
            profile: PlatformProfile::resolve(manifest.platform),
            catalog,
            fs,
            executor,
            services,
            store,
            options,
        }
    }

    /// Run one lifecycle phase to completion
    pub fn run(&mut self, phase: Phase) -> DriverResult<PhaseOutcome> {
        let _lock = self.store.lock()?;
        let current = self.store.load()?;
        let next = transition(phase, current)?;

        let app = &self.manifest.application;
        let defaults = self.manifest.defaults_for(self.manifest.platform);
        let overrides = self.manifest.overrides_for(app);
        let settings = assemble(app, &defaults, &overrides, self.profile)?;

        let ctx = PlanContext {
            app,
            profile: self.profile,
            settings: &settings,
            ssl: &self.manifest.ssl,
            remove_default_sites: &self.manifest.webserver.remove_default_sites,
            adapter: &self.manifest.appserver.adapter,
            passenger_version: self.manifest.appserver.passenger_version.as_deref(),
        };
        let plan = planner::plan(phase, &ctx, self.catalog, &self.fs)?;
        let planned = plan.summary();
        info!(phase = %phase, actions = plan.len(), "phase planned");

        if self.options.dry_run {
            for line in &planned {
                debug!(phase = %phase, "would apply {line}");
            }
            return Ok(PhaseOutcome {
                phase,
                state: current,
                planned,
                changed: 0,
                reloaded: Vec::new(),
            });
        }

        if phase.defines_service() {
            self.services.define(self.profile.service_name)?;
        }

        let mut aggregator = NotificationAggregator::for_service(self.profile.service_name);
        let mut changed = 0;
        for planned_action in plan.iter() {
            let did_change = self.executor.execute(&planned_action.action)?;
            if did_change {
                changed += 1;
            }
            aggregator.observe(planned_action, did_change, phase);
        }

        let mut reloaded = Vec::new();
        for notification in aggregator.flush() {
            self.services.reload(&notification.target)?;
            reloaded.push(notification.target);
        }

        if phase == Phase::Setup {
            self.services.start(self.profile.service_name)?;
        }

        self.store.save(next)?;
        info!(
            phase = %phase,
            state = %next,
            changed,
            reloaded = reloaded.len(),
            "phase complete"
        );

        Ok(PhaseOutcome {
            phase,
            state: next,
            planned,
            changed,
            reloaded,
        })
    }
}

/// Phase precondition check and resulting state
///
/// setup and configure are idempotent and repeatable; deploy-side and
/// undeploy-side phases require configure to have completed for the current
/// provisioning cycle.
fn transition(phase: Phase, current: DriverState) -> DriverResult<DriverState> {
    let not_configured = || DriverError::NotConfigured {
        phase: phase.as_str().to_string(),
    };
    match phase {
        Phase::Setup => Ok(if current == DriverState::Uninitialized {
            DriverState::SetupDone
        } else {
            current
        }),
        Phase::Configure => Ok(match current {
            DriverState::Uninitialized | DriverState::SetupDone | DriverState::UndeployDone => {
                DriverState::Configured
            }
            other => other,
        }),
        Phase::BeforeDeploy => {
            if current.has_configured() {
                Ok(DriverState::DeployPending)
            } else {
                Err(not_configured())
            }
        }
        Phase::Deploy => {
            if current.has_configured() {
                Ok(DriverState::Deployed)
            } else {
                Err(not_configured())
            }
        }
        Phase::BeforeUndeploy => {
            if current.has_configured() {
                Ok(current)
            } else {
                Err(not_configured())
            }
        }
        Phase::Undeploy => {
            if current.has_configured() {
                Ok(DriverState::UndeployDone)
            } else {
                Err(not_configured())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_directions() {
        assert_eq!(Phase::Setup.direction(), None);
        assert_eq!(Phase::Configure.direction(), Some(Direction::Deploy));
        assert_eq!(Phase::BeforeDeploy.direction(), Some(Direction::Deploy));
        assert_eq!(Phase::Deploy.direction(), Some(Direction::Deploy));
        assert_eq!(Phase::BeforeUndeploy.direction(), Some(Direction::Undeploy));
        assert_eq!(Phase::Undeploy.direction(), Some(Direction::Undeploy));
    }

    #[test]
    fn setup_transitions_only_from_uninitialized() {
        assert_eq!(
            transition(Phase::Setup, DriverState::Uninitialized).unwrap(),
            DriverState::SetupDone
        );
        assert_eq!(
            transition(Phase::Setup, DriverState::Deployed).unwrap(),
            DriverState::Deployed
        );
    }

    #[test]
    fn configure_is_repeatable() {
        assert_eq!(
            transition(Phase::Configure, DriverState::SetupDone).unwrap(),
            DriverState::Configured
        );
        assert_eq!(
            transition(Phase::Configure, DriverState::Configured).unwrap(),
            DriverState::Configured
        );
        assert_eq!(
            transition(Phase::Configure, DriverState::Deployed).unwrap(),
            DriverState::Deployed
        );
    }

    #[test]
    fn undeploy_done_requires_reconfigure() {
        assert_eq!(
            transition(Phase::Configure, DriverState::UndeployDone).unwrap(),
            DriverState::Configured
        );
        assert!(transition(Phase::Deploy, DriverState::UndeployDone).is_err());
    }

    #[test]
    fn deploy_before_configure_is_rejected() {
        for state in [DriverState::Uninitialized, DriverState::SetupDone] {
            let err = transition(Phase::Deploy, state).unwrap_err();
            assert!(matches!(err, DriverError::NotConfigured { .. }));
            let err = transition(Phase::BeforeDeploy, state).unwrap_err();
            assert!(matches!(err, DriverError::NotConfigured { .. }));
        }
    }

    #[test]
    fn deploy_cycle_alternates() {
        let state = transition(Phase::BeforeDeploy, DriverState::Configured).unwrap();
        assert_eq!(state, DriverState::DeployPending);
        let state = transition(Phase::Deploy, state).unwrap();
        assert_eq!(state, DriverState::Deployed);
        let state = transition(Phase::BeforeDeploy, state).unwrap();
        assert_eq!(state, DriverState::DeployPending);
        let state = transition(Phase::Deploy, state).unwrap();
        assert_eq!(state, DriverState::Deployed);
        let state = transition(Phase::BeforeUndeploy, state).unwrap();
        assert_eq!(state, DriverState::Deployed);
        let state = transition(Phase::Undeploy, state).unwrap();
        assert_eq!(state, DriverState::UndeployDone);
    }
}
