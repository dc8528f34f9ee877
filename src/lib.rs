//! Sitewright - webserver host convergence driver
//!
//! Sitewright converges a host's webserver (Apache family) to serve one
//! deployed application: package set, loaded modules, filesystem layout, SSL
//! material and generated site configuration. A deployment orchestrator
//! invokes it at lifecycle points (setup, configure, before-deploy, deploy,
//! before-undeploy, undeploy); every run is idempotent and the service is
//! only reloaded when something actually changed.

pub mod action;
pub mod catalog;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod lifecycle;
pub mod notify;
pub mod planner;
pub mod platform;
pub mod settings;
pub mod state;

// Re-exports for convenience
pub use action::{Action, NotifySet, Plan, PlannedAction};
pub use catalog::{AppserverBinding, AppserverCatalog, SiteTemplate, StaticCatalog};
pub use config::{Application, Manifest, SettingsSource, SslMaterial};
pub use error::{DriverError, DriverResult};
pub use exec::{CommandRunner, Executor, HostExecutor, ServiceController, SystemdController};
pub use fs::{FileSystem, LocalFs};
pub use lifecycle::{DriverOptions, LifecycleDriver, Phase, PhaseOutcome};
pub use notify::{Direction, NotificationAggregator, PendingNotification, Timing};
pub use planner::{plan, PlanContext};
pub use platform::{PlatformFamily, PlatformProfile};
pub use settings::{assemble, RawSettings, ResolvedSettings};
pub use state::{DriverState, StateStore};
