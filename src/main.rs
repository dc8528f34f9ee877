//! Sitewright CLI - webserver host convergence driver
//!
//! Usage: sitewright <PHASE> [--manifest PATH]
//!
//! One invocation per lifecycle phase; the deployment orchestrator calls
//! setup, configure, before-deploy, deploy, before-undeploy and undeploy at
//! its own pace. Exits nonzero when the phase fails.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sitewright::{
    DriverOptions, HostExecutor, LifecycleDriver, LocalFs, Manifest, Phase, StateStore,
    StaticCatalog, SystemdController,
};

/// Sitewright - webserver host convergence driver
#[derive(Parser, Debug)]
#[command(name = "sitewright")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Lifecycle phase to run
    #[arg(value_enum)]
    phase: Phase,

    /// Path to the host manifest
    #[arg(short, long, default_value = "/etc/sitewright/manifest.toml")]
    manifest: PathBuf,

    /// Directory holding per-application lifecycle state
    #[arg(long, default_value = "/var/lib/sitewright")]
    state_dir: PathBuf,

    /// Plan only - show what would be done without touching the host
    #[arg(long)]
    dry_run: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let manifest = Manifest::load(&cli.manifest)
        .with_context(|| format!("loading manifest {}", cli.manifest.display()))?;

    let catalog = StaticCatalog::new(&manifest.appserver);
    let store = StateStore::for_application(&cli.state_dir, &manifest.application.shortname);
    let profile = sitewright::PlatformProfile::resolve(manifest.platform);

    let executor = HostExecutor::new(LocalFs::new(), sitewright::exec::ShellRunner::new(), profile);
    let services = SystemdController::new(sitewright::exec::ShellRunner::new());

    let mut driver = LifecycleDriver::new(
        &manifest,
        &catalog,
        LocalFs::new(),
        executor,
        services,
        store,
        DriverOptions {
            dry_run: cli.dry_run,
        },
    );

    let outcome = driver
        .run(cli.phase)
        .with_context(|| format!("phase {} failed", cli.phase))?;

    if cli.dry_run {
        println!(
            "{}: would apply {} action(s)",
            outcome.phase,
            outcome.planned.len()
        );
        for line in &outcome.planned {
            println!("  {line}");
        }
    } else {
        println!(
            "{}: {} action(s), {} changed, {} reload(s), state {}",
            outcome.phase,
            outcome.planned.len(),
            outcome.changed,
            outcome.reloaded.len(),
            outcome.state
        );
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "sitewright=info",
        1 => "sitewright=debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
