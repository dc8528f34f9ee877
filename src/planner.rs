//! Phase planning
//!
//! Pure decision core: given the resolved settings, the platform profile and
//! the declared features, produce the ordered action plan for a lifecycle
//! phase. The only host state consulted at planning time is the existence
//! probe for the extra-config drop directory; everything else is decided at
//! execution time by the action guards.

use std::path::PathBuf;

use crate::action::{Action, NotifySet, Plan};
use crate::catalog::{render_site_config, AppserverCatalog, SiteContext};
use crate::config::{Application, SslMaterial};
use crate::error::{DriverError, DriverResult};
use crate::fs::FileSystem;
use crate::lifecycle::Phase;
use crate::platform::{PlatformFamily, PlatformProfile};
use crate::settings::ResolvedSettings;

/// Modules the generated site configs rely on; enabled in this order
pub const REQUIRED_MODULES: &[&str] = &[
    "expires",
    "headers",
    "lbmethod_byrequests",
    "proxy",
    "proxy_balancer",
    "proxy_http",
    "rewrite",
    "ssl",
];

/// Package providing the passenger module on debian
const PASSENGER_PACKAGE: &str = "libapache2-mod-passenger";

/// Inputs the planner needs for one phase
pub struct PlanContext<'a> {
    pub app: &'a Application,
    pub profile: &'static PlatformProfile,
    pub settings: &'a ResolvedSettings,
    pub ssl: &'a SslMaterial,
    pub remove_default_sites: &'a [String],
    pub adapter: &'a str,
    pub passenger_version: Option<&'a str>,
}

/// Produce the ordered action plan for a phase
///
/// `before_deploy`, `deploy`, `before_undeploy` and `undeploy` plan no
/// actions of their own; their work is service registration and the
/// notifications armed by earlier phases.
pub fn plan<FS: FileSystem>(
    phase: Phase,
    ctx: &PlanContext<'_>,
    catalog: &dyn AppserverCatalog,
    fs: &FS,
) -> DriverResult<Plan> {
    match phase {
        Phase::Setup => plan_setup(ctx),
        Phase::Configure => plan_configure(ctx, catalog, fs),
        Phase::BeforeDeploy | Phase::Deploy | Phase::BeforeUndeploy | Phase::Undeploy => {
            Ok(Plan::new())
        }
    }
}

fn plan_setup(ctx: &PlanContext<'_>) -> DriverResult<Plan> {
    let profile = ctx.profile;
    let mut plan = Plan::new();

    for package in profile.packages {
        plan.add(Action::InstallPackage {
            name: package.to_string(),
            version: None,
        });
    }

    if profile.dynamic_module_enable {
        for module in REQUIRED_MODULES {
            plan.add(Action::EnableModule {
                name: module.to_string(),
            });
        }
    }

    if ctx.adapter == "passenger" {
        if profile.family != PlatformFamily::Debian {
            return Err(DriverError::UnsupportedAppserverOnPlatform {
                adapter: ctx.adapter.to_string(),
            });
        }
        plan.add(Action::InstallPackage {
            name: PASSENGER_PACKAGE.to_string(),
            version: ctx.passenger_version.map(str::to_string),
        });
    }

    if !profile.dynamic_module_enable {
        plan.add(Action::EnsureDirectory {
            path: profile.sites_available(),
            mode: 0o755,
        });
        plan.add(Action::EnsureDirectory {
            path: profile.sites_enabled(),
            mode: 0o755,
        });

        // The stock httpd.conf has no sites-enabled include; append it once.
        let main_config = profile.main_config();
        let include = "IncludeOptional sites-enabled/*.conf";
        plan.add(Action::RunCommand {
            command: format!("echo \"{include}\" >> {}", main_config.display()),
            skip_if: Some(format!("grep -qF \"{include}\" {}", main_config.display())),
        });
    }

    Ok(plan)
}

fn plan_configure<FS: FileSystem>(
    ctx: &PlanContext<'_>,
    catalog: &dyn AppserverCatalog,
    fs: &FS,
) -> DriverResult<Plan> {
    let profile = ctx.profile;
    let shortname = &ctx.app.shortname;
    let mut plan = Plan::new();

    let ssl_dir = profile.ssl_dir();
    plan.add(Action::EnsureDirectory {
        path: ssl_dir.clone(),
        mode: 0o700,
    });
    if let Some(key) = &ctx.ssl.private_key {
        plan.add(Action::WriteFile {
            path: ssl_dir.join(format!("{shortname}.key")),
            content: key.clone(),
            mode: 0o600,
        });
    }
    if let Some(certificate) = &ctx.ssl.certificate {
        plan.add(Action::WriteFile {
            path: ssl_dir.join(format!("{shortname}.crt")),
            content: certificate.clone(),
            mode: 0o644,
        });
    }
    if let Some(chain) = &ctx.ssl.chain {
        plan.add(Action::WriteFile {
            path: ssl_dir.join(format!("{shortname}.chain.pem")),
            content: chain.clone(),
            mode: 0o644,
        });
    }
    if let Some(dhparams) = &ctx.ssl.dhparams {
        plan.add(Action::WriteFile {
            path: ssl_dir.join("dhparams.pem"),
            content: dhparams.clone(),
            mode: 0o600,
        });
    }

    for file in ctx.remove_default_sites {
        plan.add_notifying(
            Action::DeleteFile {
                path: profile.sites_enabled().join(file),
            },
            NotifySet::RELOAD,
        );
    }

    let binding = catalog.adapter_for(ctx.app);
    if !catalog.supports(&binding.adapter) {
        return Ok(plan);
    }

    let site_config = render_site_config(&SiteContext {
        app: ctx.app,
        settings: ctx.settings,
        profile,
        binding: &binding,
        ssl: ctx.ssl,
    });
    let site_path = profile.sites_available().join(format!("{shortname}.conf"));
    plan.add_notifying(
        Action::WriteFile {
            path: site_path,
            content: site_config,
            mode: 0o644,
        },
        NotifySet::RELOAD,
    );

    plan.add_notifying(enable_site_action(ctx), NotifySet::RELOAD);

    let drop_dir = extra_config_dir(profile, shortname);
    if !fs.is_dir(&drop_dir) {
        plan.add(Action::EnsureDirectory {
            path: drop_dir,
            mode: 0o755,
        });
    }

    Ok(plan)
}

/// Per-application extra-config drop directory
pub fn extra_config_dir(profile: &PlatformProfile, shortname: &str) -> PathBuf {
    profile
        .sites_available()
        .join(format!("{shortname}.conf.d"))
}

fn enable_site_action(ctx: &PlanContext<'_>) -> Action {
    let shortname = &ctx.app.shortname;
    if ctx.profile.family == PlatformFamily::Debian {
        Action::RunCommand {
            command: format!("a2ensite {shortname}"),
            skip_if: Some(format!("a2query -s {shortname}")),
        }
    } else {
        let enabled = ctx
            .profile
            .sites_enabled()
            .join(format!("{shortname}.conf"));
        Action::RunCommand {
            command: format!(
                "ln -s ../sites-available/{shortname}.conf {}",
                enabled.display()
            ),
            skip_if: Some(format!("test -e {}", enabled.display())),
        }
    }
}
