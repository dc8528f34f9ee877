//! Appserver catalog
//!
//! Maps the application's declared appserver adapter to the site config that
//! fronts it. Adapters outside the supported registry leave the webserver
//! unconfigured for the application; the planner treats that as a skip, not
//! an error.

use std::fmt::Write as _;

use crate::config::{Application, AppserverSection, SslMaterial};
use crate::platform::PlatformProfile;
use crate::settings::{RawSettings, ResolvedSettings};

/// Adapters the catalog can generate site config for
pub const SUPPORTED_ADAPTERS: &[&str] = &["passenger", "php", "puma", "unicorn", "thin"];

/// Adapter in use for an application, plus its opaque parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppserverBinding {
    pub adapter: String,
    pub params: RawSettings,
}

impl AppserverBinding {
    /// Port the appserver listens on for upstream proxying
    pub fn upstream_port(&self) -> u16 {
        self.params
            .get("port")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(3000)
    }

    /// Application environment handed to the appserver
    pub fn app_env(&self) -> &str {
        self.params
            .get("environment")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("production")
    }
}

/// Supplies adapter bindings and the supported-adapter registry
pub trait AppserverCatalog {
    /// Adapter in use for the application
    fn adapter_for(&self, app: &Application) -> AppserverBinding;

    /// Registry of adapters site config can be generated for
    fn supported_adapters(&self) -> &[&'static str];

    /// Whether an adapter is in the registry
    fn supports(&self, adapter: &str) -> bool {
        self.supported_adapters().contains(&adapter)
    }
}

/// Catalog backed by the host manifest's appserver declaration
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    adapter: String,
    params: RawSettings,
}

impl StaticCatalog {
    pub fn new(section: &AppserverSection) -> Self {
        Self {
            adapter: section.adapter.clone(),
            params: section.params.clone(),
        }
    }
}

impl AppserverCatalog for StaticCatalog {
    fn adapter_for(&self, _app: &Application) -> AppserverBinding {
        AppserverBinding {
            adapter: self.adapter.clone(),
            params: self.params.clone(),
        }
    }

    fn supported_adapters(&self) -> &[&'static str] {
        SUPPORTED_ADAPTERS
    }
}

/// Site config template, keyed by adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteTemplate {
    Passenger,
    Php,
    Upstream,
}

impl SiteTemplate {
    /// Template for an adapter: passenger and php get their own, anything
    /// else proxies to an upstream listener
    pub fn for_adapter(adapter: &str) -> SiteTemplate {
        match adapter {
            "passenger" => SiteTemplate::Passenger,
            "php" => SiteTemplate::Php,
            _ => SiteTemplate::Upstream,
        }
    }

    /// Stable template identifier, recorded in the generated file header
    pub fn id(&self) -> &'static str {
        match self {
            SiteTemplate::Passenger => "appserver.apache2.passenger.conf",
            SiteTemplate::Php => "appserver.apache2.php.conf",
            SiteTemplate::Upstream => "appserver.apache2.upstream.conf",
        }
    }
}

/// Everything vhost rendering needs
pub struct SiteContext<'a> {
    pub app: &'a Application,
    pub settings: &'a ResolvedSettings,
    pub profile: &'static PlatformProfile,
    pub binding: &'a AppserverBinding,
    pub ssl: &'a SslMaterial,
}

/// Render the site config for the binding's adapter
pub fn render_site_config(ctx: &SiteContext<'_>) -> String {
    let template = SiteTemplate::for_adapter(&ctx.binding.adapter);
    let mut out = String::new();
    let _ = writeln!(out, "# Generated by sitewright ({}).", template.id());
    let _ = writeln!(out, "# Manual changes will be overwritten.");
    out.push('\n');

    render_vhost(&mut out, ctx, template, false);
    if ctx.ssl.enabled() {
        out.push('\n');
        render_vhost(&mut out, ctx, template, true);
    }
    out
}

fn render_vhost(out: &mut String, ctx: &SiteContext<'_>, template: SiteTemplate, ssl: bool) {
    let settings = ctx.settings;
    let port = if ssl { settings.ssl_port } else { settings.port };
    let primary = ctx.app.primary_domain();

    let _ = writeln!(out, "<VirtualHost *:{port}>");
    let _ = writeln!(out, "  ServerName {primary}");
    for alias in ctx.app.alias_domains() {
        let _ = writeln!(out, "  ServerAlias {alias}");
    }
    out.push('\n');

    let _ = writeln!(out, "  ErrorLog {}", settings.error_log(primary).display());
    let _ = writeln!(
        out,
        "  CustomLog {} combined",
        settings.access_log(primary).display()
    );
    let _ = writeln!(out, "  LogLevel {}", settings.log_level);
    out.push('\n');

    let _ = writeln!(out, "  KeepAliveTimeout {}", settings.keepalive_timeout);
    let _ = writeln!(out, "  LimitRequestBody {}", settings.limit_request_body);
    out.push('\n');

    match template {
        SiteTemplate::Passenger => render_passenger_body(out, ctx),
        SiteTemplate::Php => render_php_body(out, ctx),
        SiteTemplate::Upstream => render_upstream_body(out, ctx),
    }

    if ssl {
        out.push('\n');
        render_ssl_directives(out, ctx);
    }

    let extra = if ssl {
        &settings.extra_config_ssl
    } else {
        &settings.extra_config
    };
    if !extra.is_empty() {
        out.push('\n');
        for line in extra.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "  IncludeOptional {}/{}.conf.d/*.conf",
        ctx.profile.sites_available().display(),
        ctx.app.shortname
    );
    let _ = writeln!(out, "</VirtualHost>");
}

fn render_upstream_body(out: &mut String, ctx: &SiteContext<'_>) {
    let upstream = ctx.binding.upstream_port();
    let _ = writeln!(out, "  ProxyTimeout {}", ctx.settings.proxy_timeout);
    let _ = writeln!(out, "  ProxyPreserveHost On");
    let _ = writeln!(out, "  ProxyPass / http://127.0.0.1:{upstream}/ retry=0");
    let _ = writeln!(out, "  ProxyPassReverse / http://127.0.0.1:{upstream}/");
    let _ = writeln!(out, "  RewriteEngine On");
}

fn render_passenger_body(out: &mut String, ctx: &SiteContext<'_>) {
    let public = ctx.app.deploy_root().join("current").join("public");
    let _ = writeln!(out, "  DocumentRoot {}", public.display());
    let _ = writeln!(out, "  PassengerAppEnv {}", ctx.binding.app_env());
    let _ = writeln!(out, "  PassengerMinInstances 1");
    let _ = writeln!(out, "  RewriteEngine On");
    out.push('\n');
    let _ = writeln!(out, "  <Directory {}>", public.display());
    let _ = writeln!(out, "    Options -MultiViews");
    let _ = writeln!(out, "    Require all granted");
    let _ = writeln!(out, "  </Directory>");
}

fn render_php_body(out: &mut String, ctx: &SiteContext<'_>) {
    let root = ctx.app.deploy_root().join("current");
    let _ = writeln!(out, "  DocumentRoot {}", root.display());
    let _ = writeln!(out, "  DirectoryIndex index.php index.html");
    out.push('\n');
    let _ = writeln!(out, "  <Directory {}>", root.display());
    let _ = writeln!(out, "    AllowOverride All");
    let _ = writeln!(out, "    Require all granted");
    let _ = writeln!(out, "  </Directory>");
    out.push('\n');
    let _ = writeln!(out, "  <FilesMatch \"\\.php$\">");
    let _ = writeln!(
        out,
        "    SetHandler \"proxy:fcgi://127.0.0.1:{}\"",
        ctx.binding
            .params
            .get("fcgi_port")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(9000)
    );
    let _ = writeln!(out, "  </FilesMatch>");
}

fn render_ssl_directives(out: &mut String, ctx: &SiteContext<'_>) {
    let ssl_dir = ctx.profile.ssl_dir();
    let shortname = &ctx.app.shortname;
    let _ = writeln!(out, "  SSLEngine on");
    let _ = writeln!(
        out,
        "  SSLCertificateFile {}",
        ssl_dir.join(format!("{shortname}.crt")).display()
    );
    let _ = writeln!(
        out,
        "  SSLCertificateKeyFile {}",
        ssl_dir.join(format!("{shortname}.key")).display()
    );
    if ctx.ssl.chain.is_some() {
        let _ = writeln!(
            out,
            "  SSLCertificateChainFile {}",
            ssl_dir.join(format!("{shortname}.chain.pem")).display()
        );
    }
    if ctx.ssl.dhparams.is_some() {
        let _ = writeln!(
            out,
            "  SSLOpenSSLConfCmd DHParameters {}",
            ssl_dir.join("dhparams.pem").display()
        );
    }
    let _ = writeln!(
        out,
        "  SSLCipherSuite {}",
        cipher_suite(ctx.settings.ssl_for_legacy_browsers)
    );
    let _ = writeln!(
        out,
        "  SSLProtocol {}",
        if ctx.settings.ssl_for_legacy_browsers {
            "all -SSLv2 -SSLv3"
        } else {
            "all -SSLv2 -SSLv3 -TLSv1 -TLSv1.1"
        }
    );
}

fn cipher_suite(legacy_browsers: bool) -> &'static str {
    if legacy_browsers {
        "ALL:!ADH:!EXPORT:!SSLv2:!RC4+RSA:+HIGH:+MEDIUM"
    } else {
        "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
         ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384"
    }
}
