// # zonesyncd - zonesync daemon
//
// Thin integration layer around `zonesync-core`:
// 1. Read configuration from environment variables
// 2. Initialize tracing and the metrics endpoint
// 3. Construct and initialize the configured backends (fatal on failure)
// 4. Spawn the pollers and run the reconciliation engine
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `ZONESYNC_SERVICE_DOMAIN`: managed DNS suffix (required)
// - `ZONESYNC_NAMESERVER_TYPE`: nameserver backend (pihole)
// - `ZONESYNC_PIHOLE_URL` / `ZONESYNC_PIHOLE_PASSWORD`
// - `ZONESYNC_NAMESERVER_POLL_INTERVAL`: seconds between record polls
// - `ZONESYNC_PROXY_TYPE`: proxy backend (traefik, fabio)
// - `ZONESYNC_TRAEFIK_HOSTS` / `ZONESYNC_FABIO_HOSTS`: space-separated
// - `ZONESYNC_TRAEFIK_ADMIN_PORT` / `ZONESYNC_FABIO_ADMIN_PORT`
// - `ZONESYNC_TRAEFIK_SCHEME` / `ZONESYNC_FABIO_SCHEME`
// - `ZONESYNC_TRAEFIK_ENTRYPOINTS`: space-separated entrypoint names
// - `ZONESYNC_PROXY_POLL_INTERVAL`: seconds between service polls
// - `ZONESYNC_MINIMUM_WAIT`: seconds between reconciliation attempts
// - `ZONESYNC_LOOP_INTERVAL`: engine loop tick, seconds
// - `ZONESYNC_LOG_LEVEL`: trace, debug, info, warn, error
// - `ZONESYNC_METRICS_LISTEN_ADDR` / `ZONESYNC_METRICS_PATH`
//
// ## Example
//
// ```bash
// export ZONESYNC_SERVICE_DOMAIN=svc.example.com
// export ZONESYNC_PIHOLE_URL=https://pihole.lan
// export ZONESYNC_PIHOLE_PASSWORD=secret
// export ZONESYNC_PROXY_TYPE=traefik
// export ZONESYNC_TRAEFIK_HOSTS="traefik1.lan traefik2.lan"
// export ZONESYNC_TRAEFIK_ENTRYPOINTS=websecure
//
// zonesyncd
// ```

mod poller;
mod telemetry;

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use zonesync_core::config::{
    Config, FabioConfig, NameserverBackendConfig, NameserverConfig, PiholeConfig,
    ProxyBackendConfig, ProxyConfig, ReconcilerConfig, TelemetryConfig, TraefikConfig,
};
use zonesync_core::{Nameserver, Proxy, Reconciler};
use zonesync_ns_pihole::PiholeNameserver;
use zonesync_proxy_fabio::FabioProxy;
use zonesync_proxy_traefik::TraefikProxy;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit codes, following systemd conventions:
/// 0 clean shutdown, 1 configuration error, 2 runtime error.
#[derive(Debug, Clone, Copy)]
enum ZonesyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Build the core config from `ZONESYNC_*` environment variables.
fn load_config() -> Result<Config> {
    let service_domain =
        env::var("ZONESYNC_SERVICE_DOMAIN").context("ZONESYNC_SERVICE_DOMAIN is required")?;

    let nameserver_type = env_or("ZONESYNC_NAMESERVER_TYPE", "pihole");
    let nameserver_backend = match nameserver_type.as_str() {
        "pihole" => NameserverBackendConfig::Pihole(PiholeConfig {
            url: env::var("ZONESYNC_PIHOLE_URL")
                .context("ZONESYNC_PIHOLE_URL is required when ZONESYNC_NAMESERVER_TYPE=pihole")?,
            password: env::var("ZONESYNC_PIHOLE_PASSWORD").unwrap_or_default(),
        }),
        other => anyhow::bail!(
            "ZONESYNC_NAMESERVER_TYPE '{other}' is not supported. Supported backends: pihole"
        ),
    };

    let proxy_type = env_or("ZONESYNC_PROXY_TYPE", "fabio");
    let proxy_backend = match proxy_type.as_str() {
        "traefik" => ProxyBackendConfig::Traefik(TraefikConfig {
            hosts: split_hosts(&env_or("ZONESYNC_TRAEFIK_HOSTS", "")),
            admin_port: env_parse("ZONESYNC_TRAEFIK_ADMIN_PORT", 8080)?,
            scheme: env_or("ZONESYNC_TRAEFIK_SCHEME", "http"),
            entry_points: split_hosts(&env_or("ZONESYNC_TRAEFIK_ENTRYPOINTS", "")),
        }),
        "fabio" => ProxyBackendConfig::Fabio(FabioConfig {
            hosts: split_hosts(&env_or("ZONESYNC_FABIO_HOSTS", "")),
            admin_port: env_parse("ZONESYNC_FABIO_ADMIN_PORT", 9998)?,
            scheme: env_or("ZONESYNC_FABIO_SCHEME", "http"),
        }),
        other => anyhow::bail!(
            "ZONESYNC_PROXY_TYPE '{other}' is not supported. Supported backends: traefik, fabio"
        ),
    };

    Ok(Config {
        service_domain,
        nameserver: NameserverConfig {
            poll_interval_secs: env_parse("ZONESYNC_NAMESERVER_POLL_INTERVAL", 30)?,
            backend: nameserver_backend,
        },
        proxy: ProxyConfig {
            poll_interval_secs: env_parse("ZONESYNC_PROXY_POLL_INTERVAL", 5)?,
            backend: proxy_backend,
        },
        reconciler: ReconcilerConfig {
            minimum_wait_secs: env_parse("ZONESYNC_MINIMUM_WAIT", 30)?,
            loop_interval_secs: env_parse("ZONESYNC_LOOP_INTERVAL", 1)?,
        },
        telemetry: TelemetryConfig {
            log_level: env_or("ZONESYNC_LOG_LEVEL", "info"),
            metrics_listen_addr: env_or("ZONESYNC_METRICS_LISTEN_ADDR", "0.0.0.0:9100"),
            metrics_path: env_or("ZONESYNC_METRICS_PATH", "/metrics"),
        },
    })
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("couldn't parse {key}")),
        Err(_) => Ok(default),
    }
}

/// Space-separated host lists, as in `"traefik1.lan traefik2.lan"`.
fn split_hosts(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("configuration validation error: {e}");
        return ZonesyncExitCode::ConfigError.into();
    }

    if let Err(e) = telemetry::init_tracing(&config.telemetry) {
        eprintln!("failed to initialize tracing: {e:#}");
        return ZonesyncExitCode::ConfigError.into();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "zonesyncd starting");
    debug!(?config, "loaded config");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    runtime
        .block_on(async {
            match run_daemon(config).await {
                Ok(()) => ZonesyncExitCode::CleanShutdown,
                Err(e) => {
                    error!("daemon error: {e:#}");
                    ZonesyncExitCode::RuntimeError
                }
            }
        })
        .into()
}

async fn run_daemon(config: Config) -> Result<()> {
    let config = Arc::new(config);

    let ns: Arc<dyn Nameserver> = match &config.nameserver.backend {
        NameserverBackendConfig::Pihole(pihole) => Arc::new(PiholeNameserver::new(pihole)?),
    };
    let proxy: Arc<dyn Proxy> = match &config.proxy.backend {
        ProxyBackendConfig::Traefik(traefik) => Arc::new(TraefikProxy::new(traefik)?),
        ProxyBackendConfig::Fabio(fabio) => Arc::new(FabioProxy::new(fabio)?),
    };

    // Both backends must be reachable before anything runs.
    ns.init()
        .await
        .context("nameserver backend initialization failed")?;
    info!(backend = ns.backend_name(), "initialized nameserver backend");
    proxy
        .init()
        .await
        .context("proxy backend initialization failed")?;
    info!(backend = proxy.backend_name(), "initialized proxy backend");

    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&ns),
        Arc::clone(&proxy),
        Arc::clone(&config),
    ));

    let metrics_config = config.telemetry.clone();
    tokio::spawn(async move {
        if let Err(e) = telemetry::serve_metrics(metrics_config).await {
            error!("metrics server error: {e:#}");
        }
    });

    tokio::spawn(poller::run_nameserver_poller(
        Arc::clone(&ns),
        Arc::clone(&proxy),
        Arc::clone(&reconciler),
        Arc::clone(&config),
    ));
    tokio::spawn(poller::run_proxy_poller(
        Arc::clone(&proxy),
        Arc::clone(&reconciler),
        Arc::clone(&config),
    ));

    let engine = Arc::clone(&reconciler);
    tokio::spawn(async move { engine.run().await });

    let signal = wait_for_shutdown().await?;
    info!(signal, "received shutdown signal, stopping");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to set up SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for ctrl-c (non-Unix fallback).
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for ctrl-c")?;
    Ok("SIGINT")
}
