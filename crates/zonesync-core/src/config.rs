//! Configuration types for the zonesync system
//!
//! The daemon builds these from environment variables; embedders can
//! construct them directly. Durations are expressed in seconds with
//! accessors returning [`Duration`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main zonesync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The managed DNS suffix; only domains under it are ever touched
    pub service_domain: String,

    /// Nameserver backend configuration
    pub nameserver: NameserverConfig,

    /// Proxy backend configuration
    pub proxy: ProxyConfig,

    /// Reconciliation engine settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Logging and metrics settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Whether `domain` falls under the managed suffix.
    ///
    /// This is the single scope check used by the pollers and the engine.
    pub fn is_service_domain(&self, domain: &str) -> bool {
        domain.ends_with(&self.service_domain)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.service_domain.is_empty() {
            return Err(crate::Error::config("service domain cannot be empty"));
        }

        self.nameserver.validate()?;
        self.proxy.validate()?;
        self.reconciler.validate()?;

        Ok(())
    }
}

/// Nameserver backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameserverConfig {
    /// How often the nameserver poller lists records
    #[serde(default = "default_nameserver_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Which backend to use
    #[serde(flatten)]
    pub backend: NameserverBackendConfig,
}

impl NameserverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config(
                "nameserver poll interval must be > 0",
            ));
        }
        match &self.backend {
            NameserverBackendConfig::Pihole(pihole) => pihole.validate(),
        }
    }
}

/// Nameserver backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NameserverBackendConfig {
    /// Pi-hole custom-CNAME admin API
    Pihole(PiholeConfig),
}

/// Pi-hole backend settings
#[derive(Clone, Serialize, Deserialize)]
pub struct PiholeConfig {
    /// Base URL of the Pi-hole admin interface, e.g. `https://pihole.lan`
    pub url: String,
    /// Admin interface password
    pub password: String,
}

impl PiholeConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("pi-hole URL cannot be empty"));
        }
        Ok(())
    }
}

// The admin password must never reach the logs.
impl fmt::Debug for PiholeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiholeConfig")
            .field("url", &self.url)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Proxy backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// How often the proxy poller lists services
    #[serde(default = "default_proxy_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Which backend to use
    #[serde(flatten)]
    pub backend: ProxyBackendConfig,
}

impl ProxyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("proxy poll interval must be > 0"));
        }
        match &self.backend {
            ProxyBackendConfig::Traefik(traefik) => traefik.validate(),
            ProxyBackendConfig::Fabio(fabio) => fabio.validate(),
        }
    }
}

/// Proxy backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyBackendConfig {
    /// Traefik admin API
    Traefik(TraefikConfig),
    /// Fabio admin API
    Fabio(FabioConfig),
}

/// Traefik backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraefikConfig {
    /// Traefik hosts; routing targets are drawn from this list
    pub hosts: Vec<String>,
    /// Admin API port
    #[serde(default = "default_traefik_admin_port")]
    pub admin_port: u16,
    /// Admin API scheme
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Only routers attached to these entrypoints are considered
    pub entry_points: Vec<String>,
}

impl TraefikConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.hosts.is_empty() {
            return Err(crate::Error::config(
                "there must be at least one Traefik host in the config",
            ));
        }
        Ok(())
    }
}

/// Fabio backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabioConfig {
    /// Fabio hosts; routing targets are drawn from this list
    pub hosts: Vec<String>,
    /// Admin API port
    #[serde(default = "default_fabio_admin_port")]
    pub admin_port: u16,
    /// Admin API scheme
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl FabioConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.hosts.is_empty() {
            return Err(crate::Error::config(
                "there must be at least one Fabio host in the config",
            ));
        }
        Ok(())
    }
}

/// Reconciliation engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Minimum time between reconciliation attempts, successful or not
    #[serde(default = "default_minimum_wait_secs")]
    pub minimum_wait_secs: u64,

    /// Sleep between run-loop iterations
    #[serde(default = "default_loop_interval_secs")]
    pub loop_interval_secs: u64,
}

impl ReconcilerConfig {
    pub fn minimum_wait(&self) -> Duration {
        Duration::from_secs(self.minimum_wait_secs)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.loop_interval_secs == 0 {
            return Err(crate::Error::config("loop interval must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            minimum_wait_secs: default_minimum_wait_secs(),
            loop_interval_secs: default_loop_interval_secs(),
        }
    }
}

/// Logging and metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the metrics exporter listens on
    #[serde(default = "default_metrics_listen_addr")]
    pub metrics_listen_addr: String,

    /// Path the Prometheus text exposition is served at
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_listen_addr: default_metrics_listen_addr(),
            metrics_path: default_metrics_path(),
        }
    }
}

fn default_nameserver_poll_interval_secs() -> u64 {
    30
}

fn default_proxy_poll_interval_secs() -> u64 {
    5
}

fn default_traefik_admin_port() -> u16 {
    8080
}

fn default_fabio_admin_port() -> u16 {
    9998
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_minimum_wait_secs() -> u64 {
    30
}

fn default_loop_interval_secs() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_listen_addr() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
