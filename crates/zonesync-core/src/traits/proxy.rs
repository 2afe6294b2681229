// # Proxy Trait
//
// Defines the interface for reading the set of externally-published service
// domains from a traffic-routing layer.
//
// ## Implementations
//
// - Traefik: `zonesync-proxy-traefik` crate
// - Fabio: `zonesync-proxy-fabio` crate

use async_trait::async_trait;

/// A service advertised by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Routing-layer service name
    pub name: String,
    /// The public domain the service is reachable at
    pub domain: String,
}

/// Trait for proxy backend implementations
#[async_trait]
pub trait Proxy: Send + Sync {
    /// Prepare the backend for use (verify connectivity).
    ///
    /// Called once at startup; a failure here is fatal to the process.
    async fn init(&self) -> Result<(), crate::Error>;

    /// List the services the proxy currently advertises.
    async fn list_services(&self) -> Result<Vec<Service>, crate::Error>;

    /// A concrete host to point DNS at for `source_domain`.
    ///
    /// Queried at the moment of record creation, never cached from a
    /// snapshot: selection may be non-deterministic (random among the
    /// configured hosts) and must reflect the current configuration.
    fn get_target(&self, source_domain: &str) -> String;

    /// Whether `target` is a host this proxy currently routes through.
    ///
    /// Records pointing at an invalid target are flagged for forced
    /// delete-then-recreate by the nameserver poller.
    fn is_valid_target(&self, target: &str) -> bool;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
