// # Nameserver Trait
//
// Defines the interface for listing and mutating DNS records via a
// nameserver's admin API.
//
// ## Implementations
//
// - Pi-hole: `zonesync-ns-pihole` crate
// - Future: Route53, CoreDNS, etc.

use async_trait::async_trait;

/// A CNAME-style DNS mapping owned by the nameserver backend.
///
/// The engine never caches these; it only ever holds the set of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Fully-qualified record name
    pub name: String,
    /// The hostname the record points at
    pub target: String,
}

/// Trait for nameserver backend implementations
///
/// Adapters are plain point-to-point API clients with no shared state: they
/// perform one API call per method invocation and surface failures to the
/// engine, which owns retry policy. An adapter must not implement its own
/// retry or backoff.
#[async_trait]
pub trait Nameserver: Send + Sync {
    /// Prepare the backend for use (authenticate, verify connectivity).
    ///
    /// Called once at startup; a failure here is fatal to the process.
    async fn init(&self) -> Result<(), crate::Error>;

    /// List all records currently held by the nameserver.
    async fn list_records(&self) -> Result<Vec<Record>, crate::Error>;

    /// Create a record mapping `name` to `target`.
    async fn add_record(&self, name: &str, target: &str) -> Result<(), crate::Error>;

    /// Delete the record for `name`.
    async fn remove_record(&self, name: &str) -> Result<(), crate::Error>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
