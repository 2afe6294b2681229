// # zonesync-core
//
// Core library for the zonesync DNS reconciliation system.
//
// ## Architecture Overview
//
// zonesync keeps a DNS layer in sync with the service domains advertised by
// a traffic-routing layer:
//
// - **Nameserver**: trait for listing and mutating CNAME-style records
// - **Proxy**: trait for listing advertised domains and resolving targets
// - **DomainSet**: set algebra over domain names; snapshots and the
//   deletion queue are DomainSets
// - **Reconciler**: the engine — accepts snapshots from pollers, computes
//   the diff, rate-limits, executes deletes-then-creates, retries
//
// The daemon crate (`zonesyncd`) wires pollers and backend adapters around
// this library; adapter crates implement the two traits.

pub mod config;
pub mod domain_set;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod traits;

// Re-export core types for convenience
pub use config::Config;
pub use domain_set::DomainSet;
pub use engine::{LoopStatus, Reconciler};
pub use error::{Error, Result};
pub use traits::{Nameserver, Proxy, Record, Service};
