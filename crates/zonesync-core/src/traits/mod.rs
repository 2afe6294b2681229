//! Core traits for the zonesync system
//!
//! This module defines the abstract interfaces the backend adapters implement.
//!
//! - [`Nameserver`]: list and mutate CNAME-style DNS records
//! - [`Proxy`]: list advertised service domains and resolve routing targets

pub mod nameserver;
pub mod proxy;

pub use nameserver::{Nameserver, Record};
pub use proxy::{Proxy, Service};
