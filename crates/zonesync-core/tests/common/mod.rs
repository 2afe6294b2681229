//! Test doubles and common utilities for engine contract tests
//!
//! The mocks count calls and record the order of backend mutations so tests
//! can assert on what the engine actually did, and they expose failure
//! switches for the retry contracts.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zonesync_core::config::{
    Config, FabioConfig, NameserverBackendConfig, NameserverConfig, PiholeConfig,
    ProxyBackendConfig, ProxyConfig, ReconcilerConfig, TelemetryConfig,
};
use zonesync_core::error::{Error, Result};
use zonesync_core::traits::{Nameserver, Proxy, Record, Service};
use zonesync_core::DomainSet;

/// One backend mutation as the engine issued it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Add { name: String, target: String },
    Remove { name: String },
}

/// A mock Nameserver that records mutations and can be told to fail.
pub struct MockNameserver {
    ops: Arc<Mutex<Vec<Op>>>,
    add_call_count: Arc<AtomicUsize>,
    remove_call_count: Arc<AtomicUsize>,
    fail_adds: Arc<AtomicBool>,
    fail_removes: Arc<AtomicBool>,
}

impl MockNameserver {
    pub fn new() -> Self {
        Self {
            ops: Arc::new(Mutex::new(Vec::new())),
            add_call_count: Arc::new(AtomicUsize::new(0)),
            remove_call_count: Arc::new(AtomicUsize::new(0)),
            fail_adds: Arc::new(AtomicBool::new(false)),
            fail_removes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a handle that shares counters and switches with `other`, for
    /// keeping an observer after the original moves into the engine.
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ops: Arc::clone(&other.ops),
            add_call_count: Arc::clone(&other.add_call_count),
            remove_call_count: Arc::clone(&other.remove_call_count),
            fail_adds: Arc::clone(&other.fail_adds),
            fail_removes: Arc::clone(&other.fail_removes),
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn add_call_count(&self) -> usize {
        self.add_call_count.load(Ordering::SeqCst)
    }

    pub fn remove_call_count(&self) -> usize {
        self.remove_call_count.load(Ordering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.add_call_count() + self.remove_call_count()
    }

    pub fn set_fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Nameserver for MockNameserver {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn add_record(&self, name: &str, target: &str) -> Result<()> {
        self.add_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(Error::nameserver("mock", "add_record failed"));
        }
        self.ops.lock().unwrap().push(Op::Add {
            name: name.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    async fn remove_record(&self, name: &str) -> Result<()> {
        self.remove_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(Error::nameserver("mock", "remove_record failed"));
        }
        self.ops.lock().unwrap().push(Op::Remove {
            name: name.to_string(),
        });
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// A mock Proxy with a fixed target host.
pub struct MockProxy {
    target: String,
    get_target_call_count: Arc<AtomicUsize>,
}

impl MockProxy {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            get_target_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            target: other.target.clone(),
            get_target_call_count: Arc::clone(&other.get_target_call_count),
        }
    }

    #[allow(dead_code)]
    pub fn get_target_call_count(&self) -> usize {
        self.get_target_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Proxy for MockProxy {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        Ok(Vec::new())
    }

    fn get_target(&self, _source_domain: &str) -> String {
        self.get_target_call_count.fetch_add(1, Ordering::SeqCst);
        self.target.clone()
    }

    fn is_valid_target(&self, target: &str) -> bool {
        target == self.target
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Config with the managed suffix `svc.example.com` and default timings.
pub fn test_config() -> Config {
    Config {
        service_domain: "svc.example.com".to_string(),
        nameserver: NameserverConfig {
            poll_interval_secs: 30,
            backend: NameserverBackendConfig::Pihole(PiholeConfig {
                url: "http://pihole.lan".to_string(),
                password: String::new(),
            }),
        },
        proxy: ProxyConfig {
            poll_interval_secs: 5,
            backend: ProxyBackendConfig::Fabio(FabioConfig {
                hosts: vec!["proxy1.lan".to_string()],
                admin_port: 9998,
                scheme: "http".to_string(),
            }),
        },
        reconciler: ReconcilerConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

/// Build a DomainSet from string literals.
pub fn set(domains: &[&str]) -> DomainSet {
    domains.iter().copied().collect()
}
