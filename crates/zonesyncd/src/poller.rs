//! The two snapshot pollers.
//!
//! Each poller runs on its own interval, decoupled from the engine loop:
//! the nameserver poller lists current records, the proxy poller lists
//! advertised services. Both filter to the managed suffix before pushing a
//! snapshot — the engine hard-fails on anything outside it. The nameserver
//! poller additionally flags records whose target the proxy no longer
//! routes, so the engine recreates them with a fresh target.
//!
//! A failed list call logs the error and skips the tick; the previous
//! snapshot stays authoritative until the next successful poll.

use std::sync::Arc;
use tracing::{debug, error};
use zonesync_core::{Config, DomainSet, Nameserver, Proxy, Reconciler};

/// Poll the nameserver forever. The first tick fires immediately so the
/// engine can prime before the first interval elapses.
pub async fn run_nameserver_poller(
    ns: Arc<dyn Nameserver>,
    proxy: Arc<dyn Proxy>,
    reconciler: Arc<Reconciler>,
    config: Arc<Config>,
) {
    let mut ticker = tokio::time::interval(config.nameserver.poll_interval());
    loop {
        ticker.tick().await;
        nameserver_tick(ns.as_ref(), proxy.as_ref(), &reconciler, &config).await;
    }
}

/// Poll the proxy forever. Same cadence rules as the nameserver poller.
pub async fn run_proxy_poller(
    proxy: Arc<dyn Proxy>,
    reconciler: Arc<Reconciler>,
    config: Arc<Config>,
) {
    let mut ticker = tokio::time::interval(config.proxy.poll_interval());
    loop {
        ticker.tick().await;
        proxy_tick(proxy.as_ref(), &reconciler, &config).await;
    }
}

async fn nameserver_tick(
    ns: &dyn Nameserver,
    proxy: &dyn Proxy,
    reconciler: &Reconciler,
    config: &Config,
) {
    let records = match ns.list_records().await {
        Ok(records) => records,
        Err(e) => {
            error!("error loading records from nameserver: {e}");
            return;
        }
    };

    let mut domains = DomainSet::new();
    for record in records {
        // We only manage service domains
        if !config.is_service_domain(&record.name) {
            continue;
        }

        domains.add(record.name.clone());
        if !proxy.is_valid_target(&record.target) {
            debug!(
                domain = %record.name,
                target = %record.target,
                "domain points to invalid target, marking it for deletion"
            );
            reconciler.mark_for_deletion(record.name).await;
        }
    }
    reconciler.set_nameserver_domains(domains).await;
}

async fn proxy_tick(proxy: &dyn Proxy, reconciler: &Reconciler, config: &Config) {
    let services = match proxy.list_services().await {
        Ok(services) => services,
        Err(e) => {
            error!("error loading services from proxy: {e}");
            return;
        }
    };

    let domains: DomainSet = services
        .into_iter()
        .map(|service| service.domain)
        // We only manage service domains
        .filter(|domain| config.is_service_domain(domain))
        .collect();
    reconciler.set_proxy_domains(domains).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use zonesync_core::config::{
        Config, FabioConfig, NameserverBackendConfig, NameserverConfig, PiholeConfig,
        ProxyBackendConfig, ProxyConfig, ReconcilerConfig, TelemetryConfig,
    };
    use zonesync_core::error::Result;
    use zonesync_core::traits::{Record, Service};

    struct StaticNameserver {
        records: Vec<Record>,
    }

    #[async_trait]
    impl Nameserver for StaticNameserver {
        async fn init(&self) -> Result<()> {
            Ok(())
        }
        async fn list_records(&self) -> Result<Vec<Record>> {
            Ok(self.records.clone())
        }
        async fn add_record(&self, _name: &str, _target: &str) -> Result<()> {
            Ok(())
        }
        async fn remove_record(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        fn backend_name(&self) -> &'static str {
            "static"
        }
    }

    struct StaticProxy {
        services: Vec<Service>,
        valid_target: String,
    }

    #[async_trait]
    impl Proxy for StaticProxy {
        async fn init(&self) -> Result<()> {
            Ok(())
        }
        async fn list_services(&self) -> Result<Vec<Service>> {
            Ok(self.services.clone())
        }
        fn get_target(&self, _source_domain: &str) -> String {
            self.valid_target.clone()
        }
        fn is_valid_target(&self, target: &str) -> bool {
            target == self.valid_target
        }
        fn backend_name(&self) -> &'static str {
            "static"
        }
    }

    fn test_config() -> Config {
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

    fn service(name: &str, domain: &str) -> Service {
        Service {
            name: name.to_string(),
            domain: domain.to_string(),
        }
    }

    fn record(name: &str, target: &str) -> Record {
        Record {
            name: name.to_string(),
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn ticks_filter_to_suffix_and_flag_stale_targets() {
        let config = Arc::new(test_config());
        let ns = StaticNameserver {
            records: vec![
                record("a.svc.example.com", "proxy1.lan"),
                record("stale.svc.example.com", "decommissioned.lan"),
                record("outside.example.com", "proxy1.lan"),
            ],
        };
        let proxy = StaticProxy {
            services: vec![
                service("app-a", "a.svc.example.com"),
                service("stale", "stale.svc.example.com"),
                service("other", "outside.example.com"),
            ],
            valid_target: "proxy1.lan".to_string(),
        };
        let reconciler = Reconciler::new(
            Arc::new(StaticNameserver { records: vec![] }),
            Arc::new(StaticProxy {
                services: vec![],
                valid_target: "proxy1.lan".to_string(),
            }),
            Arc::clone(&config),
        );

        nameserver_tick(&ns, &proxy, &reconciler, &config).await;
        proxy_tick(&proxy, &reconciler, &config).await;

        let (to_create, to_delete) = reconciler.diff().await.unwrap();

        // The stale record is flagged for forced delete-then-recreate; the
        // out-of-suffix names never enter either snapshot.
        assert!(to_delete.contains("stale.svc.example.com"));
        assert!(to_create.contains("stale.svc.example.com"));
        assert!(!to_delete.contains("outside.example.com"));
        assert!(!to_create.contains("outside.example.com"));
        assert!(!to_create.contains("a.svc.example.com"));
        assert!(!to_delete.contains("a.svc.example.com"));
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_snapshot() {
        struct FailingNameserver;

        #[async_trait]
        impl Nameserver for FailingNameserver {
            async fn init(&self) -> Result<()> {
                Ok(())
            }
            async fn list_records(&self) -> Result<Vec<Record>> {
                Err(zonesync_core::Error::nameserver("static", "listing failed"))
            }
            async fn add_record(&self, _name: &str, _target: &str) -> Result<()> {
                Ok(())
            }
            async fn remove_record(&self, _name: &str) -> Result<()> {
                Ok(())
            }
            fn backend_name(&self) -> &'static str {
                "static"
            }
        }

        let config = Arc::new(test_config());
        let proxy = StaticProxy {
            services: vec![service("app-a", "a.svc.example.com")],
            valid_target: "proxy1.lan".to_string(),
        };
        let reconciler = Reconciler::new(
            Arc::new(StaticNameserver { records: vec![] }),
            Arc::new(StaticProxy {
                services: vec![],
                valid_target: "proxy1.lan".to_string(),
            }),
            Arc::clone(&config),
        );

        // Prime with a good snapshot, then fail a poll: the engine keeps the
        // primed view and stays ready to diff.
        let good = StaticNameserver {
            records: vec![record("a.svc.example.com", "proxy1.lan")],
        };
        nameserver_tick(&good, &proxy, &reconciler, &config).await;
        proxy_tick(&proxy, &reconciler, &config).await;
        assert!(reconciler.diff().await.is_some());

        nameserver_tick(&FailingNameserver, &proxy, &reconciler, &config).await;
        let (_, to_delete) = reconciler.diff().await.unwrap();
        assert!(!to_delete.contains("a.svc.example.com"));
    }
}
