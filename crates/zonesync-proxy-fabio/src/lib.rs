// # Fabio Proxy Backend
//
// Implements the `Proxy` trait against the Fabio admin API. Every route
// table entry with a host source advertises that host as a service domain.
//
// Routing targets are the configured Fabio hosts themselves: any of them
// accepts traffic for any advertised domain, so `get_target` picks one at
// random and `is_valid_target` is membership in the host list.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;
use zonesync_core::config::FabioConfig;
use zonesync_core::traits::{Proxy, Service};
use zonesync_core::{Error, Result};

/// Default HTTP timeout for admin API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fabio proxy backend
#[derive(Debug)]
pub struct FabioProxy {
    hosts: Vec<String>,
    admin_port: u16,
    scheme: String,
    client: reqwest::Client,
}

/// One route table entry as reported by `/api/routes`.
#[derive(Debug, Deserialize)]
struct FabioRoute {
    #[serde(default)]
    service: String,
    #[serde(default)]
    host: String,
}

impl FabioProxy {
    pub fn new(config: &FabioConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::proxy("fabio", format!("client creation failed: {e}")))?;

        Ok(Self {
            hosts: config.hosts.clone(),
            admin_port: config.admin_port,
            scheme: config.scheme.clone(),
            client,
        })
    }

    fn random_host(&self) -> String {
        // Config validation guarantees at least one host.
        self.hosts
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Proxy for FabioProxy {
    async fn init(&self) -> Result<()> {
        // Test connection
        self.list_services().await?;
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let url = format!(
            "{}://{}:{}/api/routes",
            self.scheme,
            self.random_host(),
            self.admin_port
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::proxy("fabio", format!("error querying routes: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::proxy(
                "fabio",
                format!("unexpected status code: {}", response.status()),
            ));
        }

        let routes: Vec<FabioRoute> = response
            .json()
            .await
            .map_err(|e| Error::proxy("fabio", format!("error parsing routes body: {e}")))?;

        let services = routes
            .into_iter()
            // Path-only routes have no host and advertise nothing.
            .filter(|route| !route.host.is_empty())
            .map(|route| Service {
                name: route.service,
                domain: route.host,
            })
            .collect::<Vec<_>>();

        trace!(count = services.len(), "listed fabio services");
        Ok(services)
    }

    fn get_target(&self, _source_domain: &str) -> String {
        self.random_host()
    }

    fn is_valid_target(&self, target: &str) -> bool {
        self.hosts.iter().any(|host| host == target)
    }

    fn backend_name(&self) -> &'static str {
        "fabio"
    }
}
