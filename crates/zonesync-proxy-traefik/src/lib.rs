// # Traefik Proxy Backend
//
// Implements the `Proxy` trait against the Traefik admin API. Advertised
// domains are extracted from the `Host(...)` rules of enabled HTTP routers
// attached to the configured entrypoints.
//
// Routing targets are the configured Traefik hosts themselves: any of them
// accepts traffic for any advertised domain, so `get_target` picks one at
// random and `is_valid_target` is membership in the host list.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::trace;
use zonesync_core::config::TraefikConfig;
use zonesync_core::traits::{Proxy, Service};
use zonesync_core::{Error, Result};

/// Default HTTP timeout for admin API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Traefik proxy backend
#[derive(Debug)]
pub struct TraefikProxy {
    hosts: Vec<String>,
    admin_port: u16,
    scheme: String,
    entry_points: HashSet<String>,
    rule_pattern: Regex,
    client: reqwest::Client,
}

/// One router as reported by `/api/http/routers`.
#[derive(Debug, Deserialize)]
struct TraefikRouter {
    #[serde(default)]
    status: String,
    #[serde(default)]
    rule: String,
    #[serde(default)]
    service: String,
    #[serde(default, rename = "entryPoints")]
    entry_points: Vec<String>,
}

impl TraefikProxy {
    pub fn new(config: &TraefikConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::proxy("traefik", format!("client creation failed: {e}")))?;

        // Host(`a.example.com`) or Host(`a.example.com`, `b.example.com`)
        let rule_pattern = Regex::new(r"^Host\((`[a-z0-9.-]+`(, `[a-z0-9.-]+`)*)\)$")
            .map_err(|e| Error::proxy("traefik", format!("rule pattern failed: {e}")))?;

        Ok(Self {
            hosts: config.hosts.clone(),
            admin_port: config.admin_port,
            scheme: config.scheme.clone(),
            entry_points: config.entry_points.iter().cloned().collect(),
            rule_pattern,
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

    fn admin_url(&self) -> String {
        format!(
            "{}://{}:{}/api/http/routers",
            self.scheme,
            self.random_host(),
            self.admin_port
        )
    }

    /// Domains named in a router's `Host(...)` rule; empty for any other
    /// rule shape (path rules, header rules, ...).
    fn rule_domains(&self, rule: &str) -> Vec<String> {
        let Some(captures) = self.rule_pattern.captures(rule) else {
            return Vec::new();
        };
        captures[1]
            .split(',')
            .map(|item| item.trim_matches([' ', '`']).to_string())
            .collect()
    }
}

#[async_trait]
impl Proxy for TraefikProxy {
    async fn init(&self) -> Result<()> {
        // Test connection
        self.list_services().await?;
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let url = self.admin_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::proxy("traefik", format!("error querying routers: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::proxy(
                "traefik",
                format!("unexpected status code: {}", response.status()),
            ));
        }

        let routers: Vec<TraefikRouter> = response
            .json()
            .await
            .map_err(|e| Error::proxy("traefik", format!("error parsing routers body: {e}")))?;

        let mut services = Vec::new();
        for router in routers {
            // Don't track disabled services
            if router.status != "enabled" {
                continue;
            }
            // Only track services on the configured entrypoints
            if !router
                .entry_points
                .iter()
                .any(|ep| self.entry_points.contains(ep))
            {
                continue;
            }

            for domain in self.rule_domains(&router.rule) {
                services.push(Service {
                    name: router.service.clone(),
                    domain,
                });
            }
        }

        trace!(count = services.len(), "listed traefik services");
        Ok(services)
    }

    fn get_target(&self, _source_domain: &str) -> String {
        self.random_host()
    }

    fn is_valid_target(&self, target: &str) -> bool {
        self.hosts.iter().any(|host| host == target)
    }

    fn backend_name(&self) -> &'static str {
        "traefik"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> TraefikProxy {
        let addr = server.address();
        TraefikProxy::new(&TraefikConfig {
            hosts: vec![addr.ip().to_string()],
            admin_port: addr.port(),
            scheme: "http".to_string(),
            entry_points: vec!["websecure".to_string()],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn lists_domains_from_enabled_routers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/http/routers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"name":"app@docker","status":"enabled","rule":"Host(`a.svc.example.com`)","service":"app","entryPoints":["websecure"]},
                    {"name":"off@docker","status":"disabled","rule":"Host(`off.svc.example.com`)","service":"off","entryPoints":["websecure"]},
                    {"name":"internal@docker","status":"enabled","rule":"Host(`internal.svc.example.com`)","service":"internal","entryPoints":["traefik"]}
                ]"#,
            ))
            .mount(&server)
            .await;

        let services = backend(&server).list_services().await.unwrap();
        assert_eq!(
            services,
            vec![Service {
                name: "app".to_string(),
                domain: "a.svc.example.com".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn multi_domain_rule_yields_one_service_per_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/http/routers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"name":"app@docker","status":"enabled","rule":"Host(`a.svc.example.com`, `b.svc.example.com`)","service":"app","entryPoints":["websecure"]}]"#,
            ))
            .mount(&server)
            .await;

        let services = backend(&server).list_services().await.unwrap();
        let domains: Vec<&str> = services.iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(domains, vec!["a.svc.example.com", "b.svc.example.com"]);
    }

    #[tokio::test]
    async fn non_host_rules_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/http/routers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"name":"app@docker","status":"enabled","rule":"PathPrefix(`/api`)","service":"app","entryPoints":["websecure"]}]"#,
            ))
            .mount(&server)
            .await;

        let services = backend(&server).list_services().await.unwrap();
        assert!(services.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/http/routers"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        assert!(backend(&server).list_services().await.is_err());
    }

    #[tokio::test]
    async fn targets_are_drawn_from_configured_hosts() {
        let proxy = TraefikProxy::new(&TraefikConfig {
            hosts: vec!["t1.lan".to_string(), "t2.lan".to_string()],
            admin_port: 8080,
            scheme: "http".to_string(),
            entry_points: vec!["websecure".to_string()],
        })
        .unwrap();

        for _ in 0..20 {
            let target = proxy.get_target("a.svc.example.com");
            assert!(proxy.is_valid_target(&target));
        }
        assert!(!proxy.is_valid_target("stranger.lan"));
    }
}
