// # Pi-hole Nameserver Backend
//
// Implements the `Nameserver` trait against the Pi-hole admin interface's
// custom-CNAME endpoint (`customcname.php`). The API is form-encoded and
// session-based: `init` logs in once, the session lives in the HTTP
// client's cookie jar, and every mutating call carries a CSRF token scraped
// from the records page.
//
// The adapter performs one API call per operation and surfaces failures to
// the engine, which owns retry policy. The only internal retry is a single
// re-login when Pi-hole reports the session expired.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use zonesync_core::config::PiholeConfig;
use zonesync_core::traits::{Nameserver, Record};
use zonesync_core::{Error, Result};

const CUSTOM_CNAME_PATH: &str = "/admin/scripts/pi-hole/php/customcname.php";
const SESSION_EXPIRED: &str = "Session expired! Please re-login on the Pi-hole dashboard.";

/// Default HTTP timeout for admin API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pi-hole nameserver backend
pub struct PiholeNameserver {
    base_url: String,
    password: String,
    client: reqwest::Client,
    token_pattern: Regex,
}

// The admin password must never reach the logs.
impl std::fmt::Debug for PiholeNameserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiholeNameserver")
            .field("base_url", &self.base_url)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl PiholeNameserver {
    /// Create a new Pi-hole backend from its configuration.
    ///
    /// The client keeps the login session in a cookie jar and accepts
    /// invalid certificates: Pi-hole boxes commonly serve self-signed TLS.
    pub fn new(config: &PiholeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::nameserver("pi-hole", format!("client creation failed: {e}")))?;

        // The records page embeds the CSRF token as <div id="token" hidden>…</div>.
        let token_pattern = Regex::new(r#"id="token"[^>]*>([^<]+)<"#)
            .map_err(|e| Error::nameserver("pi-hole", format!("token pattern failed: {e}")))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            password: config.password.clone(),
            client,
            token_pattern,
        })
    }

    async fn login(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/admin/login.php", self.base_url))
            .form(&[("pw", self.password.as_str())])
            .send()
            .await
            .map_err(|e| Error::nameserver("pi-hole", format!("login failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::nameserver(
                "pi-hole",
                format!("login failed with status {}", response.status()),
            ));
        }
        debug!("pi-hole login successful");
        Ok(())
    }

    async fn csrf_token(&self) -> Result<String> {
        let page = self
            .client
            .get(format!("{}/admin/cname_records.php", self.base_url))
            .send()
            .await
            .map_err(|e| Error::nameserver("pi-hole", format!("error fetching CSRF token: {e}")))?
            .text()
            .await
            .map_err(|e| Error::nameserver("pi-hole", format!("error reading token page: {e}")))?;

        self.token_pattern
            .captures(&page)
            .map(|captures| captures[1].to_string())
            .ok_or_else(|| Error::nameserver("pi-hole", "no CSRF token in records page"))
    }

    async fn request_once(&self, params: &[(&str, &str)]) -> Result<String> {
        let token = self.csrf_token().await?;
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("token", token.as_str()));

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CUSTOM_CNAME_PATH))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::nameserver("pi-hole", format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::nameserver(
                "pi-hole",
                format!("unexpected status code: {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| Error::nameserver("pi-hole", format!("error reading response: {e}")))
    }

    /// Perform one form request; a reported session expiry triggers a single
    /// re-login and retry.
    async fn request(&self, params: &[(&str, &str)]) -> Result<String> {
        let body = self.request_once(params).await?;
        if body.trim() == SESSION_EXPIRED {
            debug!("pi-hole session expired, logging in again");
            self.login().await?;
            return self.request_once(params).await;
        }
        Ok(body)
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, body: &str) -> Result<T> {
        serde_json::from_str(body)
            .map_err(|e| Error::nameserver("pi-hole", format!("error parsing response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GenericResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl Nameserver for PiholeNameserver {
    async fn init(&self) -> Result<()> {
        self.login().await
    }

    async fn list_records(&self) -> Result<Vec<Record>> {
        let body = self.request(&[("action", "get")]).await?;
        let response: ListResponse = self.parse(&body)?;

        let mut records = Vec::with_capacity(response.data.len());
        for row in response.data {
            let [name, target] = row.as_slice() else {
                return Err(Error::nameserver(
                    "pi-hole",
                    format!("malformed record row: {row:?}"),
                ));
            };
            records.push(Record {
                name: name.clone(),
                target: target.clone(),
            });
        }
        Ok(records)
    }

    async fn add_record(&self, name: &str, target: &str) -> Result<()> {
        let body = self
            .request(&[("action", "add"), ("domain", name), ("target", target)])
            .await?;
        let response: GenericResponse = self.parse(&body)?;

        if !response.success {
            return Err(Error::nameserver(
                "pi-hole",
                format!("error while creating record for \"{name}\": {}", response.message),
            ));
        }
        Ok(())
    }

    async fn remove_record(&self, name: &str) -> Result<()> {
        // The API deletes by (domain, target) pair, so the current target
        // has to be looked up first.
        let records = self.list_records().await?;
        let target = records
            .into_iter()
            .find(|record| record.name == name)
            .map(|record| record.target)
            .ok_or_else(|| {
                Error::nameserver("pi-hole", format!("couldn't find target for domain {name}"))
            })?;

        let body = self
            .request(&[
                ("action", "delete"),
                ("domain", name),
                ("target", target.as_str()),
            ])
            .await?;
        let response: GenericResponse = self.parse(&body)?;

        if !response.success {
            return Err(Error::nameserver(
                "pi-hole",
                format!("error while deleting record for \"{name}\": {}", response.message),
            ));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "pi-hole"
    }
}
