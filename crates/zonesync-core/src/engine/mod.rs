//! The reconciliation engine
//!
//! The [`Reconciler`] drives the nameserver toward the set of domains the
//! proxy advertises. Two pollers push [`DomainSet`] snapshots into it; the
//! engine computes the diff, rate-limits reconciliation attempts, executes
//! deletes-then-creates against the nameserver backend, and retries failed
//! batches without losing queued work.
//!
//! ```text
//! nameserver poller ──▶ set_nameserver_domains ─┐
//! proxy poller      ──▶ set_proxy_domains      ─┤
//! nameserver poller ──▶ mark_for_deletion      ─┤
//!                                               ▼
//!                                     ┌──────────────────┐
//!                                     │ Reconciler::run  │ tick ▶ diff ▶ reconcile
//!                                     └──────────────────┘
//!                                               │
//!                              deletes, then creates, via Nameserver
//! ```
//!
//! All mutable state lives behind one `tokio::sync::Mutex`, held for the
//! duration of each setter, diff, and the whole reconcile call: a setter
//! never interleaves with an in-progress diff, and a deletion mark that
//! arrives while a batch is executing lands after that batch's
//! queue-clearing decision.

use crate::config::Config;
use crate::domain_set::DomainSet;
use crate::error::{Error, Result};
use crate::metrics::{MANAGED_RECORDS, RECORDS_CREATED_TOTAL, RECORDS_DELETED_TOTAL};
use crate::traits::{Nameserver, Proxy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace};

/// Mutable engine state, guarded by a single lock.
struct EngineState {
    /// Latest snapshot from the nameserver poller; `None` until first poll
    nameserver_domains: Option<DomainSet>,
    /// Latest snapshot from the proxy poller; `None` until first poll
    proxy_domains: Option<DomainSet>,
    /// Domains flagged for forced delete-then-recreate; cleared only after a
    /// successful reconciliation
    deletion_queue: DomainSet,
    /// Dirty flag, set by any snapshot change or deletion-queue insert
    needs_diff: bool,
    /// Stamped at the start of every reconciliation attempt, success or not
    last_reconciliation: Option<Instant>,
}

/// Per-loop log debouncing. Only the run loop reads these, so they live
/// outside the state lock; [`Reconciler::tick`] takes them by reference so
/// contract tests can drive single iterations.
#[derive(Debug, Default)]
pub struct LoopStatus {
    previously_in_sync: bool,
    too_early_logged: bool,
}

/// The reconciliation engine.
///
/// One long-lived instance per process. The run loop is the sole invoker of
/// reconciliation; the snapshot setters and [`mark_for_deletion`] may be
/// called concurrently with it and with each other.
///
/// [`mark_for_deletion`]: Reconciler::mark_for_deletion
pub struct Reconciler {
    ns: Arc<dyn Nameserver>,
    proxy: Arc<dyn Proxy>,
    config: Arc<Config>,
    minimum_wait: Duration,
    loop_interval: Duration,
    state: Mutex<EngineState>,
}

impl Reconciler {
    pub fn new(ns: Arc<dyn Nameserver>, proxy: Arc<dyn Proxy>, config: Arc<Config>) -> Self {
        let minimum_wait = config.reconciler.minimum_wait();
        let loop_interval = config.reconciler.loop_interval();
        Self {
            ns,
            proxy,
            config,
            minimum_wait,
            loop_interval,
            state: Mutex::new(EngineState {
                nameserver_domains: None,
                proxy_domains: None,
                deletion_queue: DomainSet::new(),
                needs_diff: false,
                last_reconciliation: None,
            }),
        }
    }

    /// Replace the nameserver-side snapshot.
    ///
    /// A set structurally equal to the stored one is a no-op: the dirty flag
    /// stays untouched, suppressing redundant reconciliation attempts when a
    /// poll returns unchanged data.
    pub async fn set_nameserver_domains(&self, domains: DomainSet) {
        trace!(domains = %domains, "received nameserver domains");
        let mut state = self.state.lock().await;
        if state.nameserver_domains.as_ref() == Some(&domains) {
            return;
        }
        state.nameserver_domains = Some(domains);
        state.needs_diff = true;
    }

    /// Replace the proxy-side snapshot. Same no-op suppression as
    /// [`set_nameserver_domains`](Reconciler::set_nameserver_domains).
    pub async fn set_proxy_domains(&self, domains: DomainSet) {
        trace!(domains = %domains, "received proxy domains");
        let mut state = self.state.lock().await;
        if state.proxy_domains.as_ref() == Some(&domains) {
            return;
        }
        state.proxy_domains = Some(domains);
        state.needs_diff = true;
    }

    /// Flag `domain` for deletion even though the proxy may still advertise
    /// it. Used when its current DNS target is no longer a valid routing
    /// target: the delete/create pair forces a fresh target.
    pub async fn mark_for_deletion(&self, domain: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.deletion_queue.add(domain);
        state.needs_diff = true;
    }

    /// Compute the pending work as `(to_create, to_delete)`.
    ///
    /// Returns `None` while either snapshot is absent — not ready, not an
    /// error.
    pub async fn diff(&self) -> Option<(DomainSet, DomainSet)> {
        let state = self.state.lock().await;
        self.diff_locked(&state)
    }

    fn diff_locked(&self, state: &EngineState) -> Option<(DomainSet, DomainSet)> {
        let Some(ns_domains) = &state.nameserver_domains else {
            debug!("reconciler not ready to diff, no nameserver domains yet");
            return None;
        };
        let Some(proxy_domains) = &state.proxy_domains else {
            debug!("reconciler not ready to diff, no proxy domains yet");
            return None;
        };

        // NS - P + D
        let to_delete = ns_domains.difference(proxy_domains).union(&state.deletion_queue);
        // P - NS + (D & P): queued domains the proxy still advertises get
        // deleted and immediately recreated with a fresh target.
        let to_create = proxy_domains
            .difference(ns_domains)
            .union(&state.deletion_queue.intersect(proxy_domains));

        MANAGED_RECORDS.set(proxy_domains.len() as i64);

        Some((to_create, to_delete))
    }

    /// Execute one batch: all deletions, then all creations.
    ///
    /// Stamps the reconciliation timestamp before doing anything, so retry
    /// frequency is throttled regardless of outcome. The first backend
    /// failure aborts the batch; unprocessed domains reappear in the next
    /// diff since snapshots and queue are unchanged. Does not clear the
    /// deletion queue — the run loop does that, and only on success.
    pub async fn reconcile(&self, to_create: &DomainSet, to_delete: &DomainSet) -> Result<()> {
        let mut state = self.state.lock().await;
        self.reconcile_locked(&mut state, to_create, to_delete).await
    }

    async fn reconcile_locked(
        &self,
        state: &mut EngineState,
        to_create: &DomainSet,
        to_delete: &DomainSet,
    ) -> Result<()> {
        state.last_reconciliation = Some(Instant::now());

        // Validate the whole batch before touching the backend: a domain
        // outside the managed suffix aborts with no mutation at all.
        for domain in to_delete.iter().chain(to_create.iter()) {
            self.check_service_domain(domain)?;
        }

        for domain in to_delete {
            info!(%domain, "deleting domain");
            self.ns
                .remove_record(domain)
                .await
                .map_err(|e| Error::DeleteRecord {
                    domain: domain.clone(),
                    source: Box::new(e),
                })?;
            RECORDS_DELETED_TOTAL.inc();
            debug!(%domain, "deleted domain");
        }

        for domain in to_create {
            info!(%domain, "creating domain");
            // Target resolved at creation time, never from the snapshot:
            // selection is non-deterministic and must reflect the current
            // host list.
            let target = self.proxy.get_target(domain);
            self.ns
                .add_record(domain, &target)
                .await
                .map_err(|e| Error::CreateRecord {
                    domain: domain.clone(),
                    source: Box::new(e),
                })?;
            RECORDS_CREATED_TOTAL.inc();
            debug!(%domain, %target, "created domain");
        }

        Ok(())
    }

    /// A domain outside the managed suffix here means an upstream poller's
    /// filtering is broken; abort the whole batch rather than skip.
    fn check_service_domain(&self, domain: &str) -> Result<()> {
        if !self.config.is_service_domain(domain) {
            return Err(Error::not_service_domain(
                domain,
                &self.config.service_domain,
            ));
        }
        Ok(())
    }

    /// One run-loop iteration: diff if dirty, reconcile if due.
    ///
    /// Public so contract tests can drive the loop deterministically; the
    /// daemon uses [`run`](Reconciler::run).
    pub async fn tick(&self, status: &mut LoopStatus) {
        let mut state = self.state.lock().await;

        if !state.needs_diff {
            return;
        }
        let Some((to_create, to_delete)) = self.diff_locked(&state) else {
            return;
        };

        if to_create.is_empty() && to_delete.is_empty() {
            if !status.previously_in_sync {
                info!("proxy and nameserver are in sync");
                status.previously_in_sync = true;
            }
            state.needs_diff = false;
            return;
        }

        if status.previously_in_sync {
            info!("proxy and nameserver are out of sync");
            status.previously_in_sync = false;
        }

        let now = Instant::now();
        let earliest = state
            .last_reconciliation
            .map(|last| last + self.minimum_wait);
        match earliest {
            Some(earliest) if now < earliest => {
                if !status.too_early_logged {
                    let next_attempt_in = earliest - now;
                    debug!(
                        minimum_wait = ?self.minimum_wait,
                        ?next_attempt_in,
                        "not enough time has passed since the last reconciliation"
                    );
                    status.too_early_logged = true;
                }
            }
            _ => {
                debug!("starting reconciliation");
                match self
                    .reconcile_locked(&mut state, &to_create, &to_delete)
                    .await
                {
                    Ok(()) => {
                        state.deletion_queue = DomainSet::new();
                        state.needs_diff = false;
                    }
                    Err(e) => {
                        error!("error during reconciliation, will attempt again: {e}");
                    }
                }
                status.too_early_logged = false;
            }
        }
    }

    /// Run the reconciliation loop forever, on its own schedule, decoupled
    /// from poller cadence.
    pub async fn run(&self) {
        self.run_with_shutdown(None).await
    }

    /// Identical loop with a controlled exit, for tests and embedders that
    /// manage shutdown themselves.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) {
        let mut status = LoopStatus::default();

        match shutdown_rx {
            Some(mut rx) => loop {
                self.tick(&mut status).await;
                tokio::select! {
                    _ = &mut rx => {
                        info!("shutdown signal received, stopping reconciler loop");
                        return;
                    }
                    _ = time::sleep(self.loop_interval) => {}
                }
            },
            None => loop {
                self.tick(&mut status).await;
                time::sleep(self.loop_interval).await;
            },
        }
    }
}
