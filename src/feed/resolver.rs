use crate::config::Config;
use crate::feed::candidates::candidate_paths;
use crate::feed::pool::{WorkerPermit, WorkerPool};
use crate::feed::probe::{probe, ProbeOutcome, ProbeSettings};
use crate::util::validate_site_url;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Finds a feed for one site by probing every candidate path concurrently.
///
/// Cheap to clone: the HTTP client and the candidate list are shared.
#[derive(Debug, Clone)]
pub struct SiteResolver {
    client: reqwest::Client,
    candidates: Arc<[String]>,
    probe_concurrency: usize,
    settings: ProbeSettings,
    block_private_hosts: bool,
}

impl SiteResolver {
    /// Creates a resolver probing the full candidate set with at most
    /// `probe_concurrency` requests in flight per site.
    pub fn new(client: reqwest::Client, probe_concurrency: usize, settings: ProbeSettings) -> Self {
        Self {
            client,
            candidates: candidate_paths().into(),
            probe_concurrency,
            settings,
            block_private_hosts: false,
        }
    }

    /// Creates a resolver from loaded configuration.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        let settings = ProbeSettings {
            timeout: config.probe_timeout(),
            sample_bytes: config.sample_bytes,
            require_success_status: config.require_success_status,
        };
        Self::new(client, config.probe_concurrency, settings)
            .with_private_hosts_blocked(config.block_private_hosts)
    }

    /// Replaces the generated candidate list.
    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_private_hosts_blocked(mut self, block: bool) -> Self {
        self.block_private_hosts = block;
        self
    }

    pub fn probe_concurrency(&self) -> usize {
        self.probe_concurrency
    }

    /// Returns the first feed URL found below `base_url`, or `None`.
    ///
    /// Returns as soon as any probe succeeds. Probes still in flight at that
    /// point are not cancelled; they finish in the background and their
    /// results are discarded.
    ///
    /// A base URL that cannot be parsed (or is rejected by the private host
    /// guard) resolves to `None` without sending any request.
    pub async fn resolve(&self, base_url: &str) -> Option<String> {
        let pool = WorkerPool::new(self.probe_concurrency);
        self.resolve_with_pool(base_url, pool, None).await
    }

    /// Same as [`resolve`](Self::resolve), but keeps `site_permit` alive
    /// until every probe of this site has finished, including the ones still
    /// running after an early return.
    ///
    /// Callers bounding how many sites resolve at once pass their permit
    /// here, so that background probes stay within that bound.
    pub async fn resolve_with_permit(
        &self,
        base_url: &str,
        site_permit: WorkerPermit,
    ) -> Option<String> {
        let pool = WorkerPool::new(self.probe_concurrency);
        self.resolve_with_pool(base_url, pool, Some(site_permit)).await
    }

    async fn resolve_with_pool(
        &self,
        base_url: &str,
        pool: WorkerPool,
        site_permit: Option<WorkerPermit>,
    ) -> Option<String> {
        if let Err(e) = validate_site_url(base_url, self.block_private_hosts) {
            tracing::warn!(url = %base_url, error = %e, "Skipping site with unusable base URL");
            return None;
        }

        // Single slot: the first publish wins, later ones are dropped by try_send
        let (found_tx, mut found_rx) = mpsc::channel::<String>(1);

        tokio::spawn(dispatch_probes(
            Dispatch {
                client: self.client.clone(),
                base_url: base_url.into(),
                candidates: Arc::clone(&self.candidates),
                settings: self.settings,
                pool,
                site_permit,
            },
            found_tx,
        ));

        // None once every probe has finished without publishing
        found_rx.recv().await
    }
}

/// Everything a dispatcher task owns for one site resolution.
struct Dispatch {
    client: reqwest::Client,
    base_url: Arc<str>,
    candidates: Arc<[String]>,
    settings: ProbeSettings,
    pool: WorkerPool,
    /// Released only after the last probe task has been joined.
    site_permit: Option<WorkerPermit>,
}

/// Launches one probe task per candidate, at most `pool.capacity()` at a time,
/// then waits for all of them before dropping the last result sender.
async fn dispatch_probes(dispatch: Dispatch, found_tx: mpsc::Sender<String>) {
    let Dispatch {
        client,
        base_url,
        candidates,
        settings,
        pool,
        site_permit,
    } = dispatch;
    let mut tasks = JoinSet::new();

    for candidate in candidates.iter().cloned() {
        let permit = pool.acquire().await;
        let client = client.clone();
        let task_url = Arc::clone(&base_url);
        let found_tx = found_tx.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let outcome = probe(&client, &task_url, &candidate, settings).await;
            if let ProbeOutcome::Found(feed_url) = outcome {
                // Full slot means another candidate already won
                if found_tx.try_send(feed_url).is_err() {
                    tracing::trace!(
                        url = %task_url,
                        candidate = %candidate,
                        "Dropping duplicate feed hit"
                    );
                }
            }
        });

        // Reap finished tasks as we go so the set stays small
        while let Some(joined) = tasks.try_join_next() {
            log_panicked_probe(&base_url, joined);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        log_panicked_probe(&base_url, joined);
    }

    tracing::trace!(url = %base_url, peak = pool.peak(), "All probes finished");
    drop(found_tx);
    drop(site_permit);
}

fn log_panicked_probe(base_url: &str, joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(url = %base_url, error = %e, "Probe task failed");
    }
}
