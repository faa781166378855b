use crate::feed::pool::WorkerPool;
use crate::feed::resolver::SiteResolver;
use crate::storage::{Site, NO_FEED_SENTINEL};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Summary of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Sites that already had a feed and were left untouched.
    pub skipped: usize,
    /// Sites that were probed.
    pub attempted: usize,
    /// Probed sites that now have a feed URL.
    pub found: usize,
    /// Probed sites marked with [`NO_FEED_SENTINEL`].
    pub not_found: usize,
    /// Highest number of site resolutions that ran at the same time.
    pub peak_in_flight: usize,
}

/// Resolves feeds for a whole site list with bounded concurrency.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    resolver: SiteResolver,
    site_concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(resolver: SiteResolver, site_concurrency: usize) -> Self {
        Self {
            resolver,
            site_concurrency,
        }
    }

    /// Resolves every site that still needs a feed and writes the result
    /// into that site's record.
    ///
    /// A site needs a feed when its feed field is unset, empty or equal to
    /// [`NO_FEED_SENTINEL`]. Sites with any other value are skipped, so a
    /// re-run never probes a known site again. On return every probed site
    /// holds either the discovered URL or the sentinel.
    ///
    /// At most `site_concurrency` sites resolve at the same time. A site's
    /// slot is freed only once all of its probes have finished, even when
    /// its record was written early, so total in-flight requests never
    /// exceed `site_concurrency` × the resolver's probe concurrency. Each
    /// task holds the only `&mut` to its own record, so writes need no
    /// locking.
    pub async fn run(&self, sites: &mut [Site]) -> BatchReport {
        let pool = WorkerPool::new(self.site_concurrency);
        let found = AtomicUsize::new(0);
        let not_found = AtomicUsize::new(0);

        let (pending, skipped): (Vec<&mut Site>, Vec<&mut Site>) =
            sites.iter_mut().partition(|site| site.needs_probe());

        let attempted = pending.len();
        tracing::info!(
            total = attempted + skipped.len(),
            pending = attempted,
            skipped = skipped.len(),
            site_concurrency = pool.capacity(),
            "Starting feed discovery"
        );

        stream::iter(pending)
            .for_each_concurrent(None, |site| {
                let pool = &pool;
                let found = &found;
                let not_found = &not_found;
                async move {
                    let permit = pool.acquire().await;
                    tracing::info!(url = %site.url, "Processing URL");

                    // The permit stays with the site's probes, not with this future
                    match self.resolver.resolve_with_permit(&site.url, permit).await {
                        Some(feed_url) => {
                            tracing::info!(url = %site.url, feed = %feed_url, "RSS feed found");
                            site.feed = Some(feed_url);
                            found.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            tracing::info!(url = %site.url, "No RSS feed found");
                            site.feed = Some(NO_FEED_SENTINEL.to_string());
                            not_found.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        let report = BatchReport {
            skipped: skipped.len(),
            attempted,
            found: found.into_inner(),
            not_found: not_found.into_inner(),
            peak_in_flight: pool.peak(),
        };
        tracing::info!(
            found = report.found,
            not_found = report.not_found,
            skipped = report.skipped,
            "Feed discovery finished"
        );
        report
    }
}
