//! One refresh cycle across every configured zone.

use crate::cache::TargetCache;
use crate::fetcher::ZoneFetcher;
use dns_exporter_core::Target;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Fetches all zones concurrently and publishes the result to the cache
pub struct Refresher {
    fetcher: Arc<ZoneFetcher>,
    zones: Arc<[String]>,
    cache: TargetCache,
}

impl Refresher {
    /// Create a refresher for the given zones
    #[must_use]
    pub fn new(fetcher: Arc<ZoneFetcher>, zones: Vec<String>, cache: TargetCache) -> Self {
        Self {
            fetcher,
            zones: zones.into(),
            cache,
        }
    }

    /// Zones refreshed each cycle
    #[must_use]
    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    /// The cache this refresher publishes to
    #[must_use]
    pub const fn cache(&self) -> &TargetCache {
        &self.cache
    }

    /// Run one cycle and replace the cache with its output.
    ///
    /// Returns the number of targets published.
    pub async fn refresh_all(&self) -> usize {
        let targets = self.collect_targets().await;
        let count = targets.len();
        self.cache.replace(targets);
        info!(count, zones = self.zones.len(), "DNS cache updated");
        count
    }

    /// Fetch every zone, one task per zone, concatenated in configuration order.
    ///
    /// The fetcher's limiter bounds how many zones are in flight. A zone task
    /// that panics contributes nothing.
    pub async fn collect_targets(&self) -> Vec<Target> {
        let mut tasks = JoinSet::new();
        for (index, zone) in self.zones.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let zone = zone.clone();
            tasks.spawn(async move { (index, fetcher.fetch(&zone).await) });
        }

        let mut per_zone = Vec::with_capacity(self.zones.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => per_zone.push(result),
                Err(e) => error!(error = %e, "zone fetch task failed"),
            }
        }

        per_zone.sort_by_key(|(index, _)| *index);
        per_zone.into_iter().flat_map(|(_, targets)| targets).collect()
    }
}
