//! Per-zone record enumeration with retries.
//!
//! A fetch holds one permit of the shared limiter for its whole attempt
//! sequence. Each attempt walks every page from the first; a failed
//! attempt's partial output is dropped before the retry.

use crate::backoff::BackoffPolicy;
use dns_exporter_core::{
    evaluate, ExclusionRules, ExporterError, RawRecord, RecordSet, RecordSource, Result, Target,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Progress of one zone's attempt sequence
#[derive(Debug)]
pub enum FetchState {
    /// About to run the given attempt (0-indexed)
    Attempting(u32),
    /// An attempt enumerated every page
    Succeeded(Vec<Target>),
    /// Every attempt failed
    Exhausted,
}

/// Fetches and filters the records of one zone at a time
pub struct ZoneFetcher {
    source: Arc<dyn RecordSource>,
    rules: Arc<ExclusionRules>,
    limiter: Arc<Semaphore>,
    backoff: BackoffPolicy,
}

impl ZoneFetcher {
    /// Create a fetcher sharing `limiter` with every other fetch
    #[must_use]
    pub fn new(
        source: Arc<dyn RecordSource>,
        rules: Arc<ExclusionRules>,
        limiter: Arc<Semaphore>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            source,
            rules,
            limiter,
            backoff,
        }
    }

    /// Fetch the targets of `zone_id`.
    ///
    /// Never fails: after the attempt budget is spent the zone contributes
    /// nothing.
    pub async fn fetch(&self, zone_id: &str) -> Vec<Target> {
        let Ok(_permit) = self.limiter.acquire().await else {
            error!(zone = %zone_id, "concurrency limiter closed, skipping zone");
            return Vec::new();
        };

        let mut state = FetchState::Attempting(0);
        loop {
            state = match state {
                FetchState::Attempting(attempt) => self.attempt(zone_id, attempt).await,
                FetchState::Succeeded(targets) => {
                    info!(zone = %zone_id, count = targets.len(), "zone records fetched");
                    return targets;
                }
                FetchState::Exhausted => {
                    error!(
                        zone = %zone_id,
                        attempts = self.backoff.max_attempts,
                        "giving up on zone after exhausting retries"
                    );
                    return Vec::new();
                }
            };
        }
    }

    /// Run one attempt and decide the next state
    async fn attempt(&self, zone_id: &str, attempt: u32) -> FetchState {
        debug!(zone = %zone_id, attempt = attempt + 1, "fetching records");

        let err = match self.fetch_all_pages(zone_id).await {
            Ok(targets) => return FetchState::Succeeded(targets),
            Err(err) => err,
        };

        let next = attempt + 1;
        if next >= self.backoff.max_attempts {
            warn!(zone = %zone_id, attempt = next, error = %err, "record fetch failed");
            return FetchState::Exhausted;
        }

        let wait = self.backoff.delay_for(attempt);
        warn!(
            zone = %zone_id,
            attempt = next,
            error = %err,
            retryable = err.is_retryable(),
            wait_secs = wait.as_secs_f64(),
            "record fetch failed, retrying"
        );
        tokio::time::sleep(wait).await;
        FetchState::Attempting(next)
    }

    /// Walk every page of the zone, keeping records that pass the filter.
    ///
    /// A cursor handed out twice means the listing loops, which fails the
    /// attempt.
    async fn fetch_all_pages(&self, zone_id: &str) -> Result<Vec<Target>> {
        let mut targets = Vec::new();
        let mut cursor = None;
        let mut seen = HashSet::new();

        loop {
            let page = self.source.list_page(zone_id, cursor.as_ref()).await?;
            targets.extend(page.records.iter().filter_map(|set| self.accept(zone_id, set)));

            match page.next {
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ExporterError::Decode(format!(
                        "pagination cursor {} repeated",
                        next.name
                    )));
                }
                Some(next) => cursor = Some(next),
                None => return Ok(targets),
            }
        }
    }

    /// Map a listed record set to a target if it is kept
    fn accept(&self, zone_id: &str, set: &RecordSet) -> Option<Target> {
        let record = RawRecord::from_record_set(set)?;
        if let Some(rule) = evaluate(&record, &self.rules) {
            debug!(
                rule = %rule,
                name = %record.name,
                value = %record.value,
                "record excluded"
            );
            return None;
        }
        Some(record.into_target(zone_id))
    }
}
