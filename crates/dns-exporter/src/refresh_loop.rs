//! Background refresh loop.

use crate::coordinator::Refresher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Runs a refresh cycle, waits `interval`, and repeats until aborted
pub struct RefreshLoop {
    refresher: Arc<Refresher>,
    interval: Duration,
}

impl RefreshLoop {
    /// Create a loop around `refresher`
    #[must_use]
    pub const fn new(refresher: Arc<Refresher>, interval: Duration) -> Self {
        Self {
            refresher,
            interval,
        }
    }

    /// Start the loop on its own task. The first cycle begins immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run forever.
    ///
    /// Each cycle runs on its own task so that a panic inside it is logged
    /// and the loop keeps going with the previous cache contents.
    pub async fn run(self) {
        info!(
            zones = self.refresher.zones().len(),
            interval_secs = self.interval.as_secs(),
            "refresh loop started"
        );

        let refresher = self.refresher;
        run_cycles(self.interval, move || {
            let refresher = Arc::clone(&refresher);
            async move {
                refresher.refresh_all().await;
            }
        })
        .await;
    }
}

/// Spawn `cycle`, log a failed join, sleep `interval`, repeat
async fn run_cycles<F, Fut>(interval: Duration, cycle: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        if let Err(e) = tokio::spawn(cycle()).await {
            error!(error = %e, "Error updating DNS cache");
        }

        info!(
            interval_secs = interval.as_secs(),
            "Waiting before next update"
        );
        tokio::time::sleep(interval).await;
    }
}
