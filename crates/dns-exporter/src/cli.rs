//! Command-line entry point.

use crate::backoff::BackoffPolicy;
use crate::cache::TargetCache;
use crate::config::ExporterConfig;
use crate::coordinator::Refresher;
use crate::fetcher::ZoneFetcher;
use crate::refresh_loop::RefreshLoop;
use crate::server::{self, AppState};
use crate::telemetry;
use anyhow::{Context, Result};
use clap::Parser;
use route53_client::{DefaultCredentialsChain, Route53Client};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Publish filtered Route 53 records as Prometheus HTTP service-discovery targets
///
/// Settings come from an optional TOML file overlaid by environment variables
/// (ROUTE53_HOSTED_ZONES, EXCLUDED_*, MAX_CONCURRENT_REQUESTS,
/// DNS_CACHE_REFRESH_INTERVAL, MAX_BACKOFF_WAIT). AWS credentials come from
/// the standard chain: AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY, the shared
/// files selected by AWS_PROFILE, web identity (AWS_ROLE_ARN with
/// AWS_WEB_IDENTITY_TOKEN_FILE), the container endpoint, then EC2 instance
/// metadata.
#[derive(Parser, Debug)]
#[command(name = "dns-exporter")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DNS_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP listen address, overrides the config file and LISTEN_ADDR
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Resolve the effective configuration.
    ///
    /// `init_logging` receives the log filter (`--log-level`, then
    /// `LOG_LEVEL`, then the file) and runs before any setting is checked,
    /// so warnings about corrected values reach the subscriber.
    pub fn load_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
        init_logging: impl FnOnce(&str) -> Result<()>,
    ) -> Result<ExporterConfig> {
        let file = ExporterConfig::load(self.config.as_deref())?;

        let level = self
            .log_level
            .clone()
            .or_else(|| lookup("LOG_LEVEL").map(|v| v.trim().to_string()))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| file.log_level.clone());
        init_logging(&level)?;

        let mut config = file.with_overrides(lookup);
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
        Ok(config)
    }
}

/// Run the exporter until interrupted.
pub async fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config(|key| std::env::var(key).ok(), telemetry::init)?;

    if config.hosted_zones.is_empty() {
        warn!("no hosted zones configured, the target list will stay empty");
    }

    let credentials =
        DefaultCredentialsChain::from_env().context("configuring AWS credential providers")?;
    info!(providers = ?credentials.provider_names(), "AWS credential providers");
    let client = Route53Client::builder(credentials)
        .endpoint(config.route53_endpoint.clone())
        .build()
        .context("building Route 53 client")?;
    client.credentials().await.context("resolving AWS credentials")?;

    let cache = TargetCache::new();
    let fetcher = ZoneFetcher::new(
        Arc::new(client),
        Arc::new(config.exclusions.clone()),
        Arc::new(Semaphore::new(
            config.max_concurrent_requests.min(Semaphore::MAX_PERMITS),
        )),
        BackoffPolicy::new().max_backoff(config.max_backoff()),
    );
    let refresher = Refresher::new(Arc::new(fetcher), config.hosted_zones.clone(), cache.clone());
    let refresh = RefreshLoop::new(Arc::new(refresher), config.refresh_interval()).start();

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(
        addr = %config.listen,
        zones = config.hosted_zones.len(),
        max_concurrent_requests = config.max_concurrent_requests,
        "DNS exporter listening"
    );

    let served = server::serve(listener, AppState::new(cache), shutdown_signal()).await;
    refresh.abort();
    served.context("HTTP server failed")?;

    info!("DNS exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
