//! # dns-exporter
//!
//! Publishes the A and CNAME records of a set of Route 53 hosted zones as
//! Prometheus HTTP service-discovery targets.
//!
//! A background [`RefreshLoop`](refresh_loop::RefreshLoop) fetches every
//! zone under a shared concurrency limit, retries failures with jittered
//! exponential backoff, drops records matching the exclusion rules and swaps
//! the result into a [`TargetCache`](cache::TargetCache). The HTTP surface
//! serves the current snapshot at `/dns_targets` and its size at `/metrics`.

pub mod backoff;
pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod fetcher;
pub mod refresh_loop;
pub mod server;
pub mod telemetry;

pub use cli::run;
