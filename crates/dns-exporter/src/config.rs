//! Exporter configuration.
//!
//! Built-in defaults, then an optional TOML file, then environment variables.

use anyhow::{Context, Result};
use dns_exporter_core::ExclusionRules;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default number of zones fetched at once
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 2;

/// Default seconds between refresh cycles
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 900;

/// Default cap on a single backoff wait, in seconds
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Hosted zone ids, refreshed in this order
    pub hosted_zones: Vec<String>,

    /// Record exclusion lists
    pub exclusions: ExclusionRules,

    /// Zones fetched concurrently; 0 selects the default
    pub max_concurrent_requests: usize,

    /// Seconds between the end of one cycle and the start of the next
    pub refresh_interval_secs: u64,

    /// Cap on a single backoff wait, in seconds
    pub max_backoff_secs: u64,

    /// HTTP listen address (default: 0.0.0.0:80)
    pub listen: SocketAddr,

    /// Route 53 API base URL
    pub route53_endpoint: String,

    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            hosted_zones: Vec::new(),
            exclusions: ExclusionRules::default(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            listen: SocketAddr::from(([0, 0, 0, 0], 80)),
            route53_endpoint: route53_client::DEFAULT_ENDPOINT.to_string(),
            log_level: String::from("info"),
        }
    }
}

impl ExporterConfig {
    /// Load the TOML file at `path`, or the defaults when there is none.
    ///
    /// A file that is given but unreadable or malformed is an error. Values
    /// are checked by [`with_overrides`](Self::with_overrides), which logs
    /// what it corrects, so call it once logging is up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Overlay values from `lookup`.
    ///
    /// Lists are comma separated. Numbers that fail to parse keep the
    /// current value, and zero counts fall back to their defaults, each with
    /// a warning.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(zones) = lookup("ROUTE53_HOSTED_ZONES") {
            self.hosted_zones = split_list(&zones);
        }

        let rules = &mut self.exclusions;
        for (key, list) in [
            ("EXCLUDED_SUBSTRINGS", &mut rules.excluded_substrings),
            ("EXCLUDED_PREFIXES", &mut rules.excluded_prefixes),
            ("EXCLUDED_SUFFIXES", &mut rules.excluded_suffixes),
            ("EXCLUDED_RECORD_SUBSTRINGS", &mut rules.excluded_record_substrings),
            ("EXCLUDED_IP_PREFIXES", &mut rules.excluded_ip_prefixes),
        ] {
            if let Some(value) = lookup(key) {
                *list = split_list(&value);
            }
        }

        override_parsed(&lookup, "MAX_CONCURRENT_REQUESTS", &mut self.max_concurrent_requests);
        override_parsed(&lookup, "DNS_CACHE_REFRESH_INTERVAL", &mut self.refresh_interval_secs);
        override_parsed(&lookup, "MAX_BACKOFF_WAIT", &mut self.max_backoff_secs);
        override_parsed(&lookup, "LISTEN_ADDR", &mut self.listen);

        if let Some(endpoint) = lookup("ROUTE53_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            self.route53_endpoint = endpoint.trim().to_string();
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }

        self.normalized()
    }

    /// Replace out-of-range values with their defaults
    fn normalized(mut self) -> Self {
        if self.max_concurrent_requests == 0 {
            warn!(
                default = DEFAULT_MAX_CONCURRENT_REQUESTS,
                "max_concurrent_requests is 0, using default"
            );
            self.max_concurrent_requests = DEFAULT_MAX_CONCURRENT_REQUESTS;
        }
        if self.refresh_interval_secs == 0 {
            warn!(
                default = DEFAULT_REFRESH_INTERVAL_SECS,
                "refresh_interval_secs is 0, using default"
            );
            self.refresh_interval_secs = DEFAULT_REFRESH_INTERVAL_SECS;
        }
        self
    }

    /// Time between refresh cycles
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Cap on a single backoff wait
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Split a comma separated list, trimming entries and dropping empty ones
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn override_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, current = %slot, "ignoring malformed setting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::default();
        assert!(config.hosted_zones.is_empty());
        assert!(config.exclusions.is_empty());
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.refresh_interval(), Duration::from_secs(900));
        assert_eq!(config.max_backoff(), Duration::from_secs(60));
        assert_eq!(config.listen.port(), 80);
        assert_eq!(config.route53_endpoint, "https://route53.amazonaws.com");
    }

    #[test]
    fn test_env_lists_are_trimmed() {
        let config = ExporterConfig::default().with_overrides(env(&[
            ("ROUTE53_HOSTED_ZONES", " Z1 , Z2,,"),
            ("EXCLUDED_PREFIXES", "internal-, test-"),
            ("EXCLUDED_IP_PREFIXES", "10.,192.168."),
            ("EXCLUDED_SUFFIXES", ""),
        ]));

        assert_eq!(config.hosted_zones, vec!["Z1", "Z2"]);
        assert_eq!(config.exclusions.excluded_prefixes, vec!["internal-", "test-"]);
        assert_eq!(config.exclusions.excluded_ip_prefixes, vec!["10.", "192.168."]);
        assert!(config.exclusions.excluded_suffixes.is_empty());
    }

    #[test]
    fn test_env_numbers() {
        let config = ExporterConfig::default().with_overrides(env(&[
            ("MAX_CONCURRENT_REQUESTS", "8"),
            ("DNS_CACHE_REFRESH_INTERVAL", "30"),
            ("MAX_BACKOFF_WAIT", "5"),
            ("LISTEN_ADDR", "127.0.0.1:9100"),
        ]));

        assert_eq!(config.max_concurrent_requests, 8);
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.max_backoff_secs, 5);
        assert_eq!(config.listen, "127.0.0.1:9100".parse().unwrap());
    }

    #[test]
    fn test_malformed_numbers_keep_current_value() {
        let config = ExporterConfig::default().with_overrides(env(&[
            ("MAX_CONCURRENT_REQUESTS", "lots"),
            ("DNS_CACHE_REFRESH_INTERVAL", "-1"),
            ("LISTEN_ADDR", "port 80"),
        ]));

        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.refresh_interval_secs, 900);
        assert_eq!(config.listen.port(), 80);
    }

    #[test]
    fn test_zero_in_file_is_corrected_by_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "refresh_interval_secs = 0").unwrap();

        let loaded = ExporterConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded.refresh_interval_secs, 0);
        assert_eq!(loaded.with_overrides(env(&[])).refresh_interval_secs, 900);
    }

    #[test]
    fn test_zero_concurrency_uses_default() {
        let config =
            ExporterConfig::default().with_overrides(env(&[("MAX_CONCURRENT_REQUESTS", "0")]));
        assert_eq!(config.max_concurrent_requests, 2);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
hosted_zones = ["Z1", "Z2"]
max_concurrent_requests = 4
listen = "127.0.0.1:8080"

[exclusions]
excluded_substrings = ["staging"]
excluded_suffixes = [".internal"]
"#
        )
        .unwrap();

        let config = ExporterConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.hosted_zones, vec!["Z1", "Z2"]);
        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.exclusions.excluded_substrings, vec!["staging"]);
        assert_eq!(config.exclusions.excluded_suffixes, vec![".internal"]);
        // Unset keys keep their defaults
        assert_eq!(config.refresh_interval_secs, 900);
        assert!(config.exclusions.excluded_prefixes.is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hosted_zones = [\"Z1\"]\nmax_backoff_secs = 10").unwrap();

        let config = ExporterConfig::load(Some(file.path()))
            .unwrap()
            .with_overrides(env(&[("ROUTE53_HOSTED_ZONES", "Z9"), ("MAX_BACKOFF_WAIT", "x")]));

        assert_eq!(config.hosted_zones, vec!["Z9"]);
        assert_eq!(config.max_backoff_secs, 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_requests = \"two\"").unwrap();
        assert!(ExporterConfig::load(Some(file.path())).is_err());

        let missing = file.path().with_extension("missing");
        assert!(ExporterConfig::load(Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_no_file_gives_defaults() {
        assert_eq!(ExporterConfig::load(None).unwrap(), ExporterConfig::default());
    }
}
