//! AWS credentials and the providers that resolve them.
//!
//! [`DefaultCredentialsChain`] asks, in order: the `AWS_*` environment
//! variables, the shared `credentials`/`config` files, web identity
//! federation through STS, the container credentials endpoint and the EC2
//! instance metadata service. The first source that has credentials wins.

mod container;
mod env;
mod imds;
mod profile;
mod web_identity;

pub use container::ContainerProvider;
pub use env::EnvironmentProvider;
pub use imds::ImdsProvider;
pub use profile::ProfileProvider;
pub use web_identity::WebIdentityProvider;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dns_exporter_core::{ExporterError, Result};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Timeout for reaching a credential endpoint
const PROVIDER_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for a whole credential request
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Cached credentials are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 300;

/// Variable lookup shared by the providers
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the process environment
#[must_use]
pub fn process_env() -> EnvLookup {
    Arc::new(|key| std::env::var(key).ok())
}

/// Read `key`, trimmed, treating blank values as unset
pub(crate) fn env_value(lookup: &EnvLookup, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// AWS credentials used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Session token for temporary credentials
    pub session_token: Option<String>,

    /// When temporary credentials stop working
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Create credentials from an access key pair
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expires_at: None,
        }
    }

    /// Attach a session token
    #[must_use]
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set the expiry of temporary credentials
    #[must_use]
    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Whether these credentials expire within `margin` of `now`
    #[must_use]
    pub fn expires_within(&self, margin: TimeDelta, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at - margin <= now)
    }

    /// Read credentials from the standard `AWS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let missing = |key: &str| ExporterError::MissingCredentials(format!("{key} is not set"));

        let access_key_id = read("AWS_ACCESS_KEY_ID").ok_or_else(|| missing("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key =
            read("AWS_SECRET_ACCESS_KEY").ok_or_else(|| missing("AWS_SECRET_ACCESS_KEY"))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: read("AWS_SESSION_TOKEN"),
            expires_at: None,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A source of AWS credentials
#[async_trait]
pub trait ProvideCredentials: Send + Sync {
    /// Resolve credentials.
    ///
    /// `Ok(None)` means this source is not configured and the next one
    /// should be asked. An error means it is configured but broken.
    async fn provide(&self) -> Result<Option<Credentials>>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl ProvideCredentials for Credentials {
    async fn provide(&self) -> Result<Option<Credentials>> {
        Ok(Some(self.clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// The standard AWS provider chain
pub struct DefaultCredentialsChain {
    providers: Vec<Box<dyn ProvideCredentials>>,
}

impl DefaultCredentialsChain {
    /// Chain configured from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&process_env())
    }

    /// Chain configured through `lookup`
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(PROVIDER_CONNECT_TIMEOUT)
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| ExporterError::Config(format!("failed to build HTTP client: {e}")))?;

        let mut providers: Vec<Box<dyn ProvideCredentials>> = Vec::new();
        if let Some(provider) = EnvironmentProvider::from_lookup(lookup)? {
            providers.push(Box::new(provider));
        }
        providers.push(Box::new(ProfileProvider::from_lookup(lookup)));
        if let Some(provider) = WebIdentityProvider::from_lookup(lookup, http.clone())? {
            providers.push(Box::new(provider));
        }
        if let Some(provider) = ContainerProvider::from_lookup(lookup, http.clone())? {
            providers.push(Box::new(provider));
        }
        if let Some(provider) = ImdsProvider::from_lookup(lookup, http)? {
            providers.push(Box::new(provider));
        }
        Ok(Self::new(providers))
    }

    /// Chain over explicit providers, asked in order
    #[must_use]
    pub fn new(providers: Vec<Box<dyn ProvideCredentials>>) -> Self {
        Self { providers }
    }

    /// Names of the providers in the order they are asked
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl ProvideCredentials for DefaultCredentialsChain {
    async fn provide(&self) -> Result<Option<Credentials>> {
        for provider in &self.providers {
            if let Some(credentials) = provider.provide().await? {
                debug!(provider = provider.name(), "AWS credentials resolved");
                return Ok(Some(credentials));
            }
            debug!(provider = provider.name(), "no AWS credentials from provider");
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "default-chain"
    }
}

impl fmt::Debug for DefaultCredentialsChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCredentialsChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}

/// Holds the last resolved credentials until they near expiry
pub(crate) struct CredentialsCache {
    provider: Arc<dyn ProvideCredentials>,
    cached: Mutex<Option<Credentials>>,
}

impl CredentialsCache {
    pub(crate) fn new(provider: Arc<dyn ProvideCredentials>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }

    /// Cached credentials, refreshed from the provider when missing or stale
    pub(crate) async fn get(&self) -> Result<Credentials> {
        let mut cached = self.cached.lock().await;
        let margin = TimeDelta::seconds(REFRESH_MARGIN_SECS);
        if let Some(credentials) = cached.as_ref() {
            if !credentials.expires_within(margin, Utc::now()) {
                return Ok(credentials.clone());
            }
        }

        let fresh = self.provider.provide().await?.ok_or_else(|| {
            ExporterError::MissingCredentials(format!(
                "no AWS credentials found by the {} provider",
                self.provider.name()
            ))
        })?;
        debug!(expires_at = ?fresh.expires_at, "AWS credentials refreshed");
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

/// JSON credentials document served by the container and instance endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct JsonCredentials {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    access_key_id: String,
    #[serde(default)]
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

impl JsonCredentials {
    /// Decode a credentials document served by `source`
    pub(crate) fn parse(body: &str, source: &str) -> Result<Credentials> {
        let doc: Self = serde_json::from_str(body)
            .map_err(|e| ExporterError::Decode(format!("{source} credentials: {e}")))?;

        if let Some(code) = doc.code.as_deref().filter(|c| *c != "Success") {
            return Err(ExporterError::Unauthorized(format!(
                "{source} returned {code}: {}",
                doc.message.unwrap_or_default()
            )));
        }
        if doc.access_key_id.is_empty() || doc.secret_access_key.is_empty() {
            return Err(ExporterError::Decode(format!(
                "{source} credentials are missing the key pair"
            )));
        }

        let mut credentials = Credentials::new(doc.access_key_id, doc.secret_access_key);
        credentials.session_token = doc.token.filter(|t| !t.is_empty());
        if let Some(expiration) = doc.expiration.as_deref() {
            credentials.expires_at = Some(parse_expiration(expiration)?);
        }
        Ok(credentials)
    }
}

/// Parse an RFC 3339 expiry timestamp
pub(crate) fn parse_expiration(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| ExporterError::Decode(format!("bad expiration {value:?}: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn lookup(pairs: &[(&str, &str)]) -> EnvLookup {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Arc::new(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_from_lookup() {
        let vars = lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", " token "),
        ]);
        let creds = Credentials::from_lookup(|k| vars(k)).unwrap();
        assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
        assert_eq!(creds.session_token.as_deref(), Some("token"));
        assert_eq!(creds.expires_at, None);
    }

    #[test]
    fn test_missing_secret() {
        let vars = lookup(&[("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"), ("AWS_SECRET_ACCESS_KEY", "  ")]);
        let err = Credentials::from_lookup(|k| vars(k)).unwrap_err();
        assert!(err.is_auth_error());
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("AKIDEXAMPLE", "super-secret").session_token("tok");
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains(r#"session_token: Some("<redacted>")"#));
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();
        let creds = Credentials::new("a", "b").expiring_at(now + TimeDelta::minutes(3));
        assert!(creds.expires_within(TimeDelta::minutes(5), now));
        assert!(!creds.expires_within(TimeDelta::minutes(1), now));
        assert!(!Credentials::new("a", "b").expires_within(TimeDelta::minutes(5), now));
    }

    #[test]
    fn test_json_credentials() {
        let body = r#"{
  "Code": "Success",
  "LastUpdated": "2024-01-01T00:00:00Z",
  "Type": "AWS-HMAC",
  "AccessKeyId": "ASIAEXAMPLE",
  "SecretAccessKey": "secret",
  "Token": "session",
  "Expiration": "2024-01-01T06:00:00Z"
}"#;
        let creds = JsonCredentials::parse(body, "test").unwrap();
        assert_eq!(creds.access_key_id, "ASIAEXAMPLE");
        assert_eq!(creds.session_token.as_deref(), Some("session"));
        assert_eq!(
            creds.expires_at.unwrap().to_rfc3339(),
            "2024-01-01T06:00:00+00:00"
        );
    }

    #[test]
    fn test_json_credentials_error_code() {
        let body = r#"{"Code": "AssumeRoleUnauthorizedAccess", "Message": "no role"}"#;
        let err = JsonCredentials::parse(body, "test").unwrap_err();
        assert!(err.is_auth_error());
        assert!(err.to_string().contains("no role"));
    }

    /// Returns a fixed answer and counts calls
    struct Counting {
        answer: Option<Credentials>,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(answer: Option<Credentials>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProvideCredentials for Arc<Counting> {
        async fn provide(&self) -> Result<Option<Credentials>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    /// Always fails
    struct Broken;

    #[async_trait]
    impl ProvideCredentials for Broken {
        async fn provide(&self) -> Result<Option<Credentials>> {
            Err(ExporterError::Config("broken profile".into()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_match() {
        let empty = Counting::new(None);
        let first = Counting::new(Some(Credentials::new("first", "s")));
        let second = Counting::new(Some(Credentials::new("second", "s")));
        let chain = DefaultCredentialsChain::new(vec![
            Box::new(empty.clone()),
            Box::new(first.clone()),
            Box::new(second.clone()),
        ]);

        let creds = chain.provide().await.unwrap().unwrap();
        assert_eq!(creds.access_key_id, "first");
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_stops_on_error() {
        let later = Counting::new(Some(Credentials::new("later", "s")));
        let chain = DefaultCredentialsChain::new(vec![Box::new(Broken), Box::new(later.clone())]);

        assert!(chain.provide().await.is_err());
        assert_eq!(later.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_with_nothing_configured() {
        let chain = DefaultCredentialsChain::new(vec![Box::new(Counting::new(None))]);
        assert_eq!(chain.provide().await.unwrap(), None);
    }

    #[test]
    fn test_chain_order_from_environment() {
        let chain = DefaultCredentialsChain::from_lookup(&lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/dns"),
            ("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/token"),
            ("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/v2/credentials/abc"),
        ]))
        .unwrap();
        assert_eq!(
            chain.provider_names(),
            vec!["environment", "profile", "web-identity", "container", "imds"]
        );

        let chain = DefaultCredentialsChain::from_lookup(&lookup(&[(
            "AWS_EC2_METADATA_DISABLED",
            "true",
        )]))
        .unwrap();
        assert_eq!(chain.provider_names(), vec!["profile"]);
    }

    #[tokio::test]
    async fn test_cache_reuses_long_lived_credentials() {
        let source = Counting::new(Some(
            Credentials::new("a", "b").expiring_at(Utc::now() + TimeDelta::hours(1)),
        ));
        let cache = CredentialsCache::new(Arc::new(source.clone()));

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_near_expiry() {
        let source = Counting::new(Some(
            Credentials::new("a", "b").expiring_at(Utc::now() + TimeDelta::minutes(2)),
        ));
        let cache = CredentialsCache::new(Arc::new(source.clone()));

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_reports_missing_credentials() {
        let cache = CredentialsCache::new(Arc::new(Counting::new(None)));
        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, ExporterError::MissingCredentials(_)));
    }
}
