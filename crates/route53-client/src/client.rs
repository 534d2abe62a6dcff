//! Main Route 53 client implementation.

use crate::api::RecordSetsApi;
use crate::config::{DEFAULT_ENDPOINT, SIGNING_REGION, SIGNING_SERVICE};
use crate::credentials::{Credentials, CredentialsCache, ProvideCredentials};
use crate::signing::{canonical_query, uri_encode, Signer};
use crate::xml;
use async_trait::async_trait;
use chrono::Utc;
use dns_exporter_core::{ExporterError, PageCursor, RecordPage, RecordSource, Result};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Route 53 API client
#[derive(Clone)]
pub struct Route53Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    credentials: CredentialsCache,
    endpoint: Url,
}

impl Route53Client {
    /// Create a new client with the given credentials using default settings
    pub fn new(credentials: impl ProvideCredentials + 'static) -> Result<Self> {
        Route53ClientBuilder::new(credentials).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(credentials: impl ProvideCredentials + 'static) -> Route53ClientBuilder {
        Route53ClientBuilder::new(credentials)
    }

    /// Resolve the signing credentials, refreshing them when they near expiry
    pub async fn credentials(&self) -> Result<Credentials> {
        self.inner.credentials.get().await
    }

    /// Access resource record set endpoints
    #[must_use]
    pub fn record_sets(&self) -> RecordSetsApi<'_> {
        RecordSetsApi::new(self)
    }

    /// Endpoint this client talks to
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Perform a signed GET request and return the raw body
    pub(crate) async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let endpoint = &self.inner.endpoint;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ExporterError::InvalidUrl(endpoint.to_string())),
        };

        let base_path = endpoint.path().trim_end_matches('/');
        let canonical_path = uri_encode(&format!("{base_path}{path}"), false);
        let query = canonical_query(params);

        let mut url = endpoint.clone();
        url.set_path(&canonical_path);
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        debug!(url = %url, "GET request");

        let credentials = self.credentials().await?;
        let signed = Signer::new(&credentials, SIGNING_REGION, SIGNING_SERVICE)
            .sign_get(&host, &canonical_path, &query, Utc::now());

        let mut request = self
            .inner
            .http
            .get(url)
            .header("x-amz-date", &signed.amz_date)
            .header(reqwest::header::AUTHORIZATION, &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        self.handle_response(response).await
    }

    /// Return the body of a successful response or classify the failure
    async fn handle_response(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(self.classify_error(status.as_u16(), &body))
        }
    }

    /// Convert an error response to an [`ExporterError`]
    fn classify_error(&self, status: u16, body: &str) -> ExporterError {
        let xml::ErrorDetail { code, message } =
            xml::parse_error(body).unwrap_or_else(|| xml::ErrorDetail {
                code: String::new(),
                message: body.trim().to_string(),
            });

        match (status, code.as_str()) {
            (_, "Throttling" | "ThrottlingException" | "PriorRequestNotComplete") | (429, _) => {
                warn!(code = %code, "Rate limited by Route 53 API");
                ExporterError::Throttled { code: code.clone() }
            }
            (_, "NoSuchHostedZone") => ExporterError::ZoneNotFound { zone: message },
            (401 | 403, _)
            | (_, "InvalidClientTokenId" | "SignatureDoesNotMatch" | "AccessDenied") => {
                ExporterError::Unauthorized(if message.is_empty() {
                    code.clone()
                } else {
                    message
                })
            }
            _ => ExporterError::Api {
                status,
                code: code.clone(),
                message,
            },
        }
    }
}

#[async_trait]
impl RecordSource for Route53Client {
    async fn list_page(&self, zone_id: &str, cursor: Option<&PageCursor>) -> Result<RecordPage> {
        self.record_sets().list(zone_id).start_from(cursor).send().await
    }
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> ExporterError {
    if err.is_timeout() {
        ExporterError::Timeout(err.to_string())
    } else if err.is_connect() {
        ExporterError::Connection(err.to_string())
    } else {
        ExporterError::Http(err.to_string())
    }
}

/// Builder for configuring a [`Route53Client`]
pub struct Route53ClientBuilder {
    credentials: Arc<dyn ProvideCredentials>,
    endpoint: String,
    timeout: Duration,
    user_agent: String,
}

impl Route53ClientBuilder {
    /// Create a new builder with the given credentials source
    #[must_use]
    pub fn new(credentials: impl ProvideCredentials + 'static) -> Self {
        Self {
            credentials: Arc::new(credentials),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("dns-exporter/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the API endpoint (useful for testing or API-compatible fakes)
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Route53Client> {
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| ExporterError::InvalidUrl(format!("{}: {e}", self.endpoint)))?;
        if endpoint.host_str().is_none() {
            return Err(ExporterError::InvalidUrl(self.endpoint));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ExporterError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Route53Client {
            inner: Arc::new(ClientInner {
                http,
                credentials: CredentialsCache::new(self.credentials),
                endpoint,
            }),
        })
    }
}
