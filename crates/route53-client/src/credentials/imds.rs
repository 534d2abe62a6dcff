//! Instance profile credentials from the EC2 instance metadata service (IMDSv2).

use super::{env_value, Credentials, EnvLookup, JsonCredentials, ProvideCredentials};
use crate::client::map_transport_error;
use async_trait::async_trait;
use dns_exporter_core::{ExporterError, Result};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_PATH: &str = "/latest/api/token";
const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_TTL_SECS: &str = "21600";

/// Credentials of the instance profile attached to this EC2 instance
#[derive(Debug, Clone)]
pub struct ImdsProvider {
    http: reqwest::Client,
    endpoint: Url,
}

impl ImdsProvider {
    /// `None` when `AWS_EC2_METADATA_DISABLED` is `true`; the endpoint can be
    /// moved with `AWS_EC2_METADATA_SERVICE_ENDPOINT`
    pub fn from_lookup(lookup: &EnvLookup, http: reqwest::Client) -> Result<Option<Self>> {
        let disabled = env_value(lookup, "AWS_EC2_METADATA_DISABLED")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if disabled {
            return Ok(None);
        }
        let endpoint = env_value(lookup, "AWS_EC2_METADATA_SERVICE_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string());
        Self::new(http, &endpoint).map(Some)
    }

    /// Provider for the metadata service at `endpoint`
    pub fn new(http: reqwest::Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ExporterError::InvalidUrl(format!("{endpoint}: {e}")))?;
        Ok(Self { http, endpoint })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| ExporterError::InvalidUrl(format!("{}{path}: {e}", self.endpoint)))
    }

    /// Session token, or `None` when no metadata service answers
    async fn session_token(&self) -> Result<Option<String>> {
        let response = match self
            .http
            .put(self.url(TOKEN_PATH)?)
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                debug!(error = %e, "instance metadata service unreachable");
                return Ok(None);
            }
            Err(e) => return Err(map_transport_error(e)),
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "instance metadata token refused");
            return Ok(None);
        }
        response
            .text()
            .await
            .map(|token| Some(token.trim().to_string()))
            .map_err(map_transport_error)
    }

    async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .get(self.url(path)?)
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        Ok((status, body))
    }
}

#[async_trait]
impl ProvideCredentials for ImdsProvider {
    async fn provide(&self) -> Result<Option<Credentials>> {
        let Some(token) = self.session_token().await? else {
            return Ok(None);
        };

        let (status, body) = self.get(CREDENTIALS_PATH, &token).await?;
        if status == StatusCode::NOT_FOUND {
            debug!("no instance profile attached");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ExporterError::Api {
                status: status.as_u16(),
                code: "InstanceMetadata".into(),
                message: body.trim().to_string(),
            });
        }
        let Some(role) = body.lines().map(str::trim).find(|line| !line.is_empty()) else {
            return Ok(None);
        };

        let (status, body) = self.get(&format!("{CREDENTIALS_PATH}{role}"), &token).await?;
        if !status.is_success() {
            return Err(ExporterError::Api {
                status: status.as_u16(),
                code: "InstanceMetadata".into(),
                message: body.trim().to_string(),
            });
        }
        JsonCredentials::parse(&body, "instance metadata").map(Some)
    }

    fn name(&self) -> &'static str {
        "imds"
    }
}
