//! Task role credentials from the ECS / EKS Pod Identity container endpoint.

use super::{env_value, Credentials, EnvLookup, JsonCredentials, ProvideCredentials};
use crate::client::map_transport_error;
use async_trait::async_trait;
use dns_exporter_core::{ExporterError, Result};
use reqwest::header::AUTHORIZATION;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Host serving `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`
const ECS_CREDENTIALS_HOST: &str = "http://169.254.170.2";

#[derive(Clone)]
enum Authorization {
    Token(String),
    TokenFile(PathBuf),
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::TokenFile(path) => f.debug_tuple("TokenFile").field(path).finish(),
        }
    }
}

/// Credentials served to a container by its orchestrator
#[derive(Debug, Clone)]
pub struct ContainerProvider {
    http: reqwest::Client,
    uri: Url,
    authorization: Option<Authorization>,
}

impl ContainerProvider {
    /// `None` unless `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` or
    /// `AWS_CONTAINER_CREDENTIALS_FULL_URI` is set.
    ///
    /// The authorization header comes from
    /// `AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE`, re-read on every request,
    /// or `AWS_CONTAINER_AUTHORIZATION_TOKEN`.
    pub fn from_lookup(lookup: &EnvLookup, http: reqwest::Client) -> Result<Option<Self>> {
        let uri = match (
            env_value(lookup, "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI"),
            env_value(lookup, "AWS_CONTAINER_CREDENTIALS_FULL_URI"),
        ) {
            (Some(relative), _) => format!("{ECS_CREDENTIALS_HOST}{relative}"),
            (None, Some(full)) => full,
            (None, None) => return Ok(None),
        };
        let uri = Url::parse(&uri).map_err(|e| ExporterError::InvalidUrl(format!("{uri}: {e}")))?;

        let authorization = env_value(lookup, "AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE")
            .map(|path| Authorization::TokenFile(path.into()))
            .or_else(|| {
                env_value(lookup, "AWS_CONTAINER_AUTHORIZATION_TOKEN").map(Authorization::Token)
            });

        Ok(Some(Self {
            http,
            uri,
            authorization,
        }))
    }

    /// Credentials endpoint in use
    #[must_use]
    pub const fn uri(&self) -> &Url {
        &self.uri
    }

    async fn authorization(&self) -> Result<Option<String>> {
        match &self.authorization {
            None => Ok(None),
            Some(Authorization::Token(token)) => Ok(Some(token.clone())),
            Some(Authorization::TokenFile(path)) => tokio::fs::read_to_string(path)
                .await
                .map(|token| Some(token.trim().to_string()))
                .map_err(|e| {
                    ExporterError::Config(format!(
                        "reading container authorization token {}: {e}",
                        path.display()
                    ))
                }),
        }
    }
}

#[async_trait]
impl ProvideCredentials for ContainerProvider {
    async fn provide(&self) -> Result<Option<Credentials>> {
        let mut request = self.http.get(self.uri.clone());
        if let Some(token) = self.authorization().await? {
            request = request.header(AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(ExporterError::Api {
                status: status.as_u16(),
                code: "ContainerCredentials".into(),
                message: body.trim().to_string(),
            });
        }

        JsonCredentials::parse(&body, "container endpoint").map(Some)
    }

    fn name(&self) -> &'static str {
        "container"
    }
}
