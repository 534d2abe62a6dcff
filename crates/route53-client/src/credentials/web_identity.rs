//! Role credentials from STS `AssumeRoleWithWebIdentity`, as used by
//! Kubernetes service accounts (IRSA).

use super::{env_value, Credentials, EnvLookup, ProvideCredentials};
use crate::client::map_transport_error;
use crate::xml;
use async_trait::async_trait;
use chrono::Utc;
use dns_exporter_core::{ExporterError, Result};
use reqwest::header::CONTENT_TYPE;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

const GLOBAL_STS_ENDPOINT: &str = "https://sts.amazonaws.com";
const STS_API_VERSION: &str = "2011-06-15";

/// Exchanges a web identity token file for role credentials
#[derive(Debug, Clone)]
pub struct WebIdentityProvider {
    http: reqwest::Client,
    token_file: PathBuf,
    role_arn: String,
    session_name: String,
    endpoint: Url,
}

impl WebIdentityProvider {
    /// `None` unless both `AWS_WEB_IDENTITY_TOKEN_FILE` and `AWS_ROLE_ARN`
    /// are set.
    ///
    /// STS is reached at `AWS_ENDPOINT_URL_STS`, else the regional endpoint
    /// for `AWS_REGION`/`AWS_DEFAULT_REGION`, else the global one.
    pub fn from_lookup(lookup: &EnvLookup, http: reqwest::Client) -> Result<Option<Self>> {
        let (Some(token_file), Some(role_arn)) = (
            env_value(lookup, "AWS_WEB_IDENTITY_TOKEN_FILE"),
            env_value(lookup, "AWS_ROLE_ARN"),
        ) else {
            return Ok(None);
        };

        let endpoint = env_value(lookup, "AWS_ENDPOINT_URL_STS")
            .or_else(|| {
                env_value(lookup, "AWS_REGION")
                    .or_else(|| env_value(lookup, "AWS_DEFAULT_REGION"))
                    .map(|region| format!("https://sts.{region}.amazonaws.com"))
            })
            .unwrap_or_else(|| GLOBAL_STS_ENDPOINT.to_string());
        let session_name = env_value(lookup, "AWS_ROLE_SESSION_NAME")
            .unwrap_or_else(|| format!("dns-exporter-{}", Utc::now().timestamp_millis()));

        Self::new(http, token_file, role_arn, session_name, &endpoint).map(Some)
    }

    /// Provider with explicit settings
    pub fn new(
        http: reqwest::Client,
        token_file: impl Into<PathBuf>,
        role_arn: impl Into<String>,
        session_name: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ExporterError::InvalidUrl(format!("{endpoint}: {e}")))?;
        Ok(Self {
            http,
            token_file: token_file.into(),
            role_arn: role_arn.into(),
            session_name: session_name.into(),
            endpoint,
        })
    }

    /// STS endpoint in use
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ProvideCredentials for WebIdentityProvider {
    async fn provide(&self) -> Result<Option<Credentials>> {
        let token = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| {
                ExporterError::Config(format!(
                    "reading web identity token {}: {e}",
                    self.token_file.display()
                ))
            })?;

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("Version", STS_API_VERSION)
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.session_name)
            .append_pair("WebIdentityToken", token.trim())
            .finish();
        debug!(
            role_arn = %self.role_arn,
            endpoint = %self.endpoint,
            "assuming role with web identity"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let detail = xml::parse_error(&body).unwrap_or_default();
            let message = format!("{}: {}", detail.code, detail.message);
            return Err(if matches!(status.as_u16(), 400 | 401 | 403) {
                ExporterError::Unauthorized(message)
            } else {
                ExporterError::Api {
                    status: status.as_u16(),
                    code: detail.code,
                    message: detail.message,
                }
            });
        }

        xml::parse_assume_role(&body).map(Some)
    }

    fn name(&self) -> &'static str {
        "web-identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::tests::lookup;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESPONSE: &str = r#"<AssumeRoleWithWebIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleWithWebIdentityResult>
    <SubjectFromWebIdentityToken>system:serviceaccount:monitoring:dns-exporter</SubjectFromWebIdentityToken>
    <AssumedRoleUser>
      <Arn>arn:aws:sts::123456789012:assumed-role/dns/session</Arn>
      <AssumedRoleId>AROAEXAMPLE:session</AssumedRoleId>
    </AssumedRoleUser>
    <Credentials>
      <AccessKeyId>ASIAWEBIDENTITY</AccessKeyId>
      <SecretAccessKey>web-secret</SecretAccessKey>
      <SessionToken>web-token</SessionToken>
      <Expiration>2030-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleWithWebIdentityResult>
  <ResponseMetadata><RequestId>abc</RequestId></ResponseMetadata>
</AssumeRoleWithWebIdentityResponse>"#;

    fn token_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "eyJhbGciOiJSUzI1NiJ9.payload.sig").unwrap();
        file
    }

    #[tokio::test]
    async fn test_assume_role_with_web_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("Action=AssumeRoleWithWebIdentity"))
            .and(body_string_contains("RoleSessionName=dns-test"))
            .and(body_string_contains("WebIdentityToken=eyJhbGciOiJSUzI1NiJ9.payload.sig"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESPONSE))
            .expect(1)
            .mount(&server)
            .await;

        let token = token_file();
        let provider = WebIdentityProvider::from_lookup(
            &lookup(&[
                ("AWS_WEB_IDENTITY_TOKEN_FILE", token.path().to_str().unwrap()),
                ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/dns"),
                ("AWS_ROLE_SESSION_NAME", "dns-test"),
                ("AWS_ENDPOINT_URL_STS", server.uri().as_str()),
            ]),
            reqwest::Client::new(),
        )
        .unwrap()
        .unwrap();

        let creds = provider.provide().await.unwrap().unwrap();
        assert_eq!(creds.access_key_id, "ASIAWEBIDENTITY");
        assert_eq!(creds.secret_access_key, "web-secret");
        assert_eq!(creds.session_token.as_deref(), Some("web-token"));
        assert_eq!(creds.expires_at.unwrap().to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                "<ErrorResponse><Error><Type>Sender</Type><Code>InvalidIdentityToken</Code>\
                 <Message>expired</Message></Error></ErrorResponse>",
            ))
            .mount(&server)
            .await;

        let token = token_file();
        let provider = WebIdentityProvider::new(
            reqwest::Client::new(),
            token.path(),
            "arn:aws:iam::123456789012:role/dns",
            "dns-test",
            &server.uri(),
        )
        .unwrap();

        let err = provider.provide().await.unwrap_err();
        assert!(err.is_auth_error());
        assert!(err.to_string().contains("InvalidIdentityToken"));
    }

    #[tokio::test]
    async fn test_unreadable_token_file() {
        let provider = WebIdentityProvider::new(
            reqwest::Client::new(),
            "/nonexistent/token",
            "arn:aws:iam::123456789012:role/dns",
            "dns-test",
            "https://sts.amazonaws.com",
        )
        .unwrap();
        assert!(matches!(provider.provide().await, Err(ExporterError::Config(_))));
    }

    #[test]
    fn test_needs_role_and_token() {
        let only_role = lookup(&[("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/dns")]);
        let provider = WebIdentityProvider::from_lookup(&only_role, reqwest::Client::new());
        assert!(provider.unwrap().is_none());
    }

    #[test]
    fn test_regional_endpoint() {
        let provider = WebIdentityProvider::from_lookup(
            &lookup(&[
                ("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/token"),
                ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/dns"),
                ("AWS_REGION", "eu-west-1"),
            ]),
            reqwest::Client::new(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(provider.endpoint().as_str(), "https://sts.eu-west-1.amazonaws.com/");
    }
}
