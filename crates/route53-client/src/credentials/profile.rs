//! Named profiles in `~/.aws/credentials` and `~/.aws/config`.

use super::{env_value, Credentials, EnvLookup, ProvideCredentials};
use async_trait::async_trait;
use dns_exporter_core::{ExporterError, Result};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_PROFILE: &str = "default";

type Sections = HashMap<String, HashMap<String, String>>;

/// Static keys from a named profile in the shared files
#[derive(Debug, Clone)]
pub struct ProfileProvider {
    profile: String,
    credentials_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl ProfileProvider {
    /// Profile from `AWS_PROFILE`, files from `AWS_SHARED_CREDENTIALS_FILE`
    /// and `AWS_CONFIG_FILE` or their locations under the home directory
    #[must_use]
    pub fn from_lookup(lookup: &EnvLookup) -> Self {
        let home = dirs::home_dir().map(|home| home.join(".aws"));
        let file = |key: &str, name: &str| {
            env_value(lookup, key)
                .map(PathBuf::from)
                .or_else(|| home.as_ref().map(|dir| dir.join(name)))
        };

        Self {
            profile: env_value(lookup, "AWS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.into()),
            credentials_file: file("AWS_SHARED_CREDENTIALS_FILE", "credentials"),
            config_file: file("AWS_CONFIG_FILE", "config"),
        }
    }

    /// Provider for `profile` in explicit files
    #[must_use]
    pub fn new(
        profile: impl Into<String>,
        credentials_file: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> Self {
        Self {
            profile: profile.into(),
            credentials_file,
            config_file,
        }
    }

    /// Profile this provider reads
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    async fn from_file(&self, path: Option<&Path>, is_config: bool) -> Result<Option<Credentials>> {
        let Some(path) = path else {
            return Ok(None);
        };
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ExporterError::Config(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };

        let sections = parse_sections(&content, is_config);
        let Some(section) = sections.get(&self.profile) else {
            return Ok(None);
        };
        let key = |name: &str| section.get(name).filter(|v| !v.is_empty()).cloned();

        match (key("aws_access_key_id"), key("aws_secret_access_key")) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let mut credentials = Credentials::new(access_key_id, secret_access_key);
                credentials.session_token = key("aws_session_token");
                Ok(Some(credentials))
            }
            (None, None) => {
                debug!(
                    profile = %self.profile,
                    file = %path.display(),
                    "profile has no static keys"
                );
                Ok(None)
            }
            _ => Err(ExporterError::MissingCredentials(format!(
                "profile {} in {} has only half of its key pair",
                self.profile,
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl ProvideCredentials for ProfileProvider {
    async fn provide(&self) -> Result<Option<Credentials>> {
        if let Some(credentials) = self.from_file(self.credentials_file.as_deref(), false).await? {
            return Ok(Some(credentials));
        }
        self.from_file(self.config_file.as_deref(), true).await
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}

/// Parse INI sections into lower-cased key maps.
///
/// In the config file non-default sections are written `[profile name]`;
/// the prefix is stripped so both files index by bare profile name.
fn parse_sections(content: &str, is_config: bool) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            let header = header.trim();
            let name = if is_config {
                header.strip_prefix("profile ").map_or(header, str::trim)
            } else {
                header
            };
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        // Indented lines belong to a nested block such as `s3 =`
        if line.starts_with(char::is_whitespace) {
            continue;
        }

        let (Some(section), Some((key, value))) = (current.as_ref(), trimmed.split_once('=')) else {
            continue;
        };
        if let Some(entries) = sections.get_mut(section) {
            entries.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    sections
}
