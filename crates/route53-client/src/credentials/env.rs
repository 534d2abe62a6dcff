//! Static keys from `AWS_ACCESS_KEY_ID` and friends.

use super::{env_value, Credentials, EnvLookup, ProvideCredentials};
use async_trait::async_trait;
use dns_exporter_core::Result;

/// Credentials from the `AWS_*` key variables
#[derive(Debug, Clone)]
pub struct EnvironmentProvider {
    credentials: Credentials,
}

impl EnvironmentProvider {
    /// `None` when `AWS_ACCESS_KEY_ID` is unset.
    ///
    /// An access key without its secret is an error rather than a reason to
    /// fall through to the next provider.
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Option<Self>> {
        if env_value(lookup, "AWS_ACCESS_KEY_ID").is_none() {
            return Ok(None);
        }
        let credentials = Credentials::from_lookup(|key| lookup(key))?;
        Ok(Some(Self { credentials }))
    }
}

#[async_trait]
impl ProvideCredentials for EnvironmentProvider {
    async fn provide(&self) -> Result<Option<Credentials>> {
        Ok(Some(self.credentials.clone()))
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
