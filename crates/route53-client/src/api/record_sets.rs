//! Resource record set endpoints.

use crate::config::API_VERSION;
use crate::xml;
use crate::Route53Client;
use dns_exporter_core::{PageCursor, RecordPage, Result};

/// Resource record set endpoints
pub struct RecordSetsApi<'a> {
    client: &'a Route53Client,
}

impl<'a> RecordSetsApi<'a> {
    pub(crate) const fn new(client: &'a Route53Client) -> Self {
        Self { client }
    }

    /// List record sets of a hosted zone, one page per request
    ///
    /// Accepts both bare ids (`Z1D633PJN98FT9`) and the `/hostedzone/` form.
    #[must_use]
    pub fn list(&self, zone_id: impl Into<String>) -> ListRecordSetsRequestBuilder<'a> {
        ListRecordSetsRequestBuilder::new(self.client, zone_id.into())
    }
}

/// Builder for `ListResourceRecordSets` requests
pub struct ListRecordSetsRequestBuilder<'a> {
    client: &'a Route53Client,
    zone_id: String,
    start_name: Option<String>,
    start_type: Option<String>,
    start_identifier: Option<String>,
    max_items: Option<u32>,
}

impl<'a> ListRecordSetsRequestBuilder<'a> {
    const fn new(client: &'a Route53Client, zone_id: String) -> Self {
        Self {
            client,
            zone_id,
            start_name: None,
            start_type: None,
            start_identifier: None,
            max_items: None,
        }
    }

    /// Start listing at this record name
    #[must_use]
    pub fn start_record_name(mut self, name: impl Into<String>) -> Self {
        self.start_name = Some(name.into());
        self
    }

    /// Start listing at this record type (requires a start name)
    #[must_use]
    pub fn start_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.start_type = Some(record_type.into());
        self
    }

    /// Start listing at this set identifier
    #[must_use]
    pub fn start_record_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.start_identifier = Some(identifier.into());
        self
    }

    /// Continue from a cursor returned by a previous page; `None` starts at the top
    #[must_use]
    pub fn start_from(mut self, cursor: Option<&PageCursor>) -> Self {
        if let Some(cursor) = cursor {
            self.start_name = Some(cursor.name.clone());
            self.start_type.clone_from(&cursor.record_type);
            self.start_identifier.clone_from(&cursor.identifier);
        }
        self
    }

    /// Limit the number of record sets per page (the API caps this at 300)
    #[must_use]
    pub const fn max_items(mut self, max: u32) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Execute the request
    pub async fn send(self) -> Result<RecordPage> {
        let zone = self
            .zone_id
            .trim()
            .trim_start_matches("/hostedzone/")
            .to_string();
        let max_items = self.max_items.map(|m| m.to_string());

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(ref name) = self.start_name {
            params.push(("name", name.as_str()));
        }
        if let Some(ref rtype) = self.start_type {
            params.push(("type", rtype.as_str()));
        }
        if let Some(ref identifier) = self.start_identifier {
            params.push(("identifier", identifier.as_str()));
        }
        if let Some(ref max) = max_items {
            params.push(("maxitems", max.as_str()));
        }

        let body = self
            .client
            .get(&format!("/{API_VERSION}/hostedzone/{zone}/rrset"), &params)
            .await?;

        xml::parse_record_page(&body)
    }
}
