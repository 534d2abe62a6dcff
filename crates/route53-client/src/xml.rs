//! XML documents returned by the Route 53 and STS APIs.

use crate::credentials::{parse_expiration, Credentials};
use dns_exporter_core::{ExporterError, PageCursor, RecordPage, RecordSet, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListResourceRecordSetsResponse {
    resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_record_name: Option<String>,
    #[serde(default)]
    next_record_type: Option<String>,
    #[serde(default)]
    next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecordSet {
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(default)]
    resource_records: Option<ResourceRecords>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    items: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecord {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorDetail,
}

/// The `<Error>` element of an error response
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResponse {
    assume_role_with_web_identity_result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

/// Decode a `ListResourceRecordSetsResponse` body into a page
pub(crate) fn parse_record_page(body: &str) -> Result<RecordPage> {
    let response: ListResourceRecordSetsResponse =
        quick_xml::de::from_str(body).map_err(|e| ExporterError::Decode(e.to_string()))?;

    let records = response
        .resource_record_sets
        .items
        .into_iter()
        .map(|set| RecordSet {
            name: set.name,
            record_type: set.record_type,
            values: set
                .resource_records
                .unwrap_or_default()
                .items
                .into_iter()
                .map(|r| r.value)
                .collect(),
        })
        .collect();

    let next = if response.is_truncated {
        let name = response.next_record_name.ok_or_else(|| {
            ExporterError::Decode("truncated page without NextRecordName".into())
        })?;
        Some(PageCursor {
            name,
            record_type: response.next_record_type,
            identifier: response.next_record_identifier,
        })
    } else {
        None
    };

    Ok(RecordPage { records, next })
}

/// Decode an `ErrorResponse` body, if it is one
pub(crate) fn parse_error(body: &str) -> Option<ErrorDetail> {
    quick_xml::de::from_str::<ErrorResponse>(body)
        .ok()
        .map(|r| r.error)
}

/// Decode the credentials of an `AssumeRoleWithWebIdentityResponse`
pub(crate) fn parse_assume_role(body: &str) -> Result<Credentials> {
    let response: AssumeRoleWithWebIdentityResponse =
        quick_xml::de::from_str(body).map_err(|e| ExporterError::Decode(e.to_string()))?;
    let sts = response.assume_role_with_web_identity_result.credentials;

    Ok(Credentials::new(sts.access_key_id, sts.secret_access_key)
        .session_token(sts.session_token)
        .expiring_at(parse_expiration(&sts.expiration)?))
}
