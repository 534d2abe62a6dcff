//! AWS Signature Version 4 signing for GET requests.
//!
//! Route 53 is a global service signed in the `us-east-1` scope. Only the
//! headers needed for a bodyless GET are signed: `host`, `x-amz-date` and,
//! for temporary credentials, `x-amz-security-token`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of the empty request body
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Headers to attach to a signed request
#[derive(Debug, Clone)]
pub(crate) struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

/// Signs requests for one service/region scope
pub(crate) struct Signer<'a> {
    credentials: &'a Credentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> Signer<'a> {
    pub(crate) const fn new(
        credentials: &'a Credentials,
        region: &'a str,
        service: &'a str,
    ) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Sign a GET request.
    ///
    /// `path` must already be URI-encoded and `query` must be the canonical
    /// query string (see [`canonical_query`]).
    pub(crate) fn sign_get(
        &self,
        host: &str,
        path: &str,
        query: &str,
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let date = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);

        let mut canonical_headers = format!("host:{host}\nx-amz-date:{amz_date}\n");
        let mut signed_headers = String::from("host;x-amz-date");
        if let Some(token) = &self.credentials.session_token {
            canonical_headers.push_str("x-amz-security-token:");
            canonical_headers.push_str(token.trim());
            canonical_headers.push('\n');
            signed_headers.push_str(";x-amz-security-token");
        }

        let canonical_request = format!(
            "GET\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{EMPTY_PAYLOAD_SHA256}"
        );

        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex_sha256(canonical_request.as_bytes())
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            &date,
            self.region,
            self.service,
        );
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        SignedHeaders {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credentials.access_key_id
            ),
            amz_date,
            security_token: self.credentials.session_token.clone(),
        }
    }
}

/// Build the canonical query string: encoded pairs sorted by key, then value.
pub(crate) fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// URI-encode per RFC 3986 unreserved characters, optionally keeping `/`.
pub(crate) fn uri_encode(value: &str, encode_slash: bool) -> String {
    use std::fmt::Write;

    let mut result = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(char::from(byte));
            }
            b'/' if !encode_slash => result.push('/'),
            _ => {
                let _ = write!(result, "%{byte:02X}");
            }
        }
    }
    result
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}
