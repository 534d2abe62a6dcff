use serde::{Deserialize, Serialize};

use super::RecordType;

/// A discovery target in the shape of a Prometheus HTTP SD entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target URLs (always exactly one, `https://<name>`)
    pub targets: Vec<String>,

    /// Labels attached to the target
    pub labels: TargetLabels,
}

/// Labels describing where a target came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLabels {
    /// Hosted zone the record was listed from
    pub hosted_zone: String,

    /// Record value (IP address or canonical name)
    pub record: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
}
