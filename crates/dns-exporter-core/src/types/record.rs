use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Target, TargetLabels};

/// Record types that are exported as discovery targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Canonical name record
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    /// Parse a wire type name; anything other than `A` or `CNAME` yields `None`
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "A" => Some(Self::A),
            "CNAME" => Some(Self::Cname),
            _ => None,
        }
    }

    /// Wire name of the record type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set exactly as listed by the record source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Fully qualified name, usually with a trailing dot
    pub name: String,

    /// Record type as reported by the source (A, AAAA, CNAME, MX, ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Resource record values, empty for alias records
    #[serde(default)]
    pub values: Vec<String>,
}

impl RecordSet {
    /// Create a record set
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Continuation point for the next page of a record listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    /// Name of the first record set on the next page
    pub name: String,

    /// Type of the first record set on the next page
    #[serde(default)]
    pub record_type: Option<String>,

    /// Set identifier for weighted/latency/failover record sets
    #[serde(default)]
    pub identifier: Option<String>,
}

impl PageCursor {
    /// Create a cursor starting at the given record name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: None,
            identifier: None,
        }
    }

    /// Set the record type component
    #[must_use]
    pub fn with_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Set the set identifier component
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// One page of record sets for a zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    /// Record sets in source order
    pub records: Vec<RecordSet>,

    /// Where the next page starts, `None` on the last page
    pub next: Option<PageCursor>,
}

impl RecordPage {
    /// Create a final page (no continuation)
    #[must_use]
    pub const fn last(records: Vec<RecordSet>) -> Self {
        Self { records, next: None }
    }

    /// Returns true if more pages follow
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.next.is_some()
    }
}

/// An A or CNAME record reduced to the fields the filter inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record name with the trailing dot stripped
    pub name: String,

    /// Record type
    pub record_type: RecordType,

    /// First resource record value, empty if there is none
    pub value: String,
}

impl RawRecord {
    /// Create a raw record, stripping a trailing dot from the name
    #[must_use]
    pub fn new(name: &str, record_type: RecordType, value: impl Into<String>) -> Self {
        Self {
            name: name.trim_end_matches('.').to_string(),
            record_type,
            value: value.into(),
        }
    }

    /// Reduce a listed record set; `None` for types other than A and CNAME
    #[must_use]
    pub fn from_record_set(set: &RecordSet) -> Option<Self> {
        let record_type = RecordType::from_wire(&set.record_type)?;
        let value = set.values.first().cloned().unwrap_or_default();
        Some(Self::new(&set.name, record_type, value))
    }

    /// Render as a discovery target for the given hosted zone
    #[must_use]
    pub fn into_target(self, hosted_zone: &str) -> Target {
        Target {
            targets: vec![format!("https://{}", self.name.to_lowercase())],
            labels: TargetLabels {
                hosted_zone: hosted_zone.to_string(),
                record: self.value,
                record_type: self.record_type,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_from_wire() {
        assert_eq!(RecordType::from_wire("A"), Some(RecordType::A));
        assert_eq!(RecordType::from_wire("CNAME"), Some(RecordType::Cname));
        assert_eq!(RecordType::from_wire("AAAA"), None);
        assert_eq!(RecordType::from_wire("cname"), None);
        assert_eq!(RecordType::Cname.to_string(), "CNAME");
    }

    #[test]
    fn test_from_record_set_strips_trailing_dot() {
        let set = RecordSet::new("a.example.com.", "A", ["1.2.3.4", "5.6.7.8"]);
        let record = RawRecord::from_record_set(&set).unwrap();
        assert_eq!(record.name, "a.example.com");
        assert_eq!(record.record_type, RecordType::A);
        // Only the first value is kept
        assert_eq!(record.value, "1.2.3.4");
    }

    #[test]
    fn test_from_record_set_skips_other_types() {
        for kind in ["AAAA", "MX", "TXT", "NS", "SOA"] {
            let set = RecordSet::new("example.com.", kind, ["x"]);
            assert!(RawRecord::from_record_set(&set).is_none(), "{kind} kept");
        }
    }

    #[test]
    fn test_alias_record_has_empty_value() {
        let set = RecordSet::new("alias.example.com.", "A", Vec::<String>::new());
        let record = RawRecord::from_record_set(&set).unwrap();
        assert_eq!(record.value, "");
    }

    #[test]
    fn test_into_target_lowercases_url_only() {
        let record = RawRecord::new("WWW.Example.com.", RecordType::Cname, "LB.Example.net");
        let target = record.into_target("Z1");
        assert_eq!(target.targets, vec!["https://www.example.com"]);
        assert_eq!(target.labels.record, "LB.Example.net");
        assert_eq!(target.labels.hosted_zone, "Z1");
        assert_eq!(target.labels.record_type, RecordType::Cname);
    }

    #[test]
    fn test_page_cursor_builder() {
        let cursor = PageCursor::new("b.example.com.")
            .with_type("A")
            .with_identifier("primary");
        assert_eq!(cursor.record_type.as_deref(), Some("A"));
        assert_eq!(cursor.identifier.as_deref(), Some("primary"));

        let page = RecordPage {
            records: Vec::new(),
            next: Some(cursor),
        };
        assert!(page.is_truncated());
        assert!(!RecordPage::last(Vec::new()).is_truncated());
    }
}
