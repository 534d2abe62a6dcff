//! Record filtering against the configured exclusion lists.
//!
//! Rules are evaluated in a fixed order and the first match drops the
//! record. Matching is exact and case-sensitive.

use std::fmt;

use crate::types::{ExclusionRules, RawRecord};

/// The exclusion rule that dropped a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Name contains an `excluded_substrings` entry
    NameSubstring,
    /// Name starts with an `excluded_prefixes` entry
    NamePrefix,
    /// Name ends with an `excluded_suffixes` entry
    NameSuffix,
    /// Value contains an `excluded_record_substrings` entry
    ValueSubstring,
    /// Value ends with an `excluded_suffixes` entry
    ValueSuffix,
    /// Value starts with an `excluded_ip_prefixes` entry
    IpPrefix,
}

impl ExclusionRule {
    /// Name of the configuration list behind this rule
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameSubstring => "EXCLUDED_SUBSTRINGS",
            Self::NamePrefix => "EXCLUDED_PREFIXES",
            Self::NameSuffix => "EXCLUDED_SUFFIXES",
            Self::ValueSubstring => "EXCLUDED_RECORD_SUBSTRINGS",
            Self::ValueSuffix => "EXCLUDED_SUFFIXES (record value)",
            Self::IpPrefix => "EXCLUDED_IP_PREFIXES",
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn any_match(patterns: &[String], pred: impl Fn(&str) -> bool) -> bool {
    patterns.iter().any(|p| pred(p))
}

/// Find the first exclusion rule matching `record`, if any
#[must_use]
pub fn evaluate(record: &RawRecord, rules: &ExclusionRules) -> Option<ExclusionRule> {
    let name = record.name.as_str();
    let value = record.value.as_str();

    if any_match(&rules.excluded_substrings, |s| name.contains(s)) {
        return Some(ExclusionRule::NameSubstring);
    }
    if any_match(&rules.excluded_prefixes, |p| name.starts_with(p)) {
        return Some(ExclusionRule::NamePrefix);
    }
    if any_match(&rules.excluded_suffixes, |s| name.ends_with(s)) {
        return Some(ExclusionRule::NameSuffix);
    }
    if any_match(&rules.excluded_record_substrings, |s| value.contains(s)) {
        return Some(ExclusionRule::ValueSubstring);
    }
    if any_match(&rules.excluded_suffixes, |s| value.ends_with(s)) {
        return Some(ExclusionRule::ValueSuffix);
    }
    if any_match(&rules.excluded_ip_prefixes, |p| value.starts_with(p)) {
        return Some(ExclusionRule::IpPrefix);
    }

    None
}

/// Returns true if no exclusion rule matches `record`
#[must_use]
pub fn should_keep(record: &RawRecord, rules: &ExclusionRules) -> bool {
    evaluate(record, rules).is_none()
}
