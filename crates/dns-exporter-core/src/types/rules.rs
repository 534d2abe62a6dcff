use serde::{Deserialize, Serialize};

/// Exclusion lists applied to record names and values.
///
/// `excluded_suffixes` is checked against both the record name and the
/// record value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    /// Drop records whose name contains any of these
    pub excluded_substrings: Vec<String>,

    /// Drop records whose name starts with any of these
    pub excluded_prefixes: Vec<String>,

    /// Drop records whose name or value ends with any of these
    pub excluded_suffixes: Vec<String>,

    /// Drop records whose value contains any of these
    pub excluded_record_substrings: Vec<String>,

    /// Drop records whose value starts with any of these
    pub excluded_ip_prefixes: Vec<String>,
}

impl ExclusionRules {
    /// Returns true if no list has any entry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excluded_substrings.is_empty()
            && self.excluded_prefixes.is_empty()
            && self.excluded_suffixes.is_empty()
            && self.excluded_record_substrings.is_empty()
            && self.excluded_ip_prefixes.is_empty()
    }
}
