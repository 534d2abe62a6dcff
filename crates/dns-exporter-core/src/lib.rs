//! Core types and traits for the DNS target exporter.
//!
//! This crate provides the foundational pieces shared by the record source
//! client and the refresh engine:
//!
//! - **Types**: record sets as returned by the source, filtered records and
//!   the discovery [`Target`] served to consumers
//! - **Filtering**: the exclusion rule set and the pure [`should_keep`] check
//! - **Source**: the paginated [`RecordSource`] seam
//! - **Errors**: [`ExporterError`] with retry classification
//!
//! # Example
//!
//! ```rust
//! use dns_exporter_core::{should_keep, ExclusionRules, RawRecord, RecordType};
//!
//! let record = RawRecord::new("a.example.com.", RecordType::A, "1.2.3.4");
//! assert!(should_keep(&record, &ExclusionRules::default()));
//!
//! let target = record.into_target("Z1");
//! assert_eq!(target.targets, vec!["https://a.example.com"]);
//! ```

mod error;
pub mod filter;
pub mod source;
pub mod types;

pub use error::{ExporterError, Result};
pub use filter::{evaluate, should_keep, ExclusionRule};
pub use source::RecordSource;
pub use types::*;
