//! HTTP client for the Route 53 record listing API.
//!
//! This crate provides [`Route53Client`], which lists resource record sets of
//! a hosted zone page by page and implements
//! [`RecordSource`](dns_exporter_core::RecordSource) for the refresh engine.

mod client;
mod config;
pub mod credentials;
mod signing;
mod xml;
pub mod api;

pub use client::{Route53Client, Route53ClientBuilder};
pub use config::*;
pub use credentials::{Credentials, DefaultCredentialsChain, ProvideCredentials};
pub use dns_exporter_core::{ExporterError, Result};
