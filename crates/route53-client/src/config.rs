//! Client configuration types.

/// Global Route 53 API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Region used to sign Route 53 requests (the service is global)
pub const SIGNING_REGION: &str = "us-east-1";

/// Service name used in the signing scope
pub const SIGNING_SERVICE: &str = "route53";

/// AWS API version segment of every Route 53 path
pub const API_VERSION: &str = "2013-04-01";
