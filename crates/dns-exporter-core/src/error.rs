use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Errors that can occur while enumerating and exporting DNS records
#[derive(Error, Debug)]
pub enum ExporterError {
    /// The record source throttled the request
    #[error("request throttled by record source: {code}")]
    Throttled {
        /// Error code reported by the source (e.g. `Throttling`)
        code: String,
    },

    /// Credentials were rejected or the signature did not match
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// No AWS credentials could be found
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The hosted zone does not exist
    #[error("hosted zone not found: {zone}")]
    ZoneNotFound {
        /// Hosted zone identifier as requested
        zone: String,
    },

    /// The source returned an error response
    #[error("API error ({status} {code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error code from the response body
        code: String,
        /// Error message from the response body
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// A page could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ExporterError {
    /// Returns true if the error is transient and worth retrying soon
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled { .. } | Self::Timeout(_) | Self::Connection(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized(_)
            | Self::MissingCredentials(_)
            | Self::ZoneNotFound { .. }
            | Self::Decode(_)
            | Self::InvalidUrl(_)
            | Self::Config(_) => false,
        }
    }

    /// Returns true if the error is due to authentication
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::MissingCredentials(_))
    }

    /// Returns the HTTP status code if this error came from a response
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Throttled { .. } => Some(429),
            Self::Unauthorized(_) => Some(403),
            Self::ZoneNotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
