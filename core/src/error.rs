use bytes::Bytes;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

type SharedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for awsauth operations.
///
/// `Error` is cheap to clone so that a single failure can be handed to
/// every caller waiting on the same credential refresh.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<SharedSource>,
    context: Vec<String>,
    status: Option<StatusCode>,
    body: Option<Bytes>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Every credential provider has been tried and none produced credentials
    NoCredentialsFound,

    /// The target service was neither supplied nor detectable from the url
    ServiceUndetectable,

    /// The target region was neither supplied nor detectable from the url
    RegionUndetectable,

    /// Request cannot be signed (missing required fields, etc.)
    RequestInvalid,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// The remote answered with a non-2xx status
    HttpStatus,

    /// A single attempt exceeded its timeout
    Timeout,

    /// Connection level failure while sending the request
    Network,

    /// Unexpected errors (I/O, parse failures, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
            status: None,
            body: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        let source: anyhow::Error = source.into();
        let source: Box<dyn std::error::Error + Send + Sync + 'static> = source.into();
        self.source = Some(Arc::from(source));
        self
    }

    /// Attach a line of context, e.g. `"endpoint: http://169.254.169.254"`.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Context lines attached to this error.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Status code returned by the remote, only set for [`ErrorKind::HttpStatus`].
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Response body returned by the remote, only set for [`ErrorKind::HttpStatus`].
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Check if this is a credential error
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialInvalid | ErrorKind::NoCredentialsFound
        )
    }

    /// Transport level failures may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout | ErrorKind::Network)
    }
}

// Convenience constructors
impl Error {
    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a no credentials found error
    pub fn no_credentials_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoCredentialsFound, message)
    }

    /// Create a service undetectable error
    pub fn service_undetectable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUndetectable, message)
    }

    /// Create a region undetectable error
    pub fn region_undetectable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RegionUndetectable, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an http status error carrying the response status and body.
    pub fn http_status(status: StatusCode, body: Bytes) -> Self {
        let mut err = Self::new(
            ErrorKind::HttpStatus,
            format!("request failed with status {status}"),
        );
        err.status = Some(status);
        err.body = Some(body);
        err
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::NoCredentialsFound => write!(f, "no credentials found"),
            ErrorKind::ServiceUndetectable => write!(f, "service undetectable"),
            ErrorKind::RegionUndetectable => write!(f, "region undetectable"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::HttpStatus => write!(f, "http status error"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}
