use http::StatusCode;

/// Errors produced by an [`HttpService`](crate::HttpService)
///
/// A response is never an error here, whatever its status code; callers
/// decide what a status means to them.
#[derive(thiserror::Error, Debug)]
pub enum HttpServiceError {
    /// The request could not be built from its parts
    #[error("HTTP Error: {:?}", .0)]
    Http(#[from] http::Error),
    /// The request did not complete within the configured timeout
    #[error("Request timed out: {:?}", .0)]
    TimedOut(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// The response could not be decoded
    #[error("Decode error: {:?}", .0)]
    Decode(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// Reading or writing a body failed
    #[error("Body error: {:?}", .0)]
    Body(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// A connection to the endpoint could not be established
    #[error("Connect error: {:?}", .0)]
    Connect(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// The underlying HTTP client could not be built
    #[error("Could not build HTTP client: {:?}", .0)]
    Client(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// Anything else
    #[error("Unexpected HTTP error: {:?}", .0)]
    Unexpected(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl HttpServiceError {
    /// Whether this error comes from failing to connect
    pub fn is_connect(&self) -> bool {
        matches!(self, HttpServiceError::Connect(_))
    }
    /// Whether this error comes from a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpServiceError::TimedOut(_))
    }
}

/// A status code together with how it is rendered in logs
pub fn describe_status(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
