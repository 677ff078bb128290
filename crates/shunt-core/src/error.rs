//! Error types for shunt

use crate::capability::Capability;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for shunt
///
/// Variants fall in three groups. Configuration errors are returned from
/// constructors and loaders. Protocol-state errors are returned to a
/// handler that misuses its response writer. Transport errors come from
/// the underlying writer, usually because the client went away.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Header name rejected at setup time
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    /// Header value rejected at setup time
    #[error("Invalid value for header '{name}'")]
    InvalidHeaderValue {
        /// Header name the value was meant for
        name: String,
    },

    /// Status code outside 100..=999
    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),

    /// Internal redirect target rejected at setup time
    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    /// The response was handed to a substitute handler
    #[error("response has been diverted to a substitute handler")]
    Diverted,

    /// The connection was taken over by the handler
    #[error("connection has been hijacked")]
    Hijacked,

    /// Headers were already sent to the client
    #[error("headers have already been committed")]
    HeadersCommitted,

    /// The underlying writer does not implement the capability
    #[error("{0} is not supported by this response writer")]
    NotSupported(Capability),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
}

impl Error {
    /// Whether this error reports protocol state rather than a failure.
    ///
    /// A handler that keeps writing after a diversion or a hijack gets
    /// one of these; the response itself is fine.
    pub fn is_protocol_state(&self) -> bool {
        matches!(
            self,
            Error::Diverted | Error::Hijacked | Error::HeadersCommitted | Error::NotSupported(_)
        )
    }

    /// Whether this error was raised while building configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::InvalidHeaderName(_)
                | Error::InvalidHeaderValue { .. }
                | Error::InvalidStatus(_)
                | Error::InvalidRedirect(_)
        )
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName(e.to_string())
    }
}
