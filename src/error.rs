//! Unified error type.
//!
//! Application-level errors (404, 422, ...) are expressed as HTTP
//! [`Response`](crate::Response) values, not as `Error`s. This type surfaces
//! infrastructure failures and the handful of API-misuse cases the toolkit
//! must report rather than silently swallow: a malformed or duplicate route
//! (registration time only, never at lookup), a URL that cannot be resolved,
//! a decode target with no registered codec, and a cancelled client request.

use std::fmt;
use std::sync::Arc;

use http::Method;

/// The error type returned by corehttp's fallible operations.
#[derive(Debug, Clone)]
pub enum Error {
    /// An I/O failure: binding to a port, accepting a connection, a failed
    /// read/write on a socket.
    Io(Arc<std::io::Error>),
    /// A route pattern failed validation at registration time.
    InvalidPattern { pattern: String, reason: &'static str },
    /// A `(method, pattern)` pair was already registered on this matcher.
    DuplicateRoute { method: Method, pattern: String },
    /// A base URL, relative path, or resolved URL could not be constructed.
    InvalidUrl(String),
    /// The caller supplied a decode target the codec layer cannot populate
    /// (for example a non-pointer target).
    InvalidDataFormat(&'static str),
    /// No codec is registered for a content type and no default was set.
    DecoderNotFound(String),
    /// An opaque failure from the pluggable transport. Eligible for retry.
    Transport(Arc<dyn std::error::Error + Send + Sync>),
    /// The request's context was cancelled or its deadline elapsed. Never
    /// retried.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern `{pattern}`: {reason}")
            }
            Self::DuplicateRoute { method, pattern } => {
                write!(f, "duplicate route: {method} {pattern}")
            }
            Self::InvalidUrl(msg) => write!(f, "invalid url: {msg}"),
            Self::InvalidDataFormat(msg) => write!(f, "invalid data format: {msg}"),
            Self::DecoderNotFound(content_type) => {
                write!(f, "no codec registered for content type `{content_type}`")
            }
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            Self::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

impl Error {
    /// Whether this error, surfaced from a client attempt, is eligible for
    /// the built-in retry condition (transport and I/O errors always are;
    /// cancellation never is).
    pub fn is_retryable_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}
