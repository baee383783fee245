//! Error taxonomy.
//!
//! Errors split by the time they are detected:
//! - [`ConfigurationError`]: registration time. A programming mistake in a
//!   route table; startup aborts.
//! - [`RequestError`]: request time. Recoverable, reported to the transport
//!   which maps the [`ErrorKind`] to a protocol status.

use std::fmt;

use thiserror::Error;

/// Error type carried by handler error returns.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Registration-time validation failure of a route.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The template string could not be parsed.
    #[error("malformed path template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// The same positional index appears twice in one template.
    #[error("duplicate positional argument {{{pos}}} in path '{template}'")]
    DuplicatePosition { template: String, pos: usize },

    /// A positional index does not name a handler parameter.
    #[error("positional argument {{{pos}}} in path '{template}' is out of bounds for a handler with {arity} parameters")]
    PositionOutOfRange {
        template: String,
        pos: usize,
        arity: usize,
    },

    /// More than one handler parameter is left for the body.
    #[error("path '{template}' leaves parameters {uncovered:?} unbound; only one may come from the body")]
    AmbiguousBody {
        template: String,
        uncovered: Vec<usize>,
    },

    /// A path-bound parameter has a non-scalar type.
    #[error("parameter {index} of route {route} is bound to the path but has non-scalar type {type_name}")]
    NonScalarPathArgument {
        route: String,
        index: usize,
        type_name: &'static str,
    },

    /// The handler has more than one error-typed return value.
    #[error("too many error returns for route {route}")]
    TooManyErrorReturns { route: String },

    /// The handler has more than one body return value.
    #[error("too many body returns for route {route}")]
    TooManyBodyReturns { route: String },

    /// A route with this method and template is already registered.
    #[error("duplicate route {route}")]
    DuplicateRoute { route: String },

    /// The response compression level is not a gzip level.
    #[error("gzip level {level} of route {route} is outside 1..=9")]
    InvalidGzipLevel { route: String, level: u32 },
}

/// Classification of a request-time failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No registered route matches the method and path.
    RouteNotFound,
    /// A path argument or the request body could not be decoded.
    DecodeError,
    /// The handler returned an error.
    HandlerError,
    /// The handler's body return could not be serialized.
    EncodeError,
    /// The request body was not declared as JSON.
    UnsupportedContentType,
    /// The request body could not be read.
    ReadBodyError,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RouteNotFound => "route-not-found",
            ErrorKind::DecodeError => "decode-error",
            ErrorKind::HandlerError => "handler-error",
            ErrorKind::EncodeError => "encode-error",
            ErrorKind::UnsupportedContentType => "unsupported-content-type",
            ErrorKind::ReadBodyError => "read-body-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed per-request failure.
#[derive(Debug, Error)]
#[error("{kind}: {source}")]
pub struct RequestError {
    kind: ErrorKind,
    #[source]
    source: BoxError,
}

impl RequestError {
    pub fn new(kind: ErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn route_not_found(method: &str, path: &str) -> Self {
        Self::new(
            ErrorKind::RouteNotFound,
            format!("unknown route: {} '{}'", method, path),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The wrapped cause. For [`ErrorKind::HandlerError`] this is the
    /// handler's own error.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Status code requested through [`CodedError`], if any.
    pub fn code(&self) -> Option<u16> {
        self.source.downcast_ref::<CodedError>().map(|coded| coded.code)
    }

    /// Split into kind and cause.
    pub fn into_parts(self) -> (ErrorKind, BoxError) {
        (self.kind, self.source)
    }
}

/// Handler error carrying the status code the transport should answer with.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct CodedError {
    pub code: u16,
    #[source]
    pub source: BoxError,
}

impl CodedError {
    pub fn new(code: u16, source: impl Into<BoxError>) -> Self {
        Self {
            code,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::route_not_found("GET", "/nope");
        assert_eq!(err.kind(), ErrorKind::RouteNotFound);
        assert_eq!(err.to_string(), "route-not-found: unknown route: GET '/nope'");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_coded_error_code() {
        let err = RequestError::new(ErrorKind::HandlerError, CodedError::new(404, "missing"));
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.cause().to_string(), "missing");
    }
}
