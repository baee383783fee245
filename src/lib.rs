//! REST request routing with signature-checked handlers.
//!
//! Handlers are plain Rust functions. Their parameter and return types are
//! checked against a path template when a [`Route`] is registered; requests
//! are then routed through a trie and their arguments decoded from the path
//! and a JSON body.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod services;

pub use config::schema::MuxConfig;
pub use error::{BoxError, CodedError, ConfigurationError, ErrorKind, RequestError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Endpoint, EndpointBuilder, Fault, Json, Route, Served, Service};
