//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     (method, template, handler)
//!     → path.rs (parse template into segments)
//!     → route.rs (check handler signature, build InvocationPlan)
//!     → trie.rs (insert by segments, then method)
//!     → endpoint.rs (freeze as immutable Endpoint)
//!
//! Incoming Request (method, path, body):
//!     → endpoint.rs (split, percent-decode segments, strip root prefix)
//!     → trie.rs (match route, collect positional values)
//!     → invoke.rs (decode arguments, call handler, encode reply)
//!     → endpoint.rs (error mapper rewrites failures)
//!     → Return: JSON payload or RequestError
//! ```
//!
//! # Design Decisions
//! - Handler signatures are checked once, at registration
//! - Routes compiled at startup, immutable at runtime
//! - Literal segments beat positional ones; positional ties go to the lowest index
//! - No regex or wildcard segments

pub mod endpoint;
pub mod handler;
mod invoke;
pub mod path;
pub mod route;
pub mod scalar;
pub mod trie;

pub use endpoint::{Endpoint, EndpointBuilder, ErrorMapper, Served, Service};
pub use handler::{Fault, Json};
pub use route::Route;
