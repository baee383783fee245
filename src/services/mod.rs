//! Services exposed by the `rest-mux` binary.
//!
//! Each service owns its state and implements [`crate::routing::Service`]
//! to contribute routes to the endpoint.

pub mod map;

pub use map::MapService;
