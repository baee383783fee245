//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → tls.rs (optional TLS handshake)
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (add or keep request ID)
//!     → server.rs (content-type check, read body)
//!     → routing::Endpoint::serve (on the blocking pool)
//!     → response.rs (payload or error → status code, per-route gzip)
//!     → Send to client
//!
//! GET <docs_path>
//!     → docs.rs (route listing, built once at startup)
//! ```

pub mod docs;
pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
