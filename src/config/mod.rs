//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → MuxConfig (validated, immutable)
//!     → handed to HttpServer and observability
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    EndpointConfig, LimitsConfig, ListenerConfig, MuxConfig, ObservabilityConfig, TlsConfig,
};
