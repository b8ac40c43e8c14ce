//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to Service and HttpServer at construction
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no runtime reconfiguration
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::{
    AnalyzerConfig, CircuitBreakerConfig, ListenerConfig, ObservabilityConfig, PipelineConfig,
    SecurityConfig, SinkConfig, TimeoutConfig,
};
