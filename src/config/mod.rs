//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → hosts handed to ConnPool::create, settings to the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; pool membership never changes at runtime
//! - All fields except `hosts` have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::HealthCheckConfig;
pub use schema::LoadReportConfig;
pub use schema::RetryConfig;
pub use validation::ValidationError;
