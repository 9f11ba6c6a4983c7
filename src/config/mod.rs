//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the session, chain client and orchestrator
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and never changes within a session
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ChainConfig, ContractsConfig, NetworkConfig, ObservabilityConfig, SwapConfig,
    TokenRef,
};
