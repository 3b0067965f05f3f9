//! Daemon bootstrap configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → lifecycle::startup wires subsystems from it
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Live sections are never read from here; they go through the store

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, LoadError};
pub use schema::{
    BackingStoreConfig, BackingStoreKind, ObservabilityConfig, ReloadConfig, RpcConfig, SectionsConfig,
    ServiceConfig,
};
