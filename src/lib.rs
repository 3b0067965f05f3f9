//! Live, section-addressable configuration store.

pub mod config;
pub mod dynopts;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod planner;
pub mod reload;
pub mod rpc;
pub mod section;
pub mod service;
pub mod store;

pub use config::ServiceConfig;
pub use error::{ConfigError, ConfigResult, ErrorKind};
pub use lifecycle::Shutdown;
pub use rpc::RpcServer;
pub use service::{ConfigService, ServiceSettings};
pub use store::SectionStore;
