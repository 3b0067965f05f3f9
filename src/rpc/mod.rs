//! JSON-RPC transport.
//!
//! # Data Flow
//! ```text
//! POST /jsonrpc {id, method, params}
//!     → auth.rs (optional bearer token)
//!     → dispatcher.rs (method → typed handler, own task, cancel on disconnect)
//!     → handlers.rs → ConfigService
//!     ← {id, result, error}
//! ```

pub mod auth;
pub mod dispatcher;
pub mod handlers;
pub mod server;
pub mod types;

pub use dispatcher::Dispatcher;
pub use server::RpcServer;
pub use types::{ApiError, RpcRequest, RpcResponse};
