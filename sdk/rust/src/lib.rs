//! Client for the live-config JSON-RPC service.

pub mod client;

pub use client::{ClientError, ConfigClient, RpcError};
