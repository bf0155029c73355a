//! gRPC adapter for the order service.

pub mod client;
pub mod convert;
pub mod wire;

pub use client::{OrdersClientError, OrdersRpcClient, DEFAULT_TIMEOUT};
