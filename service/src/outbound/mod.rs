//! Outbound adapters implementing the domain ports.

pub mod geocoding;
pub mod orders;
pub mod persistence;
