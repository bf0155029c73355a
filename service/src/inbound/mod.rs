//! Inbound adapters: HTTP surface and AMQP identity-event ingestion.

pub mod amqp;
pub mod http;
