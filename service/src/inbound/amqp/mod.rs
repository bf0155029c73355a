//! AMQP inbound adapter.

pub mod consumer;

pub use consumer::{run, ConsumerError, QUEUE_NAME};
