//! Multi-tenant user record service.
//!
//! Hexagonal layout: the `domain` module owns entities, ports, and the
//! orchestrating service; `inbound` adapts HTTP and AMQP onto the domain;
//! `outbound` implements the ports against PostgreSQL, the order service's
//! gRPC API, and the Google Places API; `server` wires it all together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
