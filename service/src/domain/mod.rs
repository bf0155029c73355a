//! Domain primitives, ports, and use-cases.
//!
//! Types here are transport agnostic: the HTTP and AMQP adapters translate
//! them to their own envelopes, and the outbound adapters implement the
//! ports in [`ports`].

pub mod error;
pub mod orders;
pub mod ports;
pub mod tenant;
pub mod user;
pub mod users_service;

pub use self::error::{Error, ErrorCode};
pub use self::orders::{OrderHistory, OrderLineItem, OrderSummary};
pub use self::tenant::{TenantId, TenantValidationError, DEFAULT_TENANT};
pub use self::user::{Patch, User, UserDraft, UserId, UserIdValidationError, UserPatch};
pub use self::users_service::{IngestOutcome, UserService};
