//! PostgreSQL persistence adapter.

pub mod diesel_user_store;
pub mod pool;
pub mod schema;
pub mod scoped;

mod models;

pub use diesel_user_store::{provision_scope, DieselUserStore};
pub use pool::{DbPool, PoolConfig, PoolError};
