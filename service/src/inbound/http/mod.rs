//! HTTP inbound adapter.

pub mod error;
pub mod health;
pub mod location;
pub mod state;
pub mod tenant;
pub mod users;

pub use error::ApiResult;
pub use state::HttpState;
pub use tenant::{TenantContext, TENANT_HEADER};

use actix_web::web;

/// Register every HTTP route on an actix service config.
///
/// Shared between the production server and integration tests so both
/// exercise identical routing.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(users::list_users)
        .service(users::get_user_orders)
        .service(users::add_cart_item)
        .service(users::remove_cart_item)
        .service(users::clear_cart)
        .service(users::get_user)
        .service(users::update_user)
        .service(location::get_place)
        .service(location::autocomplete);
}
