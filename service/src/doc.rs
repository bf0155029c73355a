//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] assembles the specification from the handler annotations in
//! the inbound HTTP layer. The document is served at
//! `/api-doc/openapi.json` for external tooling.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::health::HealthResponse;
use crate::inbound::http::location::{PlaceResponse, SuggestionResponse};
use crate::inbound::http::users::{
    OrderHistoryResponse, OrderLineItemResponse, OrderSummaryResponse, UserPatchRequest,
    UserResponse,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "User service API",
        description = "Tenant-scoped user records, cart operations, order \
                       aggregation, and geocoding proxy.",
        license(name = "MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::get_user_orders,
        crate::inbound::http::users::add_cart_item,
        crate::inbound::http::users::remove_cart_item,
        crate::inbound::http::users::clear_cart,
        crate::inbound::http::health::health,
        crate::inbound::http::location::get_place,
        crate::inbound::http::location::autocomplete,
    ),
    components(schemas(
        Error,
        ErrorCode,
        UserResponse,
        UserPatchRequest,
        OrderHistoryResponse,
        OrderSummaryResponse,
        OrderLineItemResponse,
        HealthResponse,
        PlaceResponse,
        SuggestionResponse,
    )),
    tags(
        (name = "users", description = "Tenant-scoped user records"),
        (name = "cart", description = "Cart mutations on a user record"),
        (name = "health", description = "Service and store health"),
        (name = "location", description = "Geocoding proxy")
    )
)]
pub struct ApiDoc;
