//! User HTTP handlers.
//!
//! ```text
//! GET    /users
//! GET    /users/{id}
//! PATCH  /users/{id}
//! GET    /users/{id}/orders
//! POST   /users/{id}/cart/{item}
//! DELETE /users/{id}/cart/{item}
//! DELETE /users/{id}/cart
//! ```
//!
//! Every endpoint is tenant scoped via the `X-Tenant-Id` header.

use actix_web::{delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Error, OrderHistory, OrderLineItem, OrderSummary, Patch, User, UserId, UserPatch,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tenant::TenantContext;
use crate::inbound::http::ApiResult;

/// User representation returned by every user endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    pub cart: Vec<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.id.to_string(),
            username: value.username,
            email: value.email,
            name: value.name,
            surname: value.surname,
            address: value.address,
            longitude: value.longitude,
            latitude: value.latitude,
            partner_id: value.partner_id,
            cart: value.cart,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

/// Sparse update payload.
///
/// A missing key leaves the field untouched; an explicit `null` clears it.
/// The cart is only mutable through the dedicated cart endpoints.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatchRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub username: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub email: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub surname: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub address: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub longitude: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub latitude: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub partner_id: Patch<String>,
}

fn required_field(patch: Patch<String>, field: &str) -> Result<Option<String>, Error> {
    match patch {
        Patch::Absent => Ok(None),
        Patch::Null => Err(Error::invalid_request(format!("{field} cannot be cleared"))),
        Patch::Value(value) if value.trim().is_empty() => {
            Err(Error::invalid_request(format!("{field} must not be empty")))
        }
        Patch::Value(value) => Ok(Some(value)),
    }
}

fn parse_patch_request(payload: UserPatchRequest) -> Result<UserPatch, Error> {
    Ok(UserPatch {
        username: required_field(payload.username, "username")?,
        email: required_field(payload.email, "email")?,
        name: payload.name,
        surname: payload.surname,
        address: payload.address,
        longitude: payload.longitude,
        latitude: payload.latitude,
        partner_id: payload.partner_id,
    })
}

fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|error| Error::invalid_request(format!("invalid user id: {error}")))
}

/// One remote line item in an aggregated order.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItemResponse {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: f64,
}

impl From<OrderLineItem> for OrderLineItemResponse {
    fn from(value: OrderLineItem) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price,
        }
    }
}

/// One remote order in an aggregated history.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub external_id: String,
    pub order_id: i64,
    pub user_id: String,
    pub order_status: String,
    pub total_amount: f64,
    pub created_at: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub items: Vec<OrderLineItemResponse>,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(value: OrderSummary) -> Self {
        Self {
            external_id: value.external_id,
            order_id: value.order_id,
            user_id: value.user_id,
            order_status: value.order_status,
            total_amount: value.total_amount,
            created_at: value.created_at.to_rfc3339(),
            tenant_id: value.tenant_id,
            partner_id: value.partner_id,
            payment_id: value.payment_id,
            items: value.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Aggregated order history for one local user.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryResponse {
    pub user_id: String,
    pub orders: Vec<OrderSummaryResponse>,
}

impl From<OrderHistory> for OrderHistoryResponse {
    fn from(value: OrderHistory) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            orders: value.orders.into_iter().map(Into::into).collect(),
        }
    }
}

/// List every user in the bound tenant scope.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Users in scope", body = [UserResponse]),
        (status = 503, description = "Store or scope unavailable", body = Error)
    ),
    params(("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    tenant: TenantContext,
) -> ApiResult<web::Json<Vec<UserResponse>>> {
    let users = state.users.list_users(tenant.tenant()).await?;
    Ok(web::Json(users.into_iter().map(Into::into).collect()))
}

/// Fetch one user by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "Unknown id in scope", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserResponse>> {
    let id = parse_user_id(&path.into_inner())?;
    let user = state.users.fetch_user(tenant.tenant(), &id).await?;
    Ok(web::Json(user.into()))
}

/// Apply a sparse patch to one user.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    request_body = UserPatchRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid patch", body = Error),
        (status = 404, description = "Unknown id in scope", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<String>,
    payload: web::Json<UserPatchRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let id = parse_user_id(&path.into_inner())?;
    let patch = parse_patch_request(payload.into_inner())?;
    let user = state.users.update_user(tenant.tenant(), &id, patch).await?;
    Ok(web::Json(user.into()))
}

/// Aggregate a user's remote order history.
///
/// The local existence check runs first: a nonexistent id is a 404 and the
/// order service is never called. A failing order service is a 502, leaving
/// the local record untouched.
#[utoipa::path(
    get,
    path = "/users/{id}/orders",
    responses(
        (status = 200, description = "Order history", body = OrderHistoryResponse),
        (status = 404, description = "Unknown id in scope", body = Error),
        (status = 502, description = "Order service unavailable", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["users"],
    operation_id = "getUserOrders"
)]
#[get("/users/{id}/orders")]
pub async fn get_user_orders(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<OrderHistoryResponse>> {
    let id = parse_user_id(&path.into_inner())?;
    let history = state.users.order_history(tenant.tenant(), &id).await?;
    Ok(web::Json(history.into()))
}

/// Append an item reference to the cart. Duplicates are preserved.
#[utoipa::path(
    post,
    path = "/users/{id}/cart/{item}",
    responses(
        (status = 200, description = "User with updated cart", body = UserResponse),
        (status = 404, description = "Unknown id in scope", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("item" = i64, Path, description = "Item reference to append"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["cart"],
    operation_id = "addCartItem"
)]
#[post("/users/{id}/cart/{item}")]
pub async fn add_cart_item(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<(String, i64)>,
) -> ApiResult<web::Json<UserResponse>> {
    let (raw_id, item) = path.into_inner();
    let id = parse_user_id(&raw_id)?;
    let user = state.users.add_cart_item(tenant.tenant(), &id, item).await?;
    Ok(web::Json(user.into()))
}

/// Remove one occurrence of an item from the cart; absence is a no-op.
#[utoipa::path(
    delete,
    path = "/users/{id}/cart/{item}",
    responses(
        (status = 200, description = "User with updated cart", body = UserResponse),
        (status = 404, description = "Unknown id in scope", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("item" = i64, Path, description = "Item reference to remove once"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["cart"],
    operation_id = "removeCartItem"
)]
#[delete("/users/{id}/cart/{item}")]
pub async fn remove_cart_item(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<(String, i64)>,
) -> ApiResult<web::Json<UserResponse>> {
    let (raw_id, item) = path.into_inner();
    let id = parse_user_id(&raw_id)?;
    let user = state
        .users
        .remove_cart_item(tenant.tenant(), &id, item)
        .await?;
    Ok(web::Json(user.into()))
}

/// Empty the cart.
#[utoipa::path(
    delete,
    path = "/users/{id}/cart",
    responses(
        (status = 200, description = "User with emptied cart", body = UserResponse),
        (status = 404, description = "Unknown id in scope", body = Error)
    ),
    params(
        ("id" = String, Path, description = "Externally issued user id"),
        ("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")
    ),
    tags = ["cart"],
    operation_id = "clearCart"
)]
#[delete("/users/{id}/cart")]
pub async fn clear_cart(
    state: web::Data<HttpState>,
    tenant: TenantContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserResponse>> {
    let id = parse_user_id(&path.into_inner())?;
    let user = state.users.clear_cart(tenant.tenant(), &id).await?;
    Ok(web::Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        FixtureGeocodingSource, FixtureOrderSource, FixtureUserStore,
    };
    use crate::domain::{TenantId, UserDraft, UserService};
    use crate::inbound::http::tenant::TENANT_HEADER;
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn seeded_store() -> Arc<FixtureUserStore> {
        let store = Arc::new(FixtureUserStore::new());
        let mut user = UserDraft {
            id: UserId::new("u-1").expect("id"),
            username: "ada".to_owned(),
            email: "ada@example.test".to_owned(),
        }
        .into_user(Utc::now());
        user.name = Some("Ada".to_owned());
        store.seed(&TenantId::default(), user);
        store
    }

    fn test_app(
        store: Arc<FixtureUserStore>,
        orders: Arc<FixtureOrderSource>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let state = HttpState::new(
            UserService::new(store, orders),
            Arc::new(FixtureGeocodingSource::new()),
        );
        App::new()
            .app_data(web::Data::new(state))
            .service(list_users)
            .service(get_user_orders)
            .service(add_cart_item)
            .service(remove_cart_item)
            .service(clear_cart)
            .service(get_user)
            .service(update_user)
    }

    #[rstest]
    #[actix_web::test]
    async fn get_user_returns_the_scoped_record() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/users/u-1").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("id").and_then(Value::as_str), Some("u-1"));
        assert_eq!(
            body.get("email").and_then(Value::as_str),
            Some("ada@example.test")
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_id_is_not_found() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/users/ghost").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn tenant_header_selects_an_isolated_scope() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        // The same id does not exist in another tenant's scope.
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/users/u-1")
                .insert_header((TENANT_HEADER, "tenant_b"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn patch_with_one_field_preserves_the_rest() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri("/users/u-1")
                .set_json(json!({ "name": "Countess" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("name").and_then(Value::as_str), Some("Countess"));
        assert_eq!(
            body.get("email").and_then(Value::as_str),
            Some("ada@example.test"),
            "untouched fields must survive a sparse patch"
        );
        assert_eq!(body.get("username").and_then(Value::as_str), Some("ada"));
    }

    #[rstest]
    #[actix_web::test]
    async fn patch_cannot_clear_required_fields() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri("/users/u-1")
                .set_json(json!({ "email": null }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[actix_web::test]
    async fn patch_null_clears_an_optional_field() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri("/users/u-1")
                .set_json(json!({ "name": null }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert!(body.get("name").is_none(), "cleared field is omitted");
    }

    #[rstest]
    #[actix_web::test]
    async fn cart_endpoints_keep_multiset_semantics() {
        let app = actix_test::init_service(test_app(
            seeded_store(),
            Arc::new(FixtureOrderSource::new()),
        ))
        .await;

        for _ in 0..2 {
            let res = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/users/u-1/cart/7")
                    .to_request(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/users/u-1/cart/7")
                .to_request(),
        )
        .await;
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("cart"), Some(&json!([7])));

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/users/u-1/cart")
                .to_request(),
        )
        .await;
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("cart"), Some(&json!([])));
    }

    #[rstest]
    #[actix_web::test]
    async fn orders_for_missing_user_skip_the_remote() {
        let orders = Arc::new(FixtureOrderSource::new());
        let app =
            actix_test::init_service(test_app(seeded_store(), Arc::clone(&orders))).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/users/ghost/orders")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(orders.calls(), 0);
    }

    #[rstest]
    #[actix_web::test]
    async fn remote_failure_is_a_bad_gateway() {
        let orders = Arc::new(FixtureOrderSource::failing(
            crate::domain::ports::OrderSourceError::transport("connection refused"),
        ));
        let app = actix_test::init_service(test_app(seeded_store(), orders)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/users/u-1/orders")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
