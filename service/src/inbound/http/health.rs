//! Liveness and dependency health.

use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Error;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tenant::TenantContext;
use crate::inbound::http::ApiResult;

/// Health report for the service and its database.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db: &'static str,
}

/// Probe the service and its backing store.
///
/// The store probe runs inside the request's tenant scope, so a health check
/// against a provisioned tenant also proves the scope is reachable.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = Error)
    ),
    params(("X-Tenant-Id" = Option<String>, Header, description = "Tenant scope, defaults to public")),
    tags = ["health"],
    operation_id = "health"
)]
#[get("/health")]
pub async fn health(state: web::Data<HttpState>, tenant: TenantContext) -> ApiResult<HttpResponse> {
    state.users.ping(tenant.tenant()).await?;
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        db: "ok",
    }))
}
