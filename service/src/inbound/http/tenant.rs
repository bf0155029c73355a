//! Tenant header extraction.
//!
//! Wraps the `X-Tenant-Id` header in a `FromRequest` extractor so handlers
//! receive a validated [`TenantId`] and never touch raw headers. The scope
//! is resolved fresh on every request; nothing tenant-bound is cached
//! across requests.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::domain::{Error, TenantId};

/// HTTP header carrying the tenant scope.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// Request-scoped tenant binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext(TenantId);

impl TenantContext {
    /// Borrow the resolved scope.
    pub fn tenant(&self) -> &TenantId {
        &self.0
    }

    /// Consume the context, yielding the scope.
    pub fn into_tenant(self) -> TenantId {
        self.0
    }
}

fn resolve(req: &HttpRequest) -> Result<TenantContext, Error> {
    let raw = match req.headers().get(TENANT_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            Error::invalid_request("X-Tenant-Id header must be valid UTF-8")
        })?),
        None => None,
    };
    TenantId::from_header(raw)
        .map(TenantContext)
        .map_err(|error| Error::invalid_request(format!("invalid X-Tenant-Id header: {error}")))
}

impl FromRequest for TenantContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req))
    }
}
