//! gRPC client adapter for the order service.
//!
//! Implements [`OrderHistorySource`] over a lazily connected tonic channel.
//! Each call carries a per-request deadline and forwards the tenant scope in
//! `x-tenant-id` metadata so the remote side resolves the same scope.

use std::time::Duration;

use async_trait::async_trait;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

use crate::domain::ports::{OrderHistorySource, OrderSourceError};
use crate::domain::{OrderSummary, TenantId, UserId};

use super::convert::response_to_domain;
use super::wire::orders_service_client::OrdersServiceClient;
use super::wire::GetOrdersByUserRequest;

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Metadata key carrying the tenant scope to the remote service.
const TENANT_METADATA_KEY: &str = "x-tenant-id";

/// Client construction failures.
#[derive(Debug, thiserror::Error)]
pub enum OrdersClientError {
    /// The configured endpoint URI is malformed.
    #[error("invalid order service endpoint: {0}")]
    InvalidEndpoint(#[from] tonic::transport::Error),
}

/// Order service client over a shared lazy channel.
#[derive(Clone)]
pub struct OrdersRpcClient {
    client: OrdersServiceClient<Channel>,
    timeout: Duration,
}

impl OrdersRpcClient {
    /// Build a client against `endpoint` without connecting yet.
    ///
    /// The channel dials on first use, so a down order service delays
    /// failure to the first aggregation call instead of failing boot.
    pub fn connect_lazy(
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, OrdersClientError> {
        let channel = Endpoint::from_shared(endpoint.to_owned())?.connect_lazy();
        Ok(Self {
            client: OrdersServiceClient::new(channel),
            timeout,
        })
    }
}

fn map_status(status: Status) -> OrderSourceError {
    match status.code() {
        Code::DeadlineExceeded => OrderSourceError::timeout(status.message().to_owned()),
        Code::Unavailable => OrderSourceError::transport(status.message().to_owned()),
        code => OrderSourceError::remote(format!("{code:?}: {}", status.message())),
    }
}

#[async_trait]
impl OrderHistorySource for OrdersRpcClient {
    async fn fetch_orders(
        &self,
        user_id: &UserId,
        tenant: &TenantId,
    ) -> Result<Vec<OrderSummary>, OrderSourceError> {
        let mut request = Request::new(GetOrdersByUserRequest {
            user_id: user_id.to_string(),
        });
        request.set_timeout(self.timeout);
        // TenantId is restricted to [a-z0-9_], always valid metadata.
        let scope = MetadataValue::try_from(tenant.as_str())
            .map_err(|err| OrderSourceError::transport(format!("tenant metadata: {err}")))?;
        request.metadata_mut().insert(TENANT_METADATA_KEY, scope);

        let mut client = self.client.clone();
        let response = client
            .get_orders_by_user(request)
            .await
            .map_err(map_status)?;
        response_to_domain(response.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn deadline_expiry_maps_to_timeout() {
        let err = map_status(Status::deadline_exceeded("2s elapsed"));
        assert!(matches!(err, OrderSourceError::Timeout { .. }));
    }

    #[rstest]
    fn unreachable_remote_maps_to_transport() {
        let err = map_status(Status::unavailable("connection refused"));
        assert!(matches!(err, OrderSourceError::Transport { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[rstest]
    #[case(Status::internal("boom"))]
    #[case(Status::not_found("no such user upstream"))]
    fn other_statuses_map_to_remote(#[case] status: Status) {
        let err = map_status(status);
        assert!(matches!(err, OrderSourceError::Remote { .. }));
    }

    // Channel construction spawns onto the runtime, so this needs one even
    // though no connection is attempted.
    #[rstest]
    #[actix_web::test]
    async fn lazy_connect_accepts_unreachable_endpoints() {
        let client = OrdersRpcClient::connect_lazy("http://127.0.0.1:1", DEFAULT_TIMEOUT);
        assert!(client.is_ok());
    }

    #[rstest]
    fn malformed_endpoint_is_rejected() {
        let client = OrdersRpcClient::connect_lazy("not a uri", DEFAULT_TIMEOUT);
        assert!(client.is_err());
    }
}
