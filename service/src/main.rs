//! Service entry-point: configuration, adapter wiring, and bootstrap.

use std::sync::Arc;

use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use user_service::domain::{TenantId, UserService};
use user_service::inbound::amqp;
use user_service::inbound::http::HttpState;
use user_service::outbound::geocoding::GoogleMapsSource;
use user_service::outbound::orders::OrdersRpcClient;
use user_service::outbound::persistence::{provision_scope, DbPool, DieselUserStore, PoolConfig};
use user_service::server::{self, ServiceSettings};

const DEFAULT_ORDERS_ENDPOINT: &str = "http://127.0.0.1:50051";

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load()
        .map_err(|e| std::io::Error::other(format!("configuration: {e}")))?;

    let pool = DbPool::new(PoolConfig::new(settings.database_url.clone()))
        .await
        .map_err(std::io::Error::other)?;
    // The default scope must exist before the first request; additional
    // tenant scopes are provisioned out of band.
    provision_scope(&pool, &TenantId::default())
        .await
        .map_err(std::io::Error::other)?;

    let store = Arc::new(DieselUserStore::new(pool));
    let orders_endpoint = settings
        .orders_endpoint
        .clone()
        .unwrap_or_else(|| DEFAULT_ORDERS_ENDPOINT.to_owned());
    let orders = Arc::new(
        OrdersRpcClient::connect_lazy(&orders_endpoint, settings.orders_timeout())
            .map_err(std::io::Error::other)?,
    );
    let users = UserService::new(store, orders);

    let maps_api_key = settings.maps_api_key.clone().unwrap_or_else(|| {
        warn!("maps API key not configured; geocoding lookups will be rejected upstream");
        String::new()
    });
    let geocoding = Arc::new(GoogleMapsSource::new(maps_api_key).map_err(std::io::Error::other)?);

    if let Some(amqp_addr) = settings.amqp_addr.clone() {
        let consumer_service = users.clone();
        tokio::spawn(async move {
            if let Err(error) = amqp::run(&amqp_addr, consumer_service).await {
                warn!(%error, "identity event consumer stopped");
            }
        });
    } else {
        info!("AMQP address not configured; identity event ingestion disabled");
    }

    let state = HttpState::new(users, geocoding);
    let bind_addr = settings.bind_addr();
    info!(%bind_addr, "user service listening");
    server::run(state, bind_addr).await
}
