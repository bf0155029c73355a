//! Service configuration loaded via OrthoConfig.
//!
//! Every knob can come from CLI flags, environment variables under the
//! `USER_SVC_` prefix, or a config file; OrthoConfig merges the layers.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_ORDERS_TIMEOUT_MS: u64 = 2_000;

/// Configuration values for the user service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USER_SVC")]
pub struct ServiceSettings {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Socket address for the HTTP listener.
    pub bind_addr: Option<SocketAddr>,
    /// Order service gRPC endpoint, e.g. `http://orders:50051`.
    pub orders_endpoint: Option<String>,
    /// Per-call deadline for order service requests, in milliseconds.
    pub orders_timeout_ms: Option<u64>,
    /// Google Maps API key for the geocoding proxy.
    pub maps_api_key: Option<String>,
    /// AMQP broker address for identity events, e.g. `amqp://broker:5672`.
    pub amqp_addr: Option<String>,
}

impl ServiceSettings {
    /// Listener address, defaulting to all interfaces on 8080.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
    }

    /// Order service call deadline.
    pub fn orders_timeout(&self) -> Duration {
        Duration::from_millis(self.orders_timeout_ms.unwrap_or(DEFAULT_ORDERS_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> ServiceSettings {
        ServiceSettings::load_from_iter([OsString::from("user-service")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_only_the_url_is_set() {
        let _guard = lock_env([
            (
                "USER_SVC_DATABASE_URL",
                Some("postgres://localhost/users".to_owned()),
            ),
            ("USER_SVC_BIND_ADDR", None::<String>),
            ("USER_SVC_ORDERS_ENDPOINT", None::<String>),
            ("USER_SVC_ORDERS_TIMEOUT_MS", None::<String>),
            ("USER_SVC_MAPS_API_KEY", None::<String>),
            ("USER_SVC_AMQP_ADDR", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url, "postgres://localhost/users");
        assert_eq!(settings.bind_addr().port(), 8080);
        assert_eq!(settings.orders_timeout(), Duration::from_millis(2_000));
        assert!(settings.orders_endpoint.is_none());
        assert!(settings.amqp_addr.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "USER_SVC_DATABASE_URL",
                Some("postgres://localhost/users".to_owned()),
            ),
            ("USER_SVC_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            (
                "USER_SVC_ORDERS_ENDPOINT",
                Some("http://orders:50051".to_owned()),
            ),
            ("USER_SVC_ORDERS_TIMEOUT_MS", Some("500".to_owned())),
            ("USER_SVC_MAPS_API_KEY", Some("k".to_owned())),
            ("USER_SVC_AMQP_ADDR", Some("amqp://broker:5672".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr().port(), 9090);
        assert_eq!(settings.orders_timeout(), Duration::from_millis(500));
        assert_eq!(
            settings.orders_endpoint.as_deref(),
            Some("http://orders:50051")
        );
        assert_eq!(settings.amqp_addr.as_deref(), Some("amqp://broker:5672"));
    }
}
