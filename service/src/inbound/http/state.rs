//! Shared HTTP adapter state.
//!
//! Handlers accept this via `actix_web::web::Data` so they only depend on
//! the domain service and ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::GeocodingSource;
use crate::domain::UserService;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// User use-cases (store + order aggregation).
    pub users: UserService,
    /// Geocoding proxy port.
    pub geocoding: Arc<dyn GeocodingSource>,
}

impl HttpState {
    /// Bundle the service and the geocoding port.
    pub fn new(users: UserService, geocoding: Arc<dyn GeocodingSource>) -> Self {
        Self { users, geocoding }
    }
}
