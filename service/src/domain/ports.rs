//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the tenant-scoped user store, the order service, the maps API). Each
//! trait exposes strongly typed errors so adapters map their failures into
//! predictable variants instead of returning `anyhow::Result`.
//!
//! The `Fixture*` implementations are deterministic in-memory doubles used
//! by handler and service tests.

use async_trait::async_trait;
use thiserror::Error;

use super::{OrderSummary, TenantId, User, UserDraft, UserId, UserPatch};

/// Failures surfaced by [`UserStore`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserStoreError {
    /// Store connection could not be established or was lost.
    #[error("user store connection failed: {message}")]
    Connection {
        /// Adapter-provided cause, credential free.
        message: String,
    },
    /// The bound tenant scope does not exist in the store.
    #[error("tenant scope {scope} is unavailable")]
    ScopeUnavailable {
        /// The scope that failed to bind.
        scope: String,
    },
    /// A unique constraint rejected the write.
    #[error("user store conflict: {message}")]
    Conflict {
        /// Adapter-provided cause.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("user store query failed: {message}")]
    Query {
        /// Adapter-provided cause.
        message: String,
    },
}

impl UserStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for unknown tenant scopes.
    pub fn scope_unavailable(scope: impl Into<String>) -> Self {
        Self::ScopeUnavailable {
            scope: scope.into(),
        }
    }

    /// Helper for unique-constraint violations.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Persistence port for the tenant-scoped `users` table.
///
/// Every operation executes against the scope named by `tenant`; adapters
/// must bind the scope per call and never cache a bound session across
/// requests. Absent rows are `Ok(None)`, not errors; the service decides
/// what absence means per operation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by id within the scope.
    async fn find_by_id(
        &self,
        tenant: &TenantId,
        id: &UserId,
    ) -> Result<Option<User>, UserStoreError>;

    /// Fetch a user by email within the scope (create-time uniqueness check).
    async fn find_by_email(
        &self,
        tenant: &TenantId,
        email: &str,
    ) -> Result<Option<User>, UserStoreError>;

    /// Fetch a user by username within the scope (uniqueness check).
    async fn find_by_username(
        &self,
        tenant: &TenantId,
        username: &str,
    ) -> Result<Option<User>, UserStoreError>;

    /// List every user in the scope.
    async fn list(&self, tenant: &TenantId) -> Result<Vec<User>, UserStoreError>;

    /// Insert a new user with server-assigned timestamps.
    async fn insert(&self, tenant: &TenantId, draft: UserDraft) -> Result<User, UserStoreError>;

    /// Apply a sparse patch; `Ok(None)` when the id is absent in scope.
    async fn apply_patch(
        &self,
        tenant: &TenantId,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, UserStoreError>;

    /// Append an item to the cart, preserving duplicates.
    async fn append_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<Option<User>, UserStoreError>;

    /// Remove at most one occurrence of `item`; absence of the item is a
    /// successful no-op.
    async fn remove_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<Option<User>, UserStoreError>;

    /// Reset the cart to the empty sequence.
    async fn clear_cart(
        &self,
        tenant: &TenantId,
        id: &UserId,
    ) -> Result<Option<User>, UserStoreError>;

    /// Cheap liveness probe against the bound scope.
    async fn ping(&self, tenant: &TenantId) -> Result<(), UserStoreError>;
}

/// Failures surfaced by [`OrderHistorySource`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderSourceError {
    /// The call exceeded its deadline.
    #[error("order service call timed out: {message}")]
    Timeout {
        /// Adapter-provided cause.
        message: String,
    },
    /// The transport failed before a reply arrived.
    #[error("order service transport failed: {message}")]
    Transport {
        /// Adapter-provided cause.
        message: String,
    },
    /// The remote side replied with an error status.
    #[error("order service rejected the call: {message}")]
    Remote {
        /// Adapter-provided cause.
        message: String,
    },
    /// The reply could not be mapped into domain shapes.
    #[error("order service reply could not be decoded: {message}")]
    Decode {
        /// Adapter-provided cause.
        message: String,
    },
}

impl OrderSourceError {
    /// Helper for deadline expiry.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for remote-side errors.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Helper for reply mapping failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Read port for a user's order history held by the external order service.
///
/// One bounded attempt per call; retries, if any, belong to the caller at
/// the edge.
#[async_trait]
pub trait OrderHistorySource: Send + Sync {
    /// Fetch the orders for `user_id`, forwarding the tenant as call
    /// metadata. Reply order is preserved.
    async fn fetch_orders(
        &self,
        user_id: &UserId,
        tenant: &TenantId,
    ) -> Result<Vec<OrderSummary>, OrderSourceError>;
}

/// Resolved place details returned by the geocoding proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    /// Formatted postal address.
    pub formatted_address: String,
    /// Latitude of the place.
    pub latitude: f64,
    /// Longitude of the place.
    pub longitude: f64,
}

/// One autocomplete suggestion, in API order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceSuggestion {
    /// Human-readable suggestion text.
    pub description: String,
    /// Stable place identifier for a follow-up details lookup.
    pub place_id: String,
}

/// Failures surfaced by [`GeocodingSource`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodingError {
    /// The call exceeded its deadline.
    #[error("maps API call timed out: {message}")]
    Timeout {
        /// Adapter-provided cause.
        message: String,
    },
    /// The transport failed before a reply arrived.
    #[error("maps API transport failed: {message}")]
    Transport {
        /// Adapter-provided cause.
        message: String,
    },
    /// The remote side replied with an error status.
    #[error("maps API rejected the call: {message}")]
    Remote {
        /// Adapter-provided cause.
        message: String,
    },
    /// The reply could not be decoded.
    #[error("maps API reply could not be decoded: {message}")]
    Decode {
        /// Adapter-provided cause.
        message: String,
    },
}

impl GeocodingError {
    /// Helper for deadline expiry.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for remote-side errors.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Helper for decode failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Outbound port for the third-party maps API.
#[async_trait]
pub trait GeocodingSource: Send + Sync {
    /// Resolve a place id to address and coordinates; `Ok(None)` when the
    /// API reports no result.
    async fn place_details(&self, place_id: &str)
        -> Result<Option<PlaceDetails>, GeocodingError>;

    /// Autocomplete an address fragment, preserving API order.
    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeocodingError>;
}

// ---------------------------------------------------------------------------
// In-memory fixtures
// ---------------------------------------------------------------------------

pub use fixtures::{FixtureGeocodingSource, FixtureOrderSource, FixtureUserStore};

mod fixtures {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::domain::user::{cart_append, cart_remove_one};

    /// In-memory [`UserStore`] keyed by `(tenant, user id)`.
    ///
    /// Scopes are fully isolated copies, matching the schema-per-tenant
    /// layout of the real adapter.
    #[derive(Default)]
    pub struct FixtureUserStore {
        users: Mutex<HashMap<(String, String), User>>,
        broken: Mutex<Option<String>>,
    }

    impl FixtureUserStore {
        /// Construct an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a user into a tenant scope.
        pub fn seed(&self, tenant: &TenantId, user: User) {
            let mut guard = self.users.lock().expect("store poisoned");
            guard.insert(
                (tenant.as_str().to_owned(), user.id.as_str().to_owned()),
                user,
            );
        }

        /// Make every subsequent call fail with a connection error carrying
        /// `message`.
        pub fn break_with(&self, message: impl Into<String>) {
            *self.broken.lock().expect("flag poisoned") = Some(message.into());
        }

        fn check_broken(&self) -> Result<(), UserStoreError> {
            match self.broken.lock().expect("flag poisoned").as_deref() {
                Some(message) => Err(UserStoreError::connection(message)),
                None => Ok(()),
            }
        }

        fn mutate<F>(
            &self,
            tenant: &TenantId,
            id: &UserId,
            mutation: F,
        ) -> Result<Option<User>, UserStoreError>
        where
            F: FnOnce(&mut User),
        {
            self.check_broken()?;
            let mut guard = self.users.lock().expect("store poisoned");
            let key = (tenant.as_str().to_owned(), id.as_str().to_owned());
            Ok(guard.get_mut(&key).map(|user| {
                mutation(user);
                user.updated_at = Utc::now();
                user.clone()
            }))
        }
    }

    #[async_trait]
    impl UserStore for FixtureUserStore {
        async fn find_by_id(
            &self,
            tenant: &TenantId,
            id: &UserId,
        ) -> Result<Option<User>, UserStoreError> {
            self.check_broken()?;
            let guard = self.users.lock().expect("store poisoned");
            let key = (tenant.as_str().to_owned(), id.as_str().to_owned());
            Ok(guard.get(&key).cloned())
        }

        async fn find_by_email(
            &self,
            tenant: &TenantId,
            email: &str,
        ) -> Result<Option<User>, UserStoreError> {
            self.check_broken()?;
            let guard = self.users.lock().expect("store poisoned");
            Ok(guard
                .iter()
                .find(|((scope, _), user)| scope == tenant.as_str() && user.email == email)
                .map(|(_, user)| user.clone()))
        }

        async fn find_by_username(
            &self,
            tenant: &TenantId,
            username: &str,
        ) -> Result<Option<User>, UserStoreError> {
            self.check_broken()?;
            let guard = self.users.lock().expect("store poisoned");
            Ok(guard
                .iter()
                .find(|((scope, _), user)| scope == tenant.as_str() && user.username == username)
                .map(|(_, user)| user.clone()))
        }

        async fn list(&self, tenant: &TenantId) -> Result<Vec<User>, UserStoreError> {
            self.check_broken()?;
            let guard = self.users.lock().expect("store poisoned");
            let mut users: Vec<User> = guard
                .iter()
                .filter(|((scope, _), _)| scope == tenant.as_str())
                .map(|(_, user)| user.clone())
                .collect();
            users.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            Ok(users)
        }

        async fn insert(
            &self,
            tenant: &TenantId,
            draft: UserDraft,
        ) -> Result<User, UserStoreError> {
            self.check_broken()?;
            let mut guard = self.users.lock().expect("store poisoned");
            if guard
                .iter()
                .any(|((scope, _), user)| scope == tenant.as_str() && user.email == draft.email)
            {
                return Err(UserStoreError::conflict("email already registered"));
            }
            if guard.iter().any(|((scope, _), user)| {
                scope == tenant.as_str() && user.username == draft.username
            }) {
                return Err(UserStoreError::conflict("username already registered"));
            }
            let user = draft.into_user(Utc::now());
            guard.insert(
                (tenant.as_str().to_owned(), user.id.as_str().to_owned()),
                user.clone(),
            );
            Ok(user)
        }

        async fn apply_patch(
            &self,
            tenant: &TenantId,
            id: &UserId,
            patch: UserPatch,
        ) -> Result<Option<User>, UserStoreError> {
            self.mutate(tenant, id, |user| patch.apply(user, Utc::now()))
        }

        async fn append_cart_item(
            &self,
            tenant: &TenantId,
            id: &UserId,
            item: i64,
        ) -> Result<Option<User>, UserStoreError> {
            self.mutate(tenant, id, |user| cart_append(&mut user.cart, item))
        }

        async fn remove_cart_item(
            &self,
            tenant: &TenantId,
            id: &UserId,
            item: i64,
        ) -> Result<Option<User>, UserStoreError> {
            self.mutate(tenant, id, |user| cart_remove_one(&mut user.cart, item))
        }

        async fn clear_cart(
            &self,
            tenant: &TenantId,
            id: &UserId,
        ) -> Result<Option<User>, UserStoreError> {
            self.mutate(tenant, id, |user| user.cart.clear())
        }

        async fn ping(&self, _tenant: &TenantId) -> Result<(), UserStoreError> {
            self.check_broken()
        }
    }

    /// In-memory [`OrderHistorySource`] with a call counter.
    ///
    /// The counter lets tests assert the remote is never invoked for a
    /// nonexistent local user.
    #[derive(Default)]
    pub struct FixtureOrderSource {
        orders: Mutex<Vec<OrderSummary>>,
        failure: Mutex<Option<OrderSourceError>>,
        calls: AtomicUsize,
    }

    impl FixtureOrderSource {
        /// Construct a source replying with an empty history.
        pub fn new() -> Self {
            Self::default()
        }

        /// Construct a source replying with `orders`.
        pub fn with_orders(orders: Vec<OrderSummary>) -> Self {
            Self {
                orders: Mutex::new(orders),
                ..Self::default()
            }
        }

        /// Construct a source failing every call with `error`.
        pub fn failing(error: OrderSourceError) -> Self {
            Self {
                failure: Mutex::new(Some(error)),
                ..Self::default()
            }
        }

        /// Number of fetches performed so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderHistorySource for FixtureOrderSource {
        async fn fetch_orders(
            &self,
            _user_id: &UserId,
            _tenant: &TenantId,
        ) -> Result<Vec<OrderSummary>, OrderSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failure.lock().expect("flag poisoned").clone() {
                return Err(error);
            }
            Ok(self.orders.lock().expect("orders poisoned").clone())
        }
    }

    /// In-memory [`GeocodingSource`] replying from a fixed map.
    #[derive(Default)]
    pub struct FixtureGeocodingSource {
        places: Mutex<HashMap<String, PlaceDetails>>,
        suggestions: Mutex<Vec<PlaceSuggestion>>,
    }

    impl FixtureGeocodingSource {
        /// Construct an empty source (every lookup misses).
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a place details reply.
        pub fn seed_place(&self, place_id: impl Into<String>, details: PlaceDetails) {
            self.places
                .lock()
                .expect("places poisoned")
                .insert(place_id.into(), details);
        }

        /// Register the autocomplete reply.
        pub fn seed_suggestions(&self, suggestions: Vec<PlaceSuggestion>) {
            *self.suggestions.lock().expect("suggestions poisoned") = suggestions;
        }
    }

    #[async_trait]
    impl GeocodingSource for FixtureGeocodingSource {
        async fn place_details(
            &self,
            place_id: &str,
        ) -> Result<Option<PlaceDetails>, GeocodingError> {
            Ok(self
                .places
                .lock()
                .expect("places poisoned")
                .get(place_id)
                .cloned())
        }

        async fn autocomplete(
            &self,
            _input: &str,
        ) -> Result<Vec<PlaceSuggestion>, GeocodingError> {
            Ok(self.suggestions.lock().expect("suggestions poisoned").clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn draft(id: &str, email: &str) -> UserDraft {
        UserDraft {
            id: UserId::new(id).expect("fixture id"),
            username: format!("user-{id}"),
            email: email.to_owned(),
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn fixture_store_isolates_tenant_scopes() {
        let store = FixtureUserStore::new();
        let tenant_a = TenantId::new("tenant_a").expect("scope");
        let tenant_b = TenantId::new("tenant_b").expect("scope");
        let id = UserId::new("shared-id").expect("id");

        let mut in_a = draft("shared-id", "a@example.test").into_user(Utc::now());
        in_a.name = Some("Alice".to_owned());
        store.seed(&tenant_a, in_a);
        let mut in_b = draft("shared-id", "b@example.test").into_user(Utc::now());
        in_b.name = Some("Bob".to_owned());
        store.seed(&tenant_b, in_b);

        let seen_a = store
            .find_by_id(&tenant_a, &id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(seen_a.name.as_deref(), Some("Alice"));
        assert_eq!(seen_a.email, "a@example.test");

        let seen_b = store
            .find_by_id(&tenant_b, &id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(seen_b.name.as_deref(), Some("Bob"));
    }

    #[rstest]
    #[actix_web::test]
    async fn fixture_store_rejects_duplicate_email_in_scope() {
        let store = FixtureUserStore::new();
        let tenant = TenantId::default();

        store
            .insert(&tenant, draft("first", "dup@example.test"))
            .await
            .expect("first insert");
        let err = store
            .insert(&tenant, draft("second", "dup@example.test"))
            .await
            .expect_err("duplicate rejected");
        assert!(matches!(err, UserStoreError::Conflict { .. }));
    }

    #[rstest]
    #[actix_web::test]
    async fn fixture_store_rejects_duplicate_username_in_scope() {
        let store = FixtureUserStore::new();
        let tenant = TenantId::default();

        let mut first = draft("first", "first@example.test");
        first.username = "ada".to_owned();
        let mut second = draft("second", "second@example.test");
        second.username = "ada".to_owned();

        store.insert(&tenant, first).await.expect("first insert");
        let err = store
            .insert(&tenant, second)
            .await
            .expect_err("duplicate rejected");
        assert!(matches!(err, UserStoreError::Conflict { .. }));
    }

    #[rstest]
    #[actix_web::test]
    async fn fixture_order_source_counts_invocations() {
        let source = FixtureOrderSource::new();
        let tenant = TenantId::default();
        let id = UserId::new("someone").expect("id");

        assert_eq!(source.calls(), 0);
        source.fetch_orders(&id, &tenant).await.expect("fetch");
        assert_eq!(source.calls(), 1);
    }
}
