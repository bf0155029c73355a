//! User use-cases composed over the domain ports.
//!
//! Handlers stay thin: every endpoint delegates here, and this service owns
//! the ordering guarantees (existence check happens-before mutation
//! happens-before remote fetch) and the translation from adapter errors to
//! the domain [`Error`].

use std::sync::Arc;

use tracing::warn;

use super::ports::{OrderHistorySource, OrderSourceError, UserStore, UserStoreError};
use super::{Error, OrderHistory, TenantId, User, UserDraft, UserId, UserPatch};

/// Outcome of an idempotent identity-event ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new user row was inserted.
    Created,
    /// The id already existed in the scope; nothing changed.
    AlreadyExists,
}

/// Orchestrates user reads, writes, and order aggregation.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    orders: Arc<dyn OrderHistorySource>,
}

fn map_store_error(error: UserStoreError) -> Error {
    match error {
        UserStoreError::Connection { message } => {
            Error::service_unavailable(format!("database unavailable: {message}"))
        }
        UserStoreError::ScopeUnavailable { scope } => {
            Error::service_unavailable(format!("tenant scope {scope} is unavailable"))
        }
        UserStoreError::Conflict { message } => Error::conflict(message),
        UserStoreError::Query { message } => Error::internal(message),
    }
}

fn map_order_error(error: OrderSourceError) -> Error {
    Error::bad_gateway(format!("order service unavailable: {error}"))
}

fn user_not_found(id: &UserId) -> Error {
    Error::not_found(format!("user {id} not found"))
}

impl UserService {
    /// Compose the service from its ports.
    pub fn new(store: Arc<dyn UserStore>, orders: Arc<dyn OrderHistorySource>) -> Self {
        Self { store, orders }
    }

    /// Fetch one user; absent ids are a client-visible not-found.
    pub async fn fetch_user(&self, tenant: &TenantId, id: &UserId) -> Result<User, Error> {
        self.store
            .find_by_id(tenant, id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| user_not_found(id))
    }

    /// List every user in the bound scope.
    pub async fn list_users(&self, tenant: &TenantId) -> Result<Vec<User>, Error> {
        self.store.list(tenant).await.map_err(map_store_error)
    }

    /// Insert a new user, refusing duplicate emails and usernames within the
    /// scope.
    pub async fn create_user(&self, tenant: &TenantId, draft: UserDraft) -> Result<User, Error> {
        if self
            .store
            .find_by_email(tenant, &draft.email)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "email {} already registered",
                draft.email
            )));
        }
        if self
            .store
            .find_by_username(tenant, &draft.username)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "username {} already registered",
                draft.username
            )));
        }
        self.store
            .insert(tenant, draft)
            .await
            .map_err(map_store_error)
    }

    /// Apply a sparse patch to an existing user.
    ///
    /// A patch steering the email or username onto another user's value is
    /// refused as a conflict before the store sees it, mirroring the
    /// scope-local unique constraints.
    pub async fn update_user(
        &self,
        tenant: &TenantId,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<User, Error> {
        if let Some(email) = patch.email.as_deref() {
            let holder = self
                .store
                .find_by_email(tenant, email)
                .await
                .map_err(map_store_error)?;
            if holder.is_some_and(|existing| existing.id != *id) {
                return Err(Error::conflict(format!("email {email} already registered")));
            }
        }
        if let Some(username) = patch.username.as_deref() {
            let holder = self
                .store
                .find_by_username(tenant, username)
                .await
                .map_err(map_store_error)?;
            if holder.is_some_and(|existing| existing.id != *id) {
                return Err(Error::conflict(format!(
                    "username {username} already registered"
                )));
            }
        }
        self.store
            .apply_patch(tenant, id, patch)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| user_not_found(id))
    }

    /// Aggregate a user's remote order history.
    ///
    /// The local existence check runs first and fails fast with not-found so
    /// a nonexistent user never leaks a confusing gateway error; only then
    /// is the remote attempted, once, with its failures surfaced as a
    /// gateway-level condition distinct from not-found.
    pub async fn order_history(
        &self,
        tenant: &TenantId,
        id: &UserId,
    ) -> Result<OrderHistory, Error> {
        let user = self.fetch_user(tenant, id).await?;
        let orders = self
            .orders
            .fetch_orders(&user.id, tenant)
            .await
            .map_err(|error| {
                warn!(user_id = %user.id, tenant = %tenant, error = %error, "order fetch failed");
                map_order_error(error)
            })?;
        Ok(OrderHistory {
            user_id: user.id,
            orders,
        })
    }

    /// Append an item to the user's cart (duplicates preserved).
    pub async fn add_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<User, Error> {
        self.store
            .append_cart_item(tenant, id, item)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| user_not_found(id))
    }

    /// Remove one occurrence of an item from the cart; absence is a no-op.
    pub async fn remove_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<User, Error> {
        self.store
            .remove_cart_item(tenant, id, item)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| user_not_found(id))
    }

    /// Empty the user's cart.
    pub async fn clear_cart(&self, tenant: &TenantId, id: &UserId) -> Result<User, Error> {
        self.store
            .clear_cart(tenant, id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| user_not_found(id))
    }

    /// Idempotent upsert for identity events: skip when the id already
    /// exists in the scope, insert otherwise.
    pub async fn ingest_created(
        &self,
        tenant: &TenantId,
        draft: UserDraft,
    ) -> Result<IngestOutcome, Error> {
        if self
            .store
            .find_by_id(tenant, &draft.id)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Ok(IngestOutcome::AlreadyExists);
        }
        self.create_user(tenant, draft).await?;
        Ok(IngestOutcome::Created)
    }

    /// Probe the store through the bound scope.
    pub async fn ping(&self, tenant: &TenantId) -> Result<(), Error> {
        self.store.ping(tenant).await.map_err(map_store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FixtureOrderSource, FixtureUserStore};
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn draft(id: &str, email: &str) -> UserDraft {
        UserDraft {
            id: UserId::new(id).expect("fixture id"),
            username: format!("user-{id}"),
            email: email.to_owned(),
        }
    }

    fn service_with(
        store: Arc<FixtureUserStore>,
        orders: Arc<FixtureOrderSource>,
    ) -> UserService {
        UserService::new(store, orders)
    }

    #[rstest]
    #[actix_web::test]
    async fn create_then_fetch_round_trips_fields() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::default();

        let created = service
            .create_user(&tenant, draft("u-1", "ada@example.test"))
            .await
            .expect("create");
        let fetched = service
            .fetch_user(&tenant, &created.id)
            .await
            .expect("fetch");

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.username, created.username);
        assert_eq!(fetched.email, created.email);
        assert_eq!(fetched.cart, created.cart);
    }

    #[rstest]
    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::default();

        service
            .create_user(&tenant, draft("u-1", "dup@example.test"))
            .await
            .expect("first create");
        let err = service
            .create_user(&tenant, draft("u-2", "dup@example.test"))
            .await
            .expect_err("duplicate rejected");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[actix_web::test]
    async fn duplicate_username_is_a_conflict() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::default();

        let mut first = draft("u-1", "ada@example.test");
        first.username = "ada".to_owned();
        let mut second = draft("u-2", "grace@example.test");
        second.username = "ada".to_owned();

        service
            .create_user(&tenant, first)
            .await
            .expect("first create");
        let err = service
            .create_user(&tenant, second)
            .await
            .expect_err("duplicate rejected");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[actix_web::test]
    async fn patch_onto_a_taken_username_is_a_conflict() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::default();

        let taken = service
            .create_user(&tenant, draft("u-1", "ada@example.test"))
            .await
            .expect("first create");
        let victim = service
            .create_user(&tenant, draft("u-2", "grace@example.test"))
            .await
            .expect("second create");

        let patch = UserPatch {
            username: Some(taken.username.clone()),
            ..UserPatch::default()
        };
        let err = service
            .update_user(&tenant, &victim.id, patch)
            .await
            .expect_err("steal rejected");
        assert_eq!(err.code(), ErrorCode::Conflict);

        // Re-asserting your own username is not a conflict.
        let patch = UserPatch {
            username: Some(taken.username.clone()),
            ..UserPatch::default()
        };
        service
            .update_user(&tenant, &taken.id, patch)
            .await
            .expect("self patch allowed");
    }

    #[rstest]
    #[actix_web::test]
    async fn order_history_skips_remote_for_missing_user() {
        let store = Arc::new(FixtureUserStore::new());
        let orders = Arc::new(FixtureOrderSource::new());
        let service = service_with(store, Arc::clone(&orders));
        let tenant = TenantId::default();
        let id = UserId::new("ghost").expect("id");

        let err = service
            .order_history(&tenant, &id)
            .await
            .expect_err("missing user");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(orders.calls(), 0, "remote must never be invoked");
    }

    #[rstest]
    #[actix_web::test]
    async fn order_history_maps_remote_failure_to_bad_gateway() {
        let store = Arc::new(FixtureUserStore::new());
        let orders = Arc::new(FixtureOrderSource::failing(
            crate::domain::ports::OrderSourceError::timeout("deadline exceeded"),
        ));
        let service = service_with(Arc::clone(&store), orders);
        let tenant = TenantId::default();

        let user = service
            .create_user(&tenant, draft("u-1", "ada@example.test"))
            .await
            .expect("create");

        let err = service
            .order_history(&tenant, &user.id)
            .await
            .expect_err("remote failure");
        assert_eq!(err.code(), ErrorCode::BadGateway);

        // The local record is unaffected by the remote failure.
        let fetched = service.fetch_user(&tenant, &user.id).await.expect("fetch");
        assert_eq!(fetched.email, "ada@example.test");
    }

    #[rstest]
    #[actix_web::test]
    async fn cart_operations_follow_multiset_semantics() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::default();

        let user = service
            .create_user(&tenant, draft("u-1", "ada@example.test"))
            .await
            .expect("create");

        service
            .add_cart_item(&tenant, &user.id, 7)
            .await
            .expect("append");
        let doubled = service
            .add_cart_item(&tenant, &user.id, 7)
            .await
            .expect("append again");
        assert_eq!(doubled.cart, vec![7, 7]);

        let removed = service
            .remove_cart_item(&tenant, &user.id, 7)
            .await
            .expect("remove one");
        assert_eq!(removed.cart, vec![7]);

        let cleared = service
            .clear_cart(&tenant, &user.id)
            .await
            .expect("clear");
        assert!(cleared.cart.is_empty());
    }

    #[rstest]
    #[actix_web::test]
    async fn ingest_is_idempotent_on_user_id() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));
        let tenant = TenantId::new("tenant_a").expect("scope");

        let first = service
            .ingest_created(&tenant, draft("evt-1", "new@example.test"))
            .await
            .expect("first ingest");
        assert_eq!(first, IngestOutcome::Created);

        let second = service
            .ingest_created(&tenant, draft("evt-1", "new@example.test"))
            .await
            .expect("second ingest");
        assert_eq!(second, IngestOutcome::AlreadyExists);
    }

    #[rstest]
    #[actix_web::test]
    async fn ping_maps_store_failure_to_service_unavailable() {
        let store = Arc::new(FixtureUserStore::new());
        store.break_with("connection refused");
        let service = service_with(store, Arc::new(FixtureOrderSource::new()));

        let err = service
            .ping(&TenantId::default())
            .await
            .expect_err("broken store");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert!(err.message().contains("connection refused"));
    }
}
