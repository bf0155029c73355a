//! PostgreSQL-backed [`UserStore`] implementation.
//!
//! Every operation checks out a pooled connection, binds it to the tenant
//! schema, and runs its queries against that scope. Mutations that need the
//! current row state (patches and cart edits) run a read-modify-write inside
//! a transaction so concurrent edits to the same record serialise.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{TenantId, User, UserDraft, UserId, UserIdValidationError, UserPatch};

use super::models::{NewUserRow, UserRow, UserRowChanges};
use super::pool::DbPool;
use super::schema::users;
use super::scoped::{bind_schema, map_diesel_error, map_pool_error};

/// Diesel-backed store for the tenant-scoped `users` table.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    /// Create a store over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a read-modify-write transaction.
///
/// Diesel's transaction combinator requires `From<diesel::result::Error>`;
/// the row-decode failure rides along and both collapse back into
/// [`UserStoreError`] once the tenant is in scope again.
enum TxError {
    Diesel(diesel::result::Error),
    Invalid(UserIdValidationError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_tx_error(tenant: &TenantId, error: TxError) -> UserStoreError {
    match error {
        TxError::Diesel(err) => map_diesel_error(tenant, err),
        TxError::Invalid(err) => UserStoreError::query(format!("stored id invalid: {err}")),
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserStoreError> {
    User::try_from(row).map_err(|err| UserStoreError::query(format!("stored id invalid: {err}")))
}

impl DieselUserStore {
    /// Load, mutate, and rewrite one row inside a transaction.
    ///
    /// Returns `Ok(None)` when the id is absent in scope, leaving nothing
    /// written.
    async fn mutate(
        &self,
        tenant: &TenantId,
        id: &UserId,
        apply: impl FnOnce(&mut User) + Send,
    ) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                let row: Option<UserRow> = users::table
                    .filter(users::id.eq(id.as_str()))
                    .select(UserRow::as_select())
                    .first(conn)
                    .await
                    .optional()?;
                let Some(row) = row else {
                    return Ok(None);
                };
                let mut user = User::try_from(row).map_err(TxError::Invalid)?;
                apply(&mut user);
                user.updated_at = Utc::now();
                diesel::update(users::table.filter(users::id.eq(id.as_str())))
                    .set(UserRowChanges::from_user(&user))
                    .execute(conn)
                    .await?;
                Ok(Some(user))
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_tx_error(tenant, err))
    }
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn find_by_id(
        &self,
        tenant: &TenantId,
        id: &UserId,
    ) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(tenant, err))?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_email(
        &self,
        tenant: &TenantId,
        email: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(tenant, err))?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_username(
        &self,
        tenant: &TenantId,
        username: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(tenant, err))?;
        row.map(row_to_user).transpose()
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        let rows: Vec<UserRow> = users::table
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(tenant, err))?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn insert(&self, tenant: &TenantId, draft: UserDraft) -> Result<User, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        let user = draft.into_user(Utc::now());
        diesel::insert_into(users::table)
            .values(NewUserRow::from_user(&user))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(tenant, err))?;
        debug!(%tenant, id = %user.id, "user inserted");
        Ok(user)
    }

    async fn apply_patch(
        &self,
        tenant: &TenantId,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, UserStoreError> {
        let now = Utc::now();
        self.mutate(tenant, id, move |user| patch.apply(user, now))
            .await
    }

    async fn append_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<Option<User>, UserStoreError> {
        self.mutate(tenant, id, move |user| {
            crate::domain::user::cart_append(&mut user.cart, item);
        })
        .await
    }

    async fn remove_cart_item(
        &self,
        tenant: &TenantId,
        id: &UserId,
        item: i64,
    ) -> Result<Option<User>, UserStoreError> {
        self.mutate(tenant, id, move |user| {
            crate::domain::user::cart_remove_one(&mut user.cart, item);
        })
        .await
    }

    async fn clear_cart(
        &self,
        tenant: &TenantId,
        id: &UserId,
    ) -> Result<Option<User>, UserStoreError> {
        self.mutate(tenant, id, |user| user.cart.clear()).await
    }

    async fn ping(&self, tenant: &TenantId) -> Result<(), UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_schema(&mut conn, tenant).await?;

        // Counting through the scoped table proves both connectivity and
        // that the scope is provisioned.
        users::table
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(tenant, err))?;
        Ok(())
    }
}

/// Startup DDL for one tenant scope.
///
/// Idempotent: safe to run on every boot. Additional tenant scopes are
/// provisioned out of band with the same statements.
pub async fn provision_scope(pool: &DbPool, tenant: &TenantId) -> Result<(), UserStoreError> {
    let mut conn = pool.get().await.map_err(map_pool_error)?;

    let ddl = format!(
        r#"
        CREATE SCHEMA IF NOT EXISTS "{tenant}";
        CREATE TABLE IF NOT EXISTS "{tenant}".users (
            id VARCHAR(36) PRIMARY KEY,
            username VARCHAR NOT NULL,
            email VARCHAR NOT NULL,
            name VARCHAR,
            surname VARCHAR,
            address VARCHAR,
            longitude DOUBLE PRECISION,
            latitude DOUBLE PRECISION,
            partner_id VARCHAR,
            cart BIGINT[] NOT NULL DEFAULT '{{}}',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT users_email_key UNIQUE (email),
            CONSTRAINT users_username_key UNIQUE (username)
        );
        "#
    );
    diesel::sql_query(ddl)
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(tenant, err))?;
    debug!(%tenant, "tenant scope provisioned");
    Ok(())
}
