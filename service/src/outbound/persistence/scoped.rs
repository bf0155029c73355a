//! Per-call tenant scope binding and error translation.
//!
//! A pooled connection is unscoped until `bind_schema` runs
//! `SET search_path TO "<tenant>"` on it. The binding lives only as long as
//! the checkout: the pool recycles connections, so every store call binds
//! afresh and nothing tenant-bound is cached across requests.
//!
//! PostgreSQL accepts a `search_path` naming a nonexistent schema and only
//! fails later with `undefined_table` when the first query runs, so the
//! missing-scope case is detected at error-mapping time rather than at bind
//! time.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::UserStoreError;
use crate::domain::TenantId;

use super::pool::PoolError;

/// Bind the connection's search path to the tenant schema.
///
/// [`TenantId`] restricts its value to `[a-z0-9_]{1,63}`, which makes the
/// quoted interpolation below injection safe.
pub async fn bind_schema(
    conn: &mut AsyncPgConnection,
    tenant: &TenantId,
) -> Result<(), UserStoreError> {
    let statement = format!(r#"SET search_path TO "{tenant}""#);
    diesel::sql_query(statement)
        .execute(conn)
        .await
        .map_err(|err| map_diesel_error(tenant, err))?;
    Ok(())
}

/// Translate a checkout failure to the store port's vocabulary.
pub fn map_pool_error(error: PoolError) -> UserStoreError {
    UserStoreError::connection(error.to_string())
}

/// Translate a Diesel failure to the store port's vocabulary.
///
/// `undefined_table` (SQLSTATE 42P01) against a bound scope means the scope
/// itself was never provisioned; it is reported as an unavailable scope, not
/// a generic query failure.
pub fn map_diesel_error(tenant: &TenantId, error: DieselError) -> UserStoreError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            UserStoreError::conflict(info.message().to_owned())
        }
        DieselError::DatabaseError(kind, info) => {
            let message = info.message();
            if is_missing_scope(message) {
                return UserStoreError::scope_unavailable(tenant.to_string());
            }
            match kind {
                DatabaseErrorKind::ClosedConnection => UserStoreError::connection(message.to_owned()),
                _ => UserStoreError::query(message.to_owned()),
            }
        }
        DieselError::BrokenTransactionManager => {
            UserStoreError::connection("transaction manager broken")
        }
        other => UserStoreError::query(other.to_string()),
    }
}

fn is_missing_scope(message: &str) -> bool {
    // Postgres phrasing for 42P01 / 3F000 on an unprovisioned schema.
    message.contains("does not exist")
        && (message.contains("relation") || message.contains("schema"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn db_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_owned()))
    }

    fn tenant() -> TenantId {
        TenantId::new("acme_corp").expect("tenant")
    }

    #[rstest]
    fn unique_violation_maps_to_conflict() {
        let err = map_diesel_error(
            &tenant(),
            db_error(
                DatabaseErrorKind::UniqueViolation,
                "duplicate key value violates unique constraint \"users_email_key\"",
            ),
        );
        assert!(matches!(err, UserStoreError::Conflict { .. }));
    }

    #[rstest]
    #[case::relation("relation \"users\" does not exist")]
    #[case::schema("schema \"acme_corp\" does not exist")]
    fn missing_scope_maps_to_scope_unavailable(#[case] message: &str) {
        let err = map_diesel_error(&tenant(), db_error(DatabaseErrorKind::Unknown, message));
        assert_eq!(err, UserStoreError::scope_unavailable("acme_corp"));
    }

    #[rstest]
    fn other_database_errors_map_to_query() {
        let err = map_diesel_error(
            &tenant(),
            db_error(DatabaseErrorKind::CheckViolation, "check constraint failed"),
        );
        assert!(matches!(err, UserStoreError::Query { .. }));
    }

    #[rstest]
    fn not_found_rows_map_to_query_not_scope() {
        // Absent rows are handled as Ok(None) by the adapter; a leaked
        // `NotFound` still must not masquerade as a missing scope.
        let err = map_diesel_error(&tenant(), DieselError::NotFound);
        assert!(matches!(err, UserStoreError::Query { .. }));
    }

    #[rstest]
    fn checkout_failures_map_to_connection() {
        let err = map_pool_error(PoolError::checkout("pool timed out"));
        assert!(matches!(err, UserStoreError::Connection { .. }));
        assert!(err.to_string().contains("pool timed out"));
    }
}
