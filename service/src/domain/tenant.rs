//! Tenant scope resolution.
//!
//! Every request is bound to exactly one tenant scope, a named PostgreSQL
//! schema holding that tenant's copy of the `users` table. The scope comes
//! from the `X-Tenant-Id` header and defaults to [`DEFAULT_TENANT`] when the
//! header is absent or empty. No known-tenant validation happens here; an
//! unknown schema surfaces from the store as a scope-unavailable failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scope used when a request carries no tenant header.
pub const DEFAULT_TENANT: &str = "public";

/// Validation errors returned by [`TenantId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantValidationError {
    /// Identifier is empty after trimming whitespace.
    #[error("tenant id must not be empty")]
    Empty,
    /// Identifier contains characters outside `[a-z0-9_]`.
    #[error("tenant id may only contain lowercase letters, digits, or underscores")]
    InvalidCharacters,
    /// Identifier exceeds the schema-name length limit.
    #[error("tenant id must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Maximum accepted tenant identifier length (PostgreSQL identifier limit).
pub const TENANT_ID_MAX: usize = 63;

/// Validated tenant scope identifier.
///
/// ## Invariants
/// - Non-empty, at most [`TENANT_ID_MAX`] characters.
/// - Restricted to `[a-z0-9_]` so the value is always safe to interpolate
///   into a quoted `SET search_path` statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validate and construct a [`TenantId`].
    pub fn new(value: impl Into<String>) -> Result<Self, TenantValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TenantValidationError::Empty);
        }
        if value.len() > TENANT_ID_MAX {
            return Err(TenantValidationError::TooLong { max: TENANT_ID_MAX });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(TenantValidationError::InvalidCharacters);
        }
        Ok(Self(value))
    }

    /// Resolve a scope from an optional header value.
    ///
    /// Present and non-empty values are validated; absent or empty values
    /// fall back to [`DEFAULT_TENANT`].
    pub fn from_header(value: Option<&str>) -> Result<Self, TenantValidationError> {
        match value {
            Some(raw) if !raw.is_empty() => Self::new(raw),
            _ => Ok(Self::default()),
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self(DEFAULT_TENANT.to_owned())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
