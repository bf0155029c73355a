//! User aggregate and sparse patch types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdValidationError {
    /// Identifier is empty.
    #[error("user id must not be empty")]
    Empty,
    /// Identifier carries surrounding whitespace.
    #[error("user id must not contain surrounding whitespace")]
    Padded,
    /// Identifier exceeds the stored column width.
    #[error("user id must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Maximum accepted user identifier length (identity-provider UUID width).
pub const USER_ID_MAX: usize = 36;

/// Externally issued stable user identifier.
///
/// The identity provider issues these (UUID strings in practice); this
/// service treats them as opaque and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(value: impl Into<String>) -> Result<Self, UserIdValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserIdValidationError::Empty);
        }
        if value.trim() != value {
            return Err(UserIdValidationError::Padded);
        }
        if value.len() > USER_ID_MAX {
            return Err(UserIdValidationError::TooLong { max: USER_ID_MAX });
        }
        Ok(Self(value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Application user within one tenant scope.
///
/// ## Invariants
/// - `email` and `username` are unique within the tenant scope only; the
///   same `id` may exist in another scope with different attributes.
/// - `cart` is an ordered multiset: duplicates are permitted and preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Externally issued identifier, immutable after creation.
    pub id: UserId,
    /// Unique login name within the scope.
    pub username: String,
    /// Unique email within the scope.
    pub email: String,
    /// Optional given name.
    pub name: Option<String>,
    /// Optional family name.
    pub surname: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
    /// Optional longitude of the user's address.
    pub longitude: Option<f64>,
    /// Optional latitude of the user's address.
    pub latitude: Option<f64>,
    /// Optional partner linkage.
    pub partner_id: Option<String>,
    /// Pending item selections, duplicates allowed.
    pub cart: Vec<i64>,
    /// Set once at insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    /// Externally issued identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
}

impl UserDraft {
    /// Materialise a full [`User`] with server-assigned timestamps.
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            name: None,
            surname: None,
            address: None,
            longitude: None,
            latitude: None,
            partner_id: None,
            cart: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tri-state patch value distinguishing "omitted" from "set to null".
///
/// JSON decoding maps a missing key to `Absent` (via `#[serde(default)]`),
/// an explicit `null` to `Null`, and any other value to `Value`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    /// Field was not present in the patch; leave it untouched.
    #[default]
    Absent,
    /// Field was explicitly set to null; clear it.
    Null,
    /// Field was set to a value.
    Value(T),
}

impl<T> Patch<T> {
    /// True when the field was present in the patch (null or value).
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Apply the patch to an optional target field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Self::Absent => {}
            Self::Null => *target = None,
            Self::Value(value) => *target = Some(value),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

/// Sparse update applied to an existing user.
///
/// Only fields marked present are touched. `username` and `email` are
/// required columns, so `Null` patches for them are rejected upstream by the
/// HTTP adapter. The cart is deliberately absent: it is only mutable through
/// the dedicated cart operations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserPatch {
    /// Replacement login name.
    pub username: Option<String>,
    /// Replacement email.
    pub email: Option<String>,
    /// Given name patch.
    pub name: Patch<String>,
    /// Family name patch.
    pub surname: Patch<String>,
    /// Address patch.
    pub address: Patch<String>,
    /// Longitude patch.
    pub longitude: Patch<f64>,
    /// Latitude patch.
    pub latitude: Patch<f64>,
    /// Partner linkage patch.
    pub partner_id: Patch<String>,
}

impl UserPatch {
    /// True when no field is present at all.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && !self.name.is_present()
            && !self.surname.is_present()
            && !self.address.is_present()
            && !self.longitude.is_present()
            && !self.latitude.is_present()
            && !self.partner_id.is_present()
    }

    /// Apply the present fields to `user`, refreshing `updated_at`.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        self.name.apply_to(&mut user.name);
        self.surname.apply_to(&mut user.surname);
        self.address.apply_to(&mut user.address);
        self.longitude.apply_to(&mut user.longitude);
        self.latitude.apply_to(&mut user.latitude);
        self.partner_id.apply_to(&mut user.partner_id);
        user.updated_at = now;
    }
}

/// Append an item reference to the cart, preserving duplicates.
pub fn cart_append(cart: &mut Vec<i64>, item: i64) {
    cart.push(item);
}

/// Remove at most the first occurrence of `item`; no-op when absent.
pub fn cart_remove_one(cart: &mut Vec<i64>, item: i64) {
    if let Some(position) = cart.iter().position(|existing| *existing == item) {
        cart.remove(position);
    }
}
