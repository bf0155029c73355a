//! Diesel row structs for the `users` table.
//!
//! Implementation details of the persistence adapter; the domain never sees
//! these types. Reads go through [`UserRow`], inserts through [`NewUserRow`],
//! and updates write a full [`UserRowChanges`] produced from the
//! already-patched domain entity.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{User, UserId, UserIdValidationError};

use super::schema::users;

/// Row struct for reading user records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub address: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub partner_id: Option<String>,
    pub cart: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserIdValidationError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id)?,
            username: row.username,
            email: row.email,
            name: row.name,
            surname: row.surname,
            address: row.address,
            longitude: row.longitude,
            latitude: row.latitude,
            partner_id: row.partner_id,
            cart: row.cart,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable struct for creating user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub surname: Option<&'a str>,
    pub address: Option<&'a str>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub partner_id: Option<&'a str>,
    pub cart: &'a [i64],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    pub fn from_user(user: &'a User) -> Self {
        Self {
            id: user.id.as_str(),
            username: &user.username,
            email: &user.email,
            name: user.name.as_deref(),
            surname: user.surname.as_deref(),
            address: user.address.as_deref(),
            longitude: user.longitude,
            latitude: user.latitude,
            partner_id: user.partner_id.as_deref(),
            cart: &user.cart,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Changeset writing every mutable column of an updated record.
///
/// `treat_none_as_null` is required: a patched entity with a cleared optional
/// field must null the column, not skip it.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserRowChanges<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub surname: Option<&'a str>,
    pub address: Option<&'a str>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub partner_id: Option<&'a str>,
    pub cart: &'a [i64],
    pub updated_at: DateTime<Utc>,
}

impl<'a> UserRowChanges<'a> {
    pub fn from_user(user: &'a User) -> Self {
        Self {
            username: &user.username,
            email: &user.email,
            name: user.name.as_deref(),
            surname: user.surname.as_deref(),
            address: user.address.as_deref(),
            longitude: user.longitude,
            latitude: user.latitude,
            partner_id: user.partner_id.as_deref(),
            cart: &user.cart,
            updated_at: user.updated_at,
        }
    }
}
