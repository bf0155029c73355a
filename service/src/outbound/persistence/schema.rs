//! Diesel table definition for the per-tenant `users` table.
//!
//! Every tenant schema carries an identical copy of this table; the bound
//! `search_path` decides which copy a query hits. The definition must match
//! the startup DDL in [`super::diesel_user_store`].

diesel::table! {
    /// Tenant-scoped user records.
    users (id) {
        /// Externally issued identifier, up to 36 characters.
        id -> Varchar,
        /// Display handle; required.
        username -> Varchar,
        /// Contact address; unique within the tenant scope.
        email -> Varchar,
        /// Optional given name.
        name -> Nullable<Varchar>,
        /// Optional family name.
        surname -> Nullable<Varchar>,
        /// Optional postal address.
        address -> Nullable<Varchar>,
        /// Optional longitude of the stored address.
        longitude -> Nullable<Float8>,
        /// Optional latitude of the stored address.
        latitude -> Nullable<Float8>,
        /// Optional partner affiliation.
        partner_id -> Nullable<Varchar>,
        /// Cart item references; ordered, duplicates permitted.
        cart -> Array<Int8>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}
