//! Request-scoped order history shapes.
//!
//! These are never persisted: they are built from the order service's RPC
//! reply, merged into the response, and discarded.

use chrono::{DateTime, Utc};

use super::UserId;

/// One line item within a remote order, in wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineItem {
    /// Catalogue reference for the purchased product.
    pub product_id: i64,
    /// Purchased quantity.
    pub quantity: i32,
    /// Unit price at order time.
    pub unit_price: f64,
}

/// Summary of one remote order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    /// Public order reference.
    pub external_id: String,
    /// Remote numeric order id.
    pub order_id: i64,
    /// Owning user.
    pub user_id: String,
    /// Remote status label.
    pub order_status: String,
    /// Monetary total as reported by the order service.
    pub total_amount: f64,
    /// Order creation instant converted to UTC.
    pub created_at: DateTime<Utc>,
    /// Tenant the order belongs to.
    pub tenant_id: String,
    /// Optional partner linkage; absent stays absent, never a sentinel.
    pub partner_id: Option<String>,
    /// Optional payment linkage.
    pub payment_id: Option<String>,
    /// Line items in wire order.
    pub items: Vec<OrderLineItem>,
}

/// Aggregated response: a local user's remote order history.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHistory {
    /// The local user the history belongs to.
    pub user_id: UserId,
    /// Remote orders in reply order.
    pub orders: Vec<OrderSummary>,
}
