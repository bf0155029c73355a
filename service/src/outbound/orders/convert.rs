//! Wire-to-domain conversion for order history replies.

use chrono::{DateTime, Utc};

use crate::domain::ports::OrderSourceError;
use crate::domain::{OrderLineItem, OrderSummary};

use super::wire;

fn status_label(status: i32) -> String {
    wire::OrderStatus::try_from(status)
        .map(|status| {
            status
                .as_str_name()
                .trim_start_matches("ORDER_STATUS_")
                .to_ascii_lowercase()
        })
        .unwrap_or_else(|_| "unspecified".to_owned())
}

fn timestamp_to_utc(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

fn item_to_domain(item: wire::OrderItem) -> OrderLineItem {
    OrderLineItem {
        product_id: item.product_id,
        quantity: item.quantity,
        unit_price: item.unit_price,
    }
}

/// Convert one wire order, rejecting replies without a creation timestamp.
pub fn order_to_domain(order: wire::Order) -> Result<OrderSummary, OrderSourceError> {
    let created_at = order
        .created_at
        .as_ref()
        .and_then(timestamp_to_utc)
        .ok_or_else(|| {
            OrderSourceError::decode(format!(
                "order {} missing or invalid created_at",
                order.external_id
            ))
        })?;
    Ok(OrderSummary {
        external_id: order.external_id,
        order_id: order.order_id,
        user_id: order.user_id,
        order_status: status_label(order.status),
        total_amount: order.total_amount,
        created_at,
        tenant_id: order.tenant_id,
        partner_id: order.partner_id,
        payment_id: order.payment_id,
        items: order.items.into_iter().map(item_to_domain).collect(),
    })
}

/// Convert a full reply, preserving remote order.
pub fn response_to_domain(
    response: wire::GetOrdersByUserResponse,
) -> Result<Vec<OrderSummary>, OrderSourceError> {
    response.orders.into_iter().map(order_to_domain).collect()
}
