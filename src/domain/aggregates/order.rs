//! Order Aggregate

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored when a checkout does not name a shipping address.
pub const PLACEHOLDER_ADDRESS: &str = "123 Main St";

/// Largest order total `orders.total NUMERIC(20, 2)` holds.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, 2);

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: OrderStatus,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending" }
    }
}

/// An order header before the store assigns its identity.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder { pub user_id: Uuid, pub total: Decimal, pub status: OrderStatus, pub address: String }

impl NewOrder {
    pub fn pending(user_id: Uuid, total: Decimal, address: Option<&str>) -> Self {
        let address = address.map(str::trim).filter(|a| !a.is_empty()).unwrap_or(PLACEHOLDER_ADDRESS);
        Self { user_id, total, status: OrderStatus::Pending, address: address.to_string() }
    }

    pub fn into_order(self, id: Uuid) -> Order {
        Order { id, user_id: self.user_id, total: self.total, status: self.status, address: self.address, created_at: Utc::now() }
    }
}

/// A priced line of a checkout, not yet tied to an order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderLine { pub product_id: Uuid, pub quantity: i32, pub price: Decimal }

impl OrderLine {
    /// `None` when the product does not fit in a [`Decimal`].
    pub fn line_total(&self) -> Option<Decimal> { self.price.checked_mul(Decimal::from(self.quantity)) }
    pub fn for_order(self, order_id: Uuid) -> NewOrderItem { NewOrderItem { order_id, line: self } }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewOrderItem { pub order_id: Uuid, pub line: OrderLine }

impl NewOrderItem {
    pub fn into_item(self, id: Uuid) -> OrderItem {
        OrderItem {
            id, order_id: self.order_id, product_id: self.line.product_id, quantity: self.line.quantity,
            price: self.line.price, created_at: Utc::now(),
        }
    }
}

/// Units to reserve per product, summed over `lines` and keyed in ascending
/// product id order. Every writer takes product row locks in this order.
pub fn stock_reservations(lines: &[OrderLine]) -> BTreeMap<Uuid, i64> {
    lines.iter().fold(BTreeMap::new(), |mut acc, line| {
        *acc.entry(line.product_id).or_default() += i64::from(line.quantity);
        acc
    })
}
