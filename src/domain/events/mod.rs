//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        #[serde(with = "rust_decimal::serde::float")]
        total: Decimal,
        items: usize,
    },
    UserRegistered { user_id: Uuid, email: String },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self { Self::OrderPlaced { .. } => "shop.order.placed", Self::UserRegistered { .. } => "shop.user.registered" }
    }
}
