//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Catalog fields accepted when creating or replacing a product.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub image: String,
    #[validate(custom = "valid_price")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Largest price `products.price NUMERIC(12, 2)` holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() { return Err(ValidationError::new("negative_price")); }
    if *price > MAX_PRICE { return Err(ValidationError::new("price_too_large")); }
    Ok(())
}

impl Product {
    pub fn create(new: NewProduct) -> Self {
        Self {
            id: Uuid::now_v7(), name: new.name, description: new.description, image: new.image,
            price: new.price, quantity: new.quantity, created_at: Utc::now(),
        }
    }

    pub fn has_stock(&self, requested: i64) -> bool { i64::from(self.quantity) >= requested }

    /// Replaces the mutable catalog fields, keeping identity and creation time.
    pub fn apply(&mut self, changes: NewProduct) {
        self.name = changes.name;
        self.description = changes.description;
        self.image = changes.image;
        self.price = changes.price;
        self.quantity = changes.quantity;
    }
}
