//! Cart checkout rules
//!
//! Pure validation and pricing of a client supplied cart against a product
//! snapshot. Nothing here touches storage; [`crate::services::cart`] applies
//! the resulting [`CheckoutPlan`].

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{OrderLine, Product, MAX_ORDER_TOTAL};
use crate::{EcommerceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub items: Vec<CartItem>,
    #[validate(length(max = 512))]
    pub address: Option<String>,
}

/// Priced lines and their total, computed from one product snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutPlan {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

/// Collects the product ids referenced by `items`, in cart order.
///
/// Fails with [`EcommerceError::InvalidQuantity`] on the first item whose
/// quantity is not positive.
pub fn cart_item_ids(items: &[CartItem]) -> Result<Vec<Uuid>> {
    items
        .iter()
        .map(|item| if item.quantity <= 0 { Err(EcommerceError::InvalidQuantity(item.product_id)) } else { Ok(item.product_id) })
        .collect()
}

/// Validates `items` against the `products` snapshot and prices every line.
pub fn plan_checkout(products: &[Product], items: &[CartItem]) -> Result<CheckoutPlan> {
    let catalog: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let matched = check_stock(items, &catalog)?;

    let lines: Vec<OrderLine> = items
        .iter()
        .zip(matched)
        .map(|(item, product)| OrderLine { product_id: item.product_id, quantity: item.quantity, price: product.price })
        .collect();
    let total = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| line.line_total().and_then(|t| total.checked_add(t)))
        .filter(|total| *total <= MAX_ORDER_TOTAL)
        .ok_or_else(|| EcommerceError::Validation("order total is too large".to_string()))?;

    Ok(CheckoutPlan { lines, total })
}

/// Returns the snapshot product backing each item, in cart order.
fn check_stock<'a>(items: &[CartItem], catalog: &HashMap<Uuid, &'a Product>) -> Result<Vec<&'a Product>> {
    if items.is_empty() { return Err(EcommerceError::EmptyCart); }

    // lines for the same product draw from one stock count
    let mut requested: HashMap<Uuid, i64> = HashMap::with_capacity(items.len());
    let mut matched = Vec::with_capacity(items.len());
    for item in items {
        let product = *catalog.get(&item.product_id).ok_or(EcommerceError::ProductNotFound(item.product_id))?;
        let wanted = requested.entry(item.product_id).or_default();
        *wanted += i64::from(item.quantity);
        if !product.has_stock(*wanted) { return Err(EcommerceError::OutOfStock(item.product_id)); }
        matched.push(product);
    }
    Ok(matched)
}
