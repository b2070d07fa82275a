//! Checkout orchestration.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{cart_item_ids, plan_checkout, CartItem, CheckoutPayload, NewOrder, Product};
use crate::domain::events::DomainEvent;
use crate::publisher::EventPublisher;
use crate::store::{OrderStore, ProductStore};
use crate::Result;

#[derive(Clone)]
pub struct CartService {
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    events: EventPublisher,
}

impl CartService {
    pub fn new(products: Arc<dyn ProductStore>, orders: Arc<dyn OrderStore>, events: EventPublisher) -> Self {
        Self { products, orders, events }
    }

    /// Checks out `payload` for `user_id`, fetching the product snapshot first.
    #[instrument(skip_all, fields(user_id = %user_id, items = payload.items.len()))]
    pub async fn checkout(&self, user_id: Uuid, payload: &CheckoutPayload) -> Result<(Uuid, Decimal)> {
        payload.validate()?;
        let ids = cart_item_ids(&payload.items)?;
        let products = self.products.get_products_by_ids(&ids).await?;
        self.create_order(&products, &payload.items, user_id, payload.address.as_deref()).await
    }

    /// Validates `items` against `products`, then reserves stock and records
    /// the order with its items in one unit. Returns the order id and total.
    pub async fn create_order(&self, products: &[Product], items: &[CartItem], user_id: Uuid, address: Option<&str>) -> Result<(Uuid, Decimal)> {
        cart_item_ids(items)?;
        let plan = plan_checkout(products, items)?;
        let (total, line_count) = (plan.total, plan.lines.len());

        let order_id = self.orders.place_order(NewOrder::pending(user_id, total, address), plan.lines).await?;
        info!(%order_id, %user_id, %total, "order placed");

        self.events.publish(&DomainEvent::OrderPlaced { order_id, user_id, total, items: line_count }).await;
        Ok((order_id, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, PLACEHOLDER_ADDRESS};
    use crate::store::{MemoryStore, MockOrderStore, StoreError};
    use crate::EcommerceError;

    fn product(price: Decimal, quantity: i32) -> Product {
        Product::create(NewProduct { name: "Widget".into(), description: String::new(), image: String::new(), price, quantity })
    }

    fn service(store: &MemoryStore) -> CartService {
        CartService::new(Arc::new(store.clone()), Arc::new(store.clone()), EventPublisher::disabled())
    }

    fn seeded(products: &[Product]) -> MemoryStore {
        let store = MemoryStore::new();
        for p in products { store.insert_product(p.clone()); }
        store
    }

    fn item(product_id: Uuid, quantity: i32) -> CartItem { CartItem { product_id, quantity } }

    #[tokio::test]
    async fn test_checkout_decrements_stock_and_records_order() {
        let p = product(Decimal::new(10, 0), 5);
        let store = seeded(&[p.clone()]);
        let user = Uuid::now_v7();

        let (order_id, total) = service(&store).create_order(&[p.clone()], &[item(p.id, 2)], user, None).await.unwrap();

        assert_eq!(total, Decimal::new(20, 0));
        assert_eq!(store.product(p.id).unwrap().quantity, 3);
        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!((orders[0].id, orders[0].user_id, orders[0].total), (order_id, user, total));
        assert_eq!(orders[0].address, PLACEHOLDER_ADDRESS);
        let items = store.order_items();
        assert_eq!(items.len(), 1);
        assert_eq!((items[0].order_id, items[0].product_id, items[0].quantity, items[0].price), (order_id, p.id, 2, Decimal::new(10, 0)));
    }

    #[tokio::test]
    async fn test_total_matches_line_items() {
        let (a, b) = (product(Decimal::new(1999, 2), 10), product(Decimal::new(5, 1), 10));
        let store = seeded(&[a.clone(), b.clone()]);

        let (_, total) = service(&store).create_order(&[a.clone(), b.clone()], &[item(a.id, 3), item(b.id, 7)], Uuid::now_v7(), Some("9 Broad St")).await.unwrap();

        let line_sum: Decimal = store.order_items().iter().map(|i| i.price * Decimal::from(i.quantity)).sum();
        assert_eq!(total, Decimal::new(6347, 2));
        assert_eq!(line_sum, total);
        assert_eq!(store.orders()[0].address, "9 Broad St");
        assert_eq!(store.product(a.id).unwrap().quantity, 7);
        assert_eq!(store.product(b.id).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_line_price_is_snapshot() {
        let p = product(Decimal::new(10, 0), 5);
        let store = seeded(&[p.clone()]);
        let cart = service(&store);
        cart.create_order(&[p.clone()], &[item(p.id, 1)], Uuid::now_v7(), None).await.unwrap();

        let mut repriced = store.product(p.id).unwrap();
        repriced.price = Decimal::new(99, 0);
        store.update_product(&repriced).await.unwrap();

        assert_eq!(store.order_items()[0].price, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn test_out_of_stock_leaves_store_untouched() {
        let p = product(Decimal::new(10, 0), 5);
        let store = seeded(&[p.clone()]);

        let err = service(&store).create_order(&[p.clone()], &[item(p.id, 10)], Uuid::now_v7(), None).await.unwrap_err();

        assert!(matches!(err, EcommerceError::OutOfStock(id) if id == p.id));
        assert_eq!(store.product(p.id).unwrap().quantity, 5);
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_never_reach_the_store() {
        let p = product(Decimal::ONE, 5);
        let mut orders = MockOrderStore::new();
        orders.expect_place_order().never();
        let cart = CartService::new(Arc::new(seeded(&[p.clone()])), Arc::new(orders), EventPublisher::disabled());
        let user = Uuid::now_v7();

        let empty = cart.create_order(&[p.clone()], &[], user, None).await;
        assert!(matches!(empty, Err(EcommerceError::EmptyCart)));

        let zero = cart.create_order(&[p.clone()], &[item(p.id, 0)], user, None).await;
        assert!(matches!(zero, Err(EcommerceError::InvalidQuantity(_))));

        let unknown = Uuid::now_v7();
        let missing = cart.create_order(&[p.clone()], &[item(unknown, 1)], user, None).await;
        assert!(matches!(missing, Err(EcommerceError::ProductNotFound(id)) if id == unknown));

        let greedy = cart.create_order(&[p.clone()], &[item(p.id, 6)], user, None).await;
        assert!(matches!(greedy, Err(EcommerceError::OutOfStock(_))));
    }

    #[tokio::test]
    async fn test_invalid_quantity_checked_before_product_lookup() {
        let p = product(Decimal::ONE, 5);
        let store = seeded(&[p.clone()]);
        let mut products = crate::store::MockProductStore::new();
        products.expect_get_products_by_ids().never();
        let cart = CartService::new(Arc::new(products), Arc::new(store.clone()), EventPublisher::disabled());

        let payload = CheckoutPayload { items: vec![item(p.id, 1), item(p.id, -1)], address: None };
        let err = cart.checkout(Uuid::now_v7(), &payload).await.unwrap_err();

        assert!(matches!(err, EcommerceError::InvalidQuantity(_)));
        assert_eq!(store.product(p.id).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_checkout_fetches_snapshot() {
        let p = product(Decimal::new(10, 0), 5);
        let store = seeded(&[p.clone()]);

        let payload = CheckoutPayload { items: vec![item(p.id, 2)], address: None };
        let (_, total) = service(&store).checkout(Uuid::now_v7(), &payload).await.unwrap();
        assert_eq!(total, Decimal::new(20, 0));

        let empty = CheckoutPayload { items: vec![], address: None };
        assert!(matches!(service(&store).checkout(Uuid::now_v7(), &empty).await, Err(EcommerceError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_stale_snapshot_cannot_oversell() {
        let p = product(Decimal::ONE, 3);
        let store = seeded(&[p.clone()]);
        let cart = service(&store);

        // both checkouts validated against the same snapshot of 3 units
        cart.create_order(&[p.clone()], &[item(p.id, 2)], Uuid::now_v7(), None).await.unwrap();
        let second = cart.create_order(&[p.clone()], &[item(p.id, 2)], Uuid::now_v7(), None).await;

        assert!(matches!(second, Err(EcommerceError::OutOfStock(_))));
        assert_eq!(store.product(p.id).unwrap().quantity, 1);
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let p = product(Decimal::ONE, 3);
        let mut orders = MockOrderStore::new();
        orders.expect_place_order().times(1).returning(|_, _| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));
        let cart = CartService::new(Arc::new(seeded(&[p.clone()])), Arc::new(orders), EventPublisher::disabled());

        let err = cart.create_order(&[p.clone()], &[item(p.id, 1)], Uuid::now_v7(), None).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Storage(StoreError::Database(_))));
    }
}
