//! PostgreSQL backed stores

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;

use super::{OrderStore, ProductStore, SessionStore, StoreError, StoreResult, UserStore};
use crate::domain::aggregates::{stock_reservations, NewOrder, NewOrderItem, NewProduct, NewUser, OrderLine, Product, Session, User};

const PRODUCT_COLUMNS: &str = "id, name, description, image, price, quantity, created_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unique_violation(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
        other => StoreError::Database(other),
    }
}

async fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<Uuid, sqlx::Error> {
    let (id,): (Uuid,) = sqlx::query_as("INSERT INTO orders (id, user_id, total, status, address, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING id")
        .bind(Uuid::now_v7()).bind(order.user_id).bind(order.total).bind(order.status.as_str()).bind(&order.address)
        .fetch_one(conn)
        .await?;
    Ok(id)
}

async fn insert_order_item(conn: &mut PgConnection, item: &NewOrderItem) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price, created_at) VALUES ($1, $2, $3, $4, $5, NOW())")
        .bind(Uuid::now_v7()).bind(item.order_id).bind(item.line.product_id).bind(item.line.quantity).bind(item.line.price)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email).fetch_optional(&self.pool).await?;
        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!("INSERT INTO users (id, first_name, last_name, email, password_hash, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {USER_COLUMNS}"))
            .bind(Uuid::now_v7()).bind(&user.first_name).bind(&user.last_name).bind(&user.email).bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: Session) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, NOW())")
            .bind(&session.token).bind(session.user_id).bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unique_violation)?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT token, user_id, expires_at FROM sessions WHERE token = $1")
            .bind(token).fetch_optional(&self.pool).await?;
        Ok(session)
    }

    async fn delete_expired_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id).bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted)
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn get_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn get_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let created = sqlx::query_as::<_, Product>(&format!("INSERT INTO products (id, name, description, image, price, quantity, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {PRODUCT_COLUMNS}"))
            .bind(Uuid::now_v7()).bind(&product.name).bind(&product.description).bind(&product.image).bind(product.price).bind(product.quantity)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(&format!("UPDATE products SET name = $2, description = $3, image = $4, price = $5, quantity = $6 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(product.id).bind(&product.name).bind(&product.description).bind(&product.image).bind(product.price).bind(product.quantity)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Uuid> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_order(&mut conn, &order).await?)
    }

    async fn create_order_item(&self, item: NewOrderItem) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_order_item(&mut conn, &item).await?)
    }

    async fn place_order(&self, order: NewOrder, lines: Vec<OrderLine>) -> StoreResult<Uuid> {
        // dropping `tx` before commit rolls every statement back
        let mut tx = self.pool.begin().await?;

        // row locks are taken in ascending product id order
        for (product_id, quantity) in stock_reservations(&lines) {
            let reserved = sqlx::query("UPDATE products SET quantity = quantity - $2 WHERE id = $1 AND quantity >= $2")
                .bind(product_id).bind(quantity)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if reserved == 0 { return Err(StoreError::InsufficientStock(product_id)); }
        }

        let order_id = insert_order(&mut tx, &order).await?;
        for line in lines {
            insert_order_item(&mut tx, &line.for_order(order_id)).await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let store = PgStore::connect(&url, 5).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    async fn customer(store: &PgStore) -> Uuid {
        let email = format!("{}@example.com", Uuid::now_v7());
        let user = NewUser { first_name: "Ada".into(), last_name: "Obi".into(), email, password_hash: "h".into() };
        store.create_user(user).await.unwrap().id
    }

    async fn product(store: &PgStore, quantity: i32) -> Product {
        let new = NewProduct { name: "Widget".into(), description: String::new(), image: String::new(), price: Decimal::new(1000, 2), quantity };
        store.create_product(new).await.unwrap()
    }

    async fn stock(store: &PgStore, id: Uuid) -> i32 {
        store.get_products_by_ids(&[id]).await.unwrap()[0].quantity
    }

    async fn order_count(store: &PgStore, user_id: Uuid) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1").bind(user_id).fetch_one(&store.pool).await.unwrap();
        count
    }

    fn line(product: &Product, quantity: i32) -> OrderLine { OrderLine { product_id: product.id, quantity, price: product.price } }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_place_order_rolls_back_on_short_stock() {
        let store = store().await;
        let user = customer(&store).await;
        let (plenty, scarce) = (product(&store, 5).await, product(&store, 1).await);

        let result = store.place_order(NewOrder::pending(user, Decimal::new(40, 0), None), vec![line(&plenty, 2), line(&scarce, 2)]).await;

        assert!(matches!(result, Err(StoreError::InsufficientStock(id)) if id == scarce.id));
        assert_eq!(stock(&store, plenty.id).await, 5);
        assert_eq!(stock(&store, scarce.id).await, 1);
        assert_eq!(order_count(&store, user).await, 0);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_place_order_reserves_repeated_lines() {
        let store = store().await;
        let user = customer(&store).await;
        let (a, b) = (product(&store, 5).await, product(&store, 1).await);

        let order_id = store.place_order(NewOrder::pending(user, Decimal::new(40, 0), None), vec![line(&b, 1), line(&a, 2), line(&a, 1)]).await.unwrap();

        assert_eq!(stock(&store, a.id).await, 2);
        assert_eq!(stock(&store, b.id).await, 0);
        let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE order_id = $1").bind(order_id).fetch_one(&store.pool).await.unwrap();
        assert_eq!(items, 3);

        let over = store.place_order(NewOrder::pending(user, Decimal::new(30, 0), None), vec![line(&a, 1), line(&a, 2)]).await;
        assert!(matches!(over, Err(StoreError::InsufficientStock(_))));
        assert_eq!(stock(&store, a.id).await, 2);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_opposite_carts_do_not_deadlock() {
        let store = store().await;
        let user = customer(&store).await;
        let (a, b) = (product(&store, 50).await, product(&store, 50).await);

        for _ in 0..10 {
            let (first, second) = tokio::join!(
                store.place_order(NewOrder::pending(user, Decimal::new(20, 0), None), vec![line(&a, 1), line(&b, 1)]),
                store.place_order(NewOrder::pending(user, Decimal::new(20, 0), None), vec![line(&b, 1), line(&a, 1)]),
            );
            first.unwrap();
            second.unwrap();
        }

        assert_eq!(stock(&store, a.id).await, 30);
        assert_eq!(stock(&store, b.id).await, 30);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_update_product_returns_rounded_row() {
        let store = store().await;
        let mut widget = product(&store, 1).await;
        widget.price = Decimal::new(12345, 3);

        let stored = store.update_product(&widget).await.unwrap();
        assert_eq!(stored.price, Decimal::new(1235, 2));

        widget.id = Uuid::now_v7();
        assert!(matches!(store.update_product(&widget).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_delete_expired_sessions() {
        let store = store().await;
        let user = customer(&store).await;
        let now = Utc::now();
        let stale = Session { token: Uuid::now_v7().to_string(), user_id: user, expires_at: now - chrono::Duration::hours(1) };
        let live = Session { token: Uuid::now_v7().to_string(), user_id: user, expires_at: now + chrono::Duration::hours(1) };
        store.create_session(stale.clone()).await.unwrap();
        store.create_session(live.clone()).await.unwrap();

        assert_eq!(store.delete_expired_sessions(user, now).await.unwrap(), 1);
        assert!(store.find_session(&stale.token).await.unwrap().is_none());
        assert!(store.find_session(&live.token).await.unwrap().is_some());
    }
}
