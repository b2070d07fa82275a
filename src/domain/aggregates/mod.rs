//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, NewProduct, MAX_PRICE};
pub use order::{Order, OrderItem, OrderLine, OrderStatus, NewOrder, NewOrderItem, MAX_ORDER_TOTAL, PLACEHOLDER_ADDRESS, stock_reservations};
pub use cart::{CartItem, CheckoutPayload, CheckoutPlan, cart_item_ids, plan_checkout};
pub use user::{User, NewUser, Session, RegisterUserPayload, LoginUserPayload, normalize_email};
