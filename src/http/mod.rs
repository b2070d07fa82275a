//! HTTP surface
//!
//! Routes live under `/api/v1` except `/health`. Handlers stay thin: they
//! extract, call a service and map the result through [`ApiError`].

mod auth;
mod cart;
mod error;
mod json;
mod products;
mod users;

use std::sync::Arc;

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::publisher::EventPublisher;
use crate::services::{AuthService, CartService};
use crate::store::{OrderStore, ProductStore, SessionStore, UserStore};

pub use auth::AuthUser;
pub use error::ApiError;
pub use json::AppJson;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub cart: CartService,
    pub products: Arc<dyn ProductStore>,
}

impl AppState {
    /// Wires every service to one store backend.
    pub fn new<S>(config: &Config, store: S, events: EventPublisher) -> Self
    where
        S: UserStore + SessionStore + ProductStore + OrderStore + Clone + 'static,
    {
        let auth = AuthService::new(Arc::new(store.clone()), Arc::new(store.clone()), config.session_ttl, events.clone());
        let cart = CartService::new(Arc::new(store.clone()), Arc::new(store.clone()), events);
        Self { auth, cart, products: Arc::new(store) }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/:id", put(products::update_product))
        .route("/cart/checkout", post(cart::checkout));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-shop"})) }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}
