use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use super::{ApiError, AppJson, AppState, AuthUser};
use crate::domain::aggregates::{NewProduct, Product};
use crate::EcommerceError;

pub(super) async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(s.products.get_products().await?))
}

pub(super) async fn create_product(State(s): State<AppState>, AuthUser(user): AuthUser, AppJson(p): AppJson<NewProduct>) -> Result<(StatusCode, Json<Product>), ApiError> {
    p.validate()?;
    let product = s.products.create_product(p).await?;
    tracing::info!(product_id = %product.id, user_id = %user.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub(super) async fn update_product(State(s): State<AppState>, AuthUser(user): AuthUser, Path(id): Path<Uuid>, AppJson(p): AppJson<NewProduct>) -> Result<Json<Product>, ApiError> {
    p.validate()?;
    let mut product = s.products.get_products_by_ids(&[id]).await?.into_iter().next().ok_or(EcommerceError::NotFound)?;
    product.apply(p);
    let stored = s.products.update_product(&product).await?;
    tracing::info!(product_id = %id, user_id = %user.id, "product updated");
    Ok(Json(stored))
}
