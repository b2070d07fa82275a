use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{ApiError, AppJson, AppState, AuthUser};
use crate::domain::aggregates::CheckoutPayload;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CheckoutResponse {
    order_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    total_price: Decimal,
}

pub(super) async fn checkout(State(s): State<AppState>, AuthUser(user): AuthUser, AppJson(p): AppJson<CheckoutPayload>) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let (order_id, total_price) = s.cart.checkout(user.id, &p).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order_id, total_price })))
}
