use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::{ApiError, AppJson, AppState};
use crate::domain::aggregates::{LoginUserPayload, RegisterUserPayload, User};

pub(super) async fn register(State(s): State<AppState>, AppJson(p): AppJson<RegisterUserPayload>) -> Result<(StatusCode, Json<User>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.auth.register(p).await?)))
}

pub(super) async fn login(State(s): State<AppState>, AppJson(p): AppJson<LoginUserPayload>) -> Result<Json<Value>, ApiError> {
    let session = s.auth.login(p).await?;
    Ok(Json(json!({ "token": session.token, "expiresAt": session.expires_at })))
}
