//! Error to response mapping.

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};

use crate::{EcommerceError, StoreError};

/// Renders an [`EcommerceError`] as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub EcommerceError);

impl From<EcommerceError> for ApiError {
    fn from(err: EcommerceError) -> Self { Self(err) }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self { Self(err.into()) }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EcommerceError::Validation(format!("invalid request body: {}", rejection.body_text())))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self { Self(err.into()) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EcommerceError::InvalidQuantity(_) | EcommerceError::EmptyCart | EcommerceError::ProductNotFound(_) | EcommerceError::Validation(_) => StatusCode::BAD_REQUEST,
            EcommerceError::OutOfStock(_) | EcommerceError::EmailTaken(_) => StatusCode::CONFLICT,
            EcommerceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            EcommerceError::Unauthorized => StatusCode::FORBIDDEN,
            EcommerceError::NotFound => StatusCode::NOT_FOUND,
            EcommerceError::Internal(_) | EcommerceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::now_v7();
        assert_eq!(ApiError(EcommerceError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(EcommerceError::InvalidQuantity(id)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(EcommerceError::ProductNotFound(id)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(EcommerceError::OutOfStock(id)).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError(EcommerceError::InvalidCredentials).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError(EcommerceError::Unauthorized).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(StoreError::Conflict).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal server error");
    }
}
