//! JSON body extractor whose rejections render through [`ApiError`].

use axum::extract::FromRequest;

use super::ApiError;

/// `axum::Json` with malformed or incomplete bodies answered as 400
/// `{"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);
