//! Request extractors that report failures through [`AppError`].

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    FromRequest, FromRequestParts,
};
use serde_json::json;

use crate::error::AppError;

/// JSON body extractor whose rejections share the API error envelope.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON that does not fit the payload type
            JsonRejection::JsonDataError(err) => AppError::validation(
                vec![json!({ "error": err.body_text() })],
                "request body does not match the expected shape",
            ),
            other => AppError::BadRequest {
                message: other.body_text(),
                code: "malformed_body".to_string(),
            },
        }
    }
}

/// Query string extractor; a query that does not deserialize is an invalid filter.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid_filter(rejection.body_text())
    }
}
