//! Error handling for SHELF HTTP layer

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use shelf_db::StoreError;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// Standard error response format for all JSON HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub details: Vec<serde_json::Value>,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("conflict: {message}")]
    Conflict {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    /// Method disabled on a path; rendered as plain text, not JSON
    #[error("{method} operation not supported on {path}")]
    Unsupported { method: String, path: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create a bad request error for an unusable query filter
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "invalid_filter".to_string(),
        }
    }

    /// Reject a method that is disabled on `path`
    pub fn unsupported(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Unsupported {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey {
                collection,
                field,
                value,
            } => Self::Conflict {
                message: format!("{} with {} '{}' already exists", collection, field, value),
                details: vec![json!({ "field": field, "value": value })],
                code: "duplicate_key".to_string(),
            },
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::validation(validation_details("", &errors), "request validation failed")
    }
}

/// Flatten field errors into `{field, error}` entries sorted by field name.
/// `prefix` is prepended to every field, e.g. `comments[0].`.
pub fn validation_details(
    prefix: &str,
    errors: &validator::ValidationErrors,
) -> Vec<serde_json::Value> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                json!({
                    "field": format!("{}{}", prefix, field),
                    "error": e.code,
                })
            })
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());

        let (status, error_code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                code,
                message,
                Some(details),
            ),
            AppError::Conflict {
                details,
                code,
                message,
            } => (StatusCode::CONFLICT, code, message, Some(details)),
            AppError::NotFound { message, code } => (StatusCode::NOT_FOUND, code, message, None),
            AppError::BadRequest { message, code } => {
                (StatusCode::BAD_REQUEST, code, message, None)
            }
            AppError::Unsupported { method, path } => {
                tracing::warn!(%method, %path, "rejected unsupported operation");
                return (
                    StatusCode::FORBIDDEN,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("{} operation not supported on {}", method, path),
                )
                    .into_response();
            }
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                format!("{:#}", e),
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                %message,
                "Request error"
            );
        } else {
            tracing::info!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                "Request error"
            );
        }

        // In production, we might want to hide internal error details
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                details: details.unwrap_or_default(),
                message,
                code: error_code,
                trace_id: error_id.to_string(),
                timestamp,
            },
        };

        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[derive(Validate)]
    struct Review {
        #[validate(range(min = 1, max = 5))]
        rating: i64,
        #[validate(length(min = 1))]
        author: String,
    }

    #[test]
    fn test_validation_error() {
        let details = vec![serde_json::json!({"field": "isbn", "error": "required"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_validation_details_are_sorted_and_prefixed() {
        let review = Review {
            rating: 6,
            author: String::new(),
        };
        let errors = review.validate().unwrap_err();
        let details = validation_details("comments[2].", &errors);

        assert_eq!(
            details,
            vec![
                json!({"field": "comments[2].author", "error": "length"}),
                json!({"field": "comments[2].rating", "error": "range"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_response_format() {
        let response = AppError::not_found("Book 42 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Book 42 not found");
        assert!(Uuid::parse_str(body["error"]["trace_id"].as_str().unwrap()).is_ok());
        assert!(OffsetDateTime::parse(body["error"]["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_is_plain_text_403() {
        let response = AppError::unsupported("PUT", "/books").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"PUT operation not supported on /books");
    }

    #[tokio::test]
    async fn test_duplicate_key_maps_to_conflict() {
        let error = AppError::from(StoreError::DuplicateKey {
            collection: "books",
            field: "isbn",
            value: "9781593278281".to_string(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "duplicate_key");
        assert_eq!(body["error"]["details"][0]["field"], "isbn");
    }

    #[test]
    fn test_internal_error_mapping() {
        let error = AppError::from(StoreError::Unavailable("connection refused".into()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_filter_is_bad_request() {
        let response = AppError::invalid_filter("Invalid price value").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
