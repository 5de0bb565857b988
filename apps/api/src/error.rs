//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Saledesk                               │
//! │                                                                         │
//! │  Handler → SaleService → Result<T, ApiError>                            │
//! │                                                                         │
//! │  ValidationErrors ───────────────► VALIDATION_ERROR   400               │
//! │  DbError::NotFound / SaleNotFound ► NOT_FOUND         404               │
//! │  CoreError::QuantityLimitExceeded ► DOMAIN_RULE       422               │
//! │  DbError (anything else) ────────► DATABASE_ERROR     500 (logged)      │
//! │  everything else ────────────────► INTERNAL           500 (logged)      │
//! │                                                                         │
//! │  Client sees:                                                           │
//! │  {                                                                      │
//! │    "success": false,                                                    │
//! │    "code": "VALIDATION_ERROR",                                          │
//! │    "message": "Validation failed",                                      │
//! │    "errors": [{ "field": "customer", "detail": "customer is required" }]│
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database and internal failures are logged with their details; the
//! response only carries a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use saledesk_core::{CoreError, ValidationError, ValidationErrors};
use saledesk_db::DbError;

/// Result type for handlers and the service layer.
pub type ApiResult<T> = Result<T, ApiError>;

/// The `code` field of an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 400, with per-field `errors`
    ValidationError,

    /// 404
    NotFound,

    /// Request was valid but breaks a sale rule (422)
    DomainRule,

    /// 500; details only in the log
    DatabaseError,

    /// 500
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DomainRule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One offending request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub detail: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            detail: err.to_string(),
        }
    }
}

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,

    /// Shown to the caller as is
    pub message: String,

    /// Per-field failures; empty unless `code` is `VALIDATION_ERROR`
    pub errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// `"{resource} not found: {id}"`
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error without field details.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            errors: errors.iter().map(FieldError::from).collect(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(ValidationErrors::from(vec![err]))
    }
}

/// Pricing violations are 422; a missing sale is 404.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::QuantityLimitExceeded { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::AmountOverflow(_) => ApiError::new(ErrorCode::DomainRule, message),
            CoreError::Validation(errors) => ApiError::from(errors),
            CoreError::InvalidEvent(e) => {
                tracing::error!("Event encoding failed: {}", e);
                ApiError::internal("Internal error")
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { column } => {
                ApiError::validation(format!("{} already exists", column))
            }
            DbError::ForeignKeyViolation(message) => {
                tracing::error!(%message, "Sale write hit a foreign key");
                ApiError::validation("Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Malformed JSON bodies get the same envelope as field failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

// =============================================================================
// HTTP Response
// =============================================================================

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    #[serde(flatten)]
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self,
        };
        (self.status(), Json(body)).into_response()
    }
}
