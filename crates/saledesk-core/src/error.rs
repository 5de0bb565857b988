//! # Error Types
//!
//! Domain-specific error types for saledesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  saledesk-core errors (this file)                                      │
//! │  ├── CoreError         - Domain rule violations                        │
//! │  ├── ValidationError   - One failed request field                      │
//! │  └── ValidationErrors  - Every failed field of one request             │
//! │                                                                         │
//! │  saledesk-db errors (separate crate)                                   │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError          - What HTTP callers see (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → 400 / 404 / 422        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Failures raised by pricing, merging and event encoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quantity passed to the discount rule is above the per-product cap.
    ///
    /// Raised by [`crate::pricing::compute_discount`], which does not know
    /// the product name.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A sale item breaks the per-product cap during the discount pass.
    ///
    /// ## When This Occurs
    /// - Request validation was bypassed (e.g. a seed script)
    /// - An update raised an existing item above the cap
    ///
    /// ## User Workflow
    /// ```text
    /// PUT /api/sales/{id}  (quantity: 21)
    ///      │
    ///      ▼
    /// apply_discount_rules()
    ///      │
    ///      ▼
    /// QuantityLimitExceeded { product_name: "Mouse", max: 20 }
    ///      │
    ///      ▼
    /// 422: "Cannot sell more than 20 units of product 'Mouse'"
    /// ```
    #[error("Cannot sell more than {max} units of product '{product_name}'")]
    QuantityLimitExceeded { product_name: String, max: i64 },

    /// A price computation left the representable range. Only reachable
    /// when stored data skipped request validation.
    #[error("Amount too large while computing {0}")]
    AmountOverflow(&'static str),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// An event payload could not be encoded.
    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    /// Request validation failed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(ValidationErrors::from(vec![err]))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request fields don't meet requirements.
/// Field names use the wire spelling (`saleNumber`, `products[0].quantity`)
/// so callers can point at the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Timestamp lies in the future.
    #[error("{field} cannot be in the future")]
    InFuture { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two values that must agree don't.
    #[error("{field} does not match: {reason}")]
    Mismatch { field: String, reason: String },
}

impl ValidationError {
    /// Name of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InFuture { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Mismatch { field, .. } => field,
        }
    }
}

/// Every validation failure found in one request.
///
/// Validators collect instead of stopping at the first failure, so a caller
/// fixing a form sees all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summarize(.0))]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    /// Records a failure.
    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    /// Records the failure of a single-field check, if any.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.0.push(err);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        ValidationErrors(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of a domain operation.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_limit_message() {
        let err = CoreError::QuantityLimitExceeded {
            product_name: "Mouse".to_string(),
            max: 20,
        };
        assert_eq!(
            err.to_string(),
            "Cannot sell more than 20 units of product 'Mouse'"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer".to_string(),
        };
        assert_eq!(err.to_string(), "customer is required");
        assert_eq!(err.field(), "customer");

        let err = ValidationError::InFuture {
            field: "saleDate".to_string(),
        };
        assert_eq!(err.to_string(), "saleDate cannot be in the future");
    }

    #[test]
    fn test_validation_errors_join_messages() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required {
            field: "saleNumber".to_string(),
        });
        errors.push(ValidationError::MustBePositive {
            field: "products[0].unitPrice".to_string(),
        });

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "saleNumber is required; products[0].unitPrice must be greater than zero"
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_single_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "branch".to_string(),
        }
        .into();
        match core_err {
            CoreError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
