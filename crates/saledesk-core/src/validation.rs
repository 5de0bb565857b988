//! # Validation Module
//!
//! Request field validation for Saledesk.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: JSON decoding (axum extractor)                               │
//! │  └── Types and required keys                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Blank strings, lengths, quantity and price ranges                 │
//! │  └── Collected into ValidationErrors (all failures, not the first)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Discount pass (crate::sale)                                  │
//! │  └── Quantity cap re-checked as a domain rule                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── NOT NULL and foreign key constraints                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-field validators return `ValidationResult<()>` and take the wire
//! field name, so `products[2].quantity` can be reported precisely.
//!
//! ## Usage
//! ```rust
//! use saledesk_core::validation::{validate_quantity, validate_required};
//! use saledesk_core::ValidationErrors;
//!
//! let mut errors = ValidationErrors::new();
//! errors.check(validate_required("customer", "", 100));
//! errors.check(validate_quantity("products[0].quantity", 0));
//! assert_eq!(errors.len(), 2);
//! ```

use chrono::{DateTime, Utc};

use crate::error::{ValidationError, ValidationErrors};
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};

/// Outcome of a single field check.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted sale number, customer, or branch.
pub const MAX_HEADER_FIELD_LEN: usize = 100;

/// Longest accepted product name.
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field.
///
/// ## Rules
/// - Must not be blank after trimming
/// - Must be at most `max` characters
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (20)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale form: product row                                                 │
/// │                                                                         │
/// │  Operator enters quantity: 25                                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity("products[0].quantity", 25) ← THIS FUNCTION         │
/// │       │                                                                 │
/// │       ├── qty <= 0? → "must be greater than zero"                      │
/// │       │                                                                 │
/// │       ├── qty > 20? → "must be between 1 and 20"                       │
/// │       │                                                                 │
/// │       └── OK → request continues to pricing                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is not a price, and nothing above
/// [`MAX_UNIT_PRICE`] is accepted.
pub fn validate_unit_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if price > Money::from_major(MAX_UNIT_PRICE) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }

    Ok(())
}

/// Validates a client-supplied discount.
///
/// The value is ignored by pricing, but a negative one is still a broken
/// request.
pub fn validate_discount(field: &str, discount: Money) -> ValidationResult<()> {
    if discount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that a sale date is not after `now`.
pub fn validate_not_future(
    field: &str,
    date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ValidationResult<()> {
    if date > now {
        return Err(ValidationError::InFuture {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Accepts any hyphenated or simple UUID string.
///
/// ## Example
/// ```rust
/// use saledesk_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Checks the header fields every create and update carries.
pub fn validate_sale_header(
    errors: &mut ValidationErrors,
    sale_number: &str,
    customer: &str,
    branch: &str,
) {
    errors.check(validate_required("saleNumber", sale_number, MAX_HEADER_FIELD_LEN));
    errors.check(validate_required("customer", customer, MAX_HEADER_FIELD_LEN));
    errors.check(validate_required("branch", branch, MAX_HEADER_FIELD_LEN));
}

/// Checks one product line, reporting fields as `products[index].<name>`.
pub fn validate_item(
    errors: &mut ValidationErrors,
    index: usize,
    product_name: &str,
    quantity: i64,
    unit_price: Money,
) {
    let field = |name: &str| format!("products[{index}].{name}");

    errors.check(validate_required(
        &field("productName"),
        product_name,
        MAX_PRODUCT_NAME_LEN,
    ));
    errors.check(validate_quantity(&field("quantity"), quantity));
    errors.check(validate_unit_price(&field("unitPrice"), unit_price));
}

// =============================================================================
// Unit Tests
// =============================================================================
