//! # Request and Response Bodies
//!
//! Wire shapes of the HTTP API and the explicit conversions between them
//! and the core types.
//!
//! ```text
//! CreateSaleRequest ──validate──► into_sale() ──► Sale
//! UpdateSaleRequest ──validate──► into_update() ─► SaleUpdate ──► merge_update
//! Sale ──────────────────────────► SaleResponse (totals derived here)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use saledesk_core::validation::{
    validate_discount, validate_item, validate_not_future, validate_quantity, validate_sale_header,
    validate_unit_price, validate_uuid, MAX_PRODUCT_NAME_LEN,
};
use saledesk_core::{
    ItemUpdate, Money, PricedLine, Sale, SaleItem, SaleUpdate, ValidationError, ValidationErrors,
    DEFAULT_CANCELLATION_REASON,
};

/// Longest accepted cancellation reason.
pub const MAX_CANCELLATION_REASON_LEN: usize = MAX_PRODUCT_NAME_LEN;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope shared by every `/api` route.
///
/// ```json
/// { "success": true, "message": "Sale created successfully", "data": { ... } }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload (`"data": null`).
    pub fn empty(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleItemRequest {
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer: String,
    pub branch: String,
    #[serde(default)]
    pub products: Vec<CreateSaleItemRequest>,
}

impl CreateSaleRequest {
    /// Collects every field failure. `now` bounds the sale date.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_sale_header(&mut errors, &self.sale_number, &self.customer, &self.branch);
        errors.check(validate_not_future("saleDate", self.sale_date, now));

        for (index, product) in self.products.iter().enumerate() {
            validate_item(
                &mut errors,
                index,
                &product.product_name,
                product.quantity,
                product.unit_price,
            );
        }

        errors.into_result()
    }

    /// Builds an unpriced sale. Run the discount pass before saving.
    pub fn into_sale(self, now: DateTime<Utc>) -> Sale {
        let mut sale = Sale::new(
            self.sale_number.trim(),
            self.sale_date,
            self.customer.trim(),
            self.branch.trim(),
            now,
        );

        for product in self.products {
            sale.add_item(product.product_name.trim(), product.quantity, product.unit_price);
        }

        sale
    }
}

// =============================================================================
// Update
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleItemRequest {
    /// Known ids update that item; missing or unknown ids add a new one.
    #[serde(default)]
    pub id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Accepted for compatibility and ignored; discounts are always recomputed.
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl UpdateSaleItemRequest {
    fn item_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    /// Optional echo of the path id. Must match when present.
    #[serde(default)]
    pub id: Option<String>,
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer: String,
    pub branch: String,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub products: Vec<UpdateSaleItemRequest>,
}

impl UpdateSaleRequest {
    /// Collects every field failure, the path id included.
    pub fn validate(&self, path_id: &str) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(validate_uuid("id", path_id));
        if let Some(body_id) = self.id.as_deref().filter(|id| !id.trim().is_empty()) {
            if body_id != path_id {
                errors.push(ValidationError::Mismatch {
                    field: "id".to_string(),
                    reason: "body id must equal the id in the path".to_string(),
                });
            }
        }

        validate_sale_header(&mut errors, &self.sale_number, &self.customer, &self.branch);

        if let Some(reason) = &self.cancellation_reason {
            if reason.chars().count() > MAX_CANCELLATION_REASON_LEN {
                errors.push(ValidationError::TooLong {
                    field: "cancellationReason".to_string(),
                    max: MAX_CANCELLATION_REASON_LEN,
                });
            }
        }

        for (index, product) in self.products.iter().enumerate() {
            if let Some(id) = product.item_id() {
                errors.check(validate_uuid(&format!("products[{index}].id"), id));
            }
            validate_item(
                &mut errors,
                index,
                &product.product_name,
                product.quantity,
                product.unit_price,
            );
            if let Some(discount) = product.discount {
                errors.check(validate_discount(
                    &format!("products[{index}].discount"),
                    discount,
                ));
            }
        }

        errors.into_result()
    }

    /// Reason recorded on the `SaleCancelled` event.
    pub fn cancellation_reason(&self) -> String {
        self.cancellation_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_CANCELLATION_REASON)
            .to_string()
    }

    pub fn into_update(self) -> SaleUpdate {
        let items = self
            .products
            .into_iter()
            .map(|product| ItemUpdate {
                id: product.item_id().map(str::to_string),
                product_name: product.product_name.trim().to_string(),
                quantity: product.quantity,
                unit_price: product.unit_price,
                is_cancelled: product.is_cancelled,
            })
            .collect();

        SaleUpdate {
            sale_number: self.sale_number.trim().to_string(),
            sale_date: self.sale_date,
            customer: self.customer.trim().to_string(),
            branch: self.branch.trim().to_string(),
            is_cancelled: self.is_cancelled,
            items,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemResponse {
    pub id: String,
    pub sale_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub total: Money,
    pub is_cancelled: bool,
}

impl From<&SaleItem> for SaleItemResponse {
    fn from(item: &SaleItem) -> Self {
        SaleItemResponse {
            id: item.id.clone(),
            sale_id: item.sale_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount: item.discount,
            total: item.total(),
            is_cancelled: item.is_cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: String,
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer: String,
    pub branch: String,
    pub is_cancelled: bool,
    /// Every item, cancelled ones included.
    pub total_amount: Money,
    /// Non-cancelled items only.
    pub active_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub products: Vec<SaleItemResponse>,
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        SaleResponse {
            id: sale.id.clone(),
            sale_number: sale.sale_number.clone(),
            sale_date: sale.sale_date,
            customer: sale.customer.clone(),
            branch: sale.branch.clone(),
            is_cancelled: sale.is_cancelled,
            total_amount: sale.total_amount(),
            active_amount: sale.active_amount(),
            created_at: sale.created_at,
            updated_at: sale.updated_at,
            products: sale.items.iter().map(SaleItemResponse::from).collect(),
        }
    }
}

// =============================================================================
// Pricing Preview
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLineRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPreviewRequest {
    pub products: Vec<PreviewLineRequest>,
}

impl PricingPreviewRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (index, line) in self.products.iter().enumerate() {
            errors.check(validate_quantity(
                &format!("products[{index}].quantity"),
                line.quantity,
            ));
            errors.check(validate_unit_price(
                &format!("products[{index}].unitPrice"),
                line.unit_price,
            ));
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(flatten)]
    pub priced: PricedLine,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPreviewResponse {
    pub lines: Vec<PreviewLine>,
    pub total_amount: Money,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_events: Option<i64>,
    /// Undelivered entries the relay has given up on. Only reported when a
    /// relay is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhausted_events: Option<i64>,
}
