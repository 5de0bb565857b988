use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::dto::{ApiResponse, PricingPreviewRequest, PricingPreviewResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /api/pricing/preview`
///
/// Same discount rule the sale endpoints apply, without saving anything.
/// Lets a form show per-line discounts that match what the server will store.
pub async fn preview(
    State(state): State<AppState>,
    body: Result<Json<PricingPreviewRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<PricingPreviewResponse>>> {
    let Json(request) = body?;
    let preview = state.sales.preview(request)?;
    Ok(Json(ApiResponse::ok("Pricing calculated successfully", preview)))
}
