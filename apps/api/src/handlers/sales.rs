//! # Sale Handlers
//!
//! | Method | Path              | Success message                     |
//! |--------|-------------------|-------------------------------------|
//! | POST   | `/api/sales`      | 201 "Sale created successfully"     |
//! | GET    | `/api/sales`      | 200 "Sales retrieved successfully"  |
//! | GET    | `/api/sales/{id}` | 200 "Sale retrieved successfully"   |
//! | PUT    | `/api/sales/{id}` | 200 "Sale updated successfully"     |
//! | DELETE | `/api/sales/{id}` | 200 "Sale deleted successfully"     |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::dto::{ApiResponse, CreateSaleRequest, SaleResponse, UpdateSaleRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_sale(
    State(state): State<AppState>,
    body: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SaleResponse>>)> {
    let Json(request) = body?;
    debug!(sale_number = %request.sale_number, "create_sale");

    let sale = state.sales.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Sale created successfully",
            SaleResponse::from(&sale),
        )),
    ))
}

pub async fn list_sales(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<SaleResponse>>>> {
    let sales = state.sales.list().await?;
    Ok(Json(ApiResponse::ok(
        "Sales retrieved successfully",
        sales.iter().map(SaleResponse::from).collect(),
    )))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SaleResponse>>> {
    let sale = state.sales.get(&id).await?;
    Ok(Json(ApiResponse::ok(
        "Sale retrieved successfully",
        SaleResponse::from(&sale),
    )))
}

pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSaleRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SaleResponse>>> {
    let Json(request) = body?;
    debug!(sale_id = %id, "update_sale");

    let sale = state.sales.update(&id, request).await?;
    Ok(Json(ApiResponse::ok(
        "Sale updated successfully",
        SaleResponse::from(&sale),
    )))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.sales.delete(&id).await?;
    Ok(Json(ApiResponse::empty("Sale deleted successfully")))
}
