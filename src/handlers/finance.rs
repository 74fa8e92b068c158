//! Receivables, payables and the money views built on them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::common::served_page;
use crate::{
    auth::AuthUser,
    entities::{payable::Model as PayableModel, receivable::Model as ReceivableModel},
    errors::ServiceError,
    services::finance::{
        CashFlow, CreatePayableRequest, CreateReceivableRequest, EntryListQuery, FinanceSummary,
        PeriodQuery, YearQuery,
    },
    ApiResponse, AppState, PaginatedResponse,
};

#[utoipa::path(
    get,
    path = "/api/v1/finance/receivables",
    params(EntryListQuery),
    responses((status = 200, description = "Receivables by due date", body = ApiResponse<PaginatedResponse<ReceivableModel>>)),
    tag = "finance"
)]
pub async fn list_receivables(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<ReceivableModel>>>, ServiceError> {
    let (items, total) = state
        .services
        .finance
        .list_receivables(&query, state.config.default_page_size)
        .await?;
    let (page, limit) = served_page(&state, query.page, query.limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/receivables",
    request_body = CreateReceivableRequest,
    responses(
        (status = 201, description = "Receivable created", body = ApiResponse<ReceivableModel>),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn create_receivable(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateReceivableRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReceivableModel>>), ServiceError> {
    let receivable = state.services.finance.create_receivable(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receivable))))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/receivables/{id}/pay",
    params(("id" = Uuid, Path, description = "Receivable id")),
    responses(
        (status = 200, description = "Marked as paid", body = ApiResponse<ReceivableModel>),
        (status = 400, description = "Entry is not open", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn pay_receivable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<ReceivableModel>>, ServiceError> {
    let receivable = state.services.finance.mark_receivable_paid(id).await?;
    Ok(Json(ApiResponse::success(receivable)))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/receivables/{id}/cancel",
    params(("id" = Uuid, Path, description = "Receivable id")),
    responses(
        (status = 200, description = "Cancelled", body = ApiResponse<ReceivableModel>),
        (status = 400, description = "Entry is not open", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn cancel_receivable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<ReceivableModel>>, ServiceError> {
    let receivable = state.services.finance.cancel_receivable(id).await?;
    Ok(Json(ApiResponse::success(receivable)))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/payables",
    params(EntryListQuery),
    responses((status = 200, description = "Payables by due date", body = ApiResponse<PaginatedResponse<PayableModel>>)),
    tag = "finance"
)]
pub async fn list_payables(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<PayableModel>>>, ServiceError> {
    let (items, total) = state
        .services
        .finance
        .list_payables(&query, state.config.default_page_size)
        .await?;
    let (page, limit) = served_page(&state, query.page, query.limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/payables",
    request_body = CreatePayableRequest,
    responses(
        (status = 201, description = "Payable created", body = ApiResponse<PayableModel>),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn create_payable(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreatePayableRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PayableModel>>), ServiceError> {
    let payable = state.services.finance.create_payable(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(payable))))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/payables/{id}/pay",
    params(("id" = Uuid, Path, description = "Payable id")),
    responses(
        (status = 200, description = "Marked as paid", body = ApiResponse<PayableModel>),
        (status = 400, description = "Entry is not open", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn pay_payable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PayableModel>>, ServiceError> {
    let payable = state.services.finance.mark_payable_paid(id).await?;
    Ok(Json(ApiResponse::success(payable)))
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/payables/{id}/cancel",
    params(("id" = Uuid, Path, description = "Payable id")),
    responses(
        (status = 200, description = "Cancelled", body = ApiResponse<PayableModel>),
        (status = 400, description = "Entry is not open", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn cancel_payable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PayableModel>>, ServiceError> {
    let payable = state.services.finance.cancel_payable(id).await?;
    Ok(Json(ApiResponse::success(payable)))
}

/// Open, overdue and paid totals for a period
#[utoipa::path(
    get,
    path = "/api/v1/finance/summary",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Summary", body = ApiResponse<FinanceSummary>),
        (status = 400, description = "Invalid period", body = crate::errors::ErrorResponse)
    ),
    tag = "finance"
)]
pub async fn finance_summary(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<FinanceSummary>>, ServiceError> {
    let summary = state.services.finance.summary(query.from, query.to).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Month-by-month money in and out for a year
#[utoipa::path(
    get,
    path = "/api/v1/finance/cash-flow",
    params(YearQuery),
    responses((status = 200, description = "Cash flow", body = ApiResponse<CashFlow>)),
    tag = "finance"
)]
pub async fn cash_flow(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<CashFlow>>, ServiceError> {
    let flow = state.services.finance.cash_flow(query.year).await?;
    Ok(Json(ApiResponse::success(flow)))
}
