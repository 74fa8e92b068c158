use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::reports::{ClientSales, ReportQuery, SalesReport},
    ApiResponse, AppState,
};

/// Sales over a date range, split by seller and by status
#[utoipa::path(
    get,
    path = "/api/v1/reports/sales",
    params(ReportQuery),
    responses(
        (status = 200, description = "Sales report", body = ApiResponse<SalesReport>),
        (status = 400, description = "Invalid period", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<SalesReport>>, ServiceError> {
    let report = state.services.reports.sales_report(query.from, query.to).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/top-clients",
    params(ReportQuery),
    responses((status = 200, description = "Clients by revenue", body = ApiResponse<Vec<ClientSales>>)),
    tag = "reports"
)]
pub async fn top_clients(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ClientSales>>>, ServiceError> {
    let clients = state
        .services
        .reports
        .top_clients(query.from, query.to, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(clients)))
}

/// The orders behind the sales report as a spreadsheet-friendly CSV
#[utoipa::path(
    get,
    path = "/api/v1/reports/sales.csv",
    params(ReportQuery),
    responses((status = 200, description = "CSV export", content_type = "text/csv", body = String)),
    tag = "reports"
)]
pub async fn sales_csv(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    _auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    let csv = state
        .services
        .reports
        .export_sales_csv(query.from, query.to)
        .await?;
    let disposition = format!(
        "attachment; filename=\"sales-{}-{}.csv\"",
        query.from, query.to
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
