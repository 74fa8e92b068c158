use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        calendar::{CalendarQuery, DeliveryDay},
        Actor,
    },
    ApiResponse, AppState,
};

/// Deliveries due in a window of at most 92 days, grouped by date
#[utoipa::path(
    get,
    path = "/api/v1/calendar/deliveries",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Deliveries by day", body = ApiResponse<Vec<DeliveryDay>>),
        (status = 400, description = "Invalid window", body = crate::errors::ErrorResponse)
    ),
    tag = "calendar"
)]
pub async fn deliveries(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<DeliveryDay>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let days = state
        .services
        .calendar
        .deliveries(&actor, query.from, query.to)
        .await?;
    Ok(Json(ApiResponse::success(days)))
}
