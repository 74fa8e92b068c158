use axum::{extract::State, response::Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{dashboards::Dashboard, Actor},
    ApiResponse, AppState,
};

/// The landing dashboard for the caller's role
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Role dashboard, tagged by `kind`", body = ApiResponse<Dashboard>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Dashboard>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let dashboard = state.services.dashboards.dashboard(&actor).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
