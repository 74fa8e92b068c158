use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::{
    auth::AuthUser,
    entities::sales_goal::Model as GoalModel,
    errors::ServiceError,
    services::{
        goals::{GoalListQuery, GoalProgress, GoalProgressQuery, UpsertGoalRequest},
        Actor,
    },
    ApiResponse, AppState,
};

/// Monthly goals of a year; sellers only get their own
#[utoipa::path(
    get,
    path = "/api/v1/goals",
    params(GoalListQuery),
    responses((status = 200, description = "Goals", body = ApiResponse<Vec<GoalModel>>)),
    tag = "goals"
)]
pub async fn list_goals(
    State(state): State<AppState>,
    Query(query): Query<GoalListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<GoalModel>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let goals = state.services.goals.list_goals(&actor, &query).await?;
    Ok(Json(ApiResponse::success(goals)))
}

/// Set a seller's target for a month
#[utoipa::path(
    put,
    path = "/api/v1/goals",
    request_body = UpsertGoalRequest,
    responses(
        (status = 200, description = "Goal saved", body = ApiResponse<GoalModel>),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "goals"
)]
pub async fn upsert_goal(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<UpsertGoalRequest>,
) -> Result<Json<ApiResponse<GoalModel>>, ServiceError> {
    let goal = state.services.goals.upsert_goal(request).await?;
    Ok(Json(ApiResponse::success(goal)))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals/progress",
    params(GoalProgressQuery),
    responses(
        (status = 200, description = "Target against achieved sales", body = ApiResponse<GoalProgress>),
        (status = 403, description = "Sellers may only see their own", body = crate::errors::ErrorResponse)
    ),
    tag = "goals"
)]
pub async fn goal_progress(
    State(state): State<AppState>,
    Query(query): Query<GoalProgressQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<GoalProgress>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let progress = state
        .services
        .goals
        .progress(&actor, query.seller_id, query.year, query.month)
        .await?;
    Ok(Json(ApiResponse::success(progress)))
}
