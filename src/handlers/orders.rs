use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::common::{served_page, OptionalJson};
use crate::{
    auth::AuthUser,
    entities::{order::Model as OrderModel, order_status_history::Model as StatusHistoryModel},
    errors::ServiceError,
    services::{
        order_workflow::{ChangeStatusRequest, WorkflowActionRequest},
        orders::{CreateOrderRequest, OrderDetail, OrderListQuery, UpdateOrderRequest},
        Actor,
    },
    ApiResponse, AppState, PaginatedResponse,
};

/// List orders visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<PaginatedResponse<OrderModel>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderModel>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let (items, total) = state
        .services
        .orders
        .list_orders(&actor, &query, state.config.default_page_size)
        .await?;
    let (page, limit) = served_page(&state, query.page, query.limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Create a quote
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Quote created", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Client or seller not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state.services.orders.create_quote(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state.services.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Edit notes, delivery date, discount or items while the order is editable
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Order no longer editable", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state.services.orders.update_order(&actor, id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 400, description = "Only quotes or cancelled orders can be deleted", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    let actor = Actor::from(&auth_user);
    state.services.orders.delete_order(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an order to another status
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<OrderModel>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Role may not make this change", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<OrderModel>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state.services.workflow.change_status(&actor, id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Status changes, oldest first", body = ApiResponse<Vec<StatusHistoryModel>>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<StatusHistoryModel>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let history = state.services.orders.history(&actor, id).await?;
    Ok(Json(ApiResponse::success(history)))
}

/// Art finalist takes an order from the awaiting-art queue
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/claim",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = WorkflowActionRequest,
    responses(
        (status = 200, description = "Order claimed", body = ApiResponse<OrderModel>),
        (status = 400, description = "Order is not awaiting art", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn claim_art(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    OptionalJson(payload): OptionalJson<WorkflowActionRequest>,
) -> Result<Json<ApiResponse<OrderModel>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state
        .services
        .workflow
        .claim_art(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Hand a claimed order back to the queue
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/release",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = WorkflowActionRequest,
    responses(
        (status = 200, description = "Order released", body = ApiResponse<OrderModel>),
        (status = 403, description = "Not the claimant", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn release_art(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    OptionalJson(payload): OptionalJson<WorkflowActionRequest>,
) -> Result<Json<ApiResponse<OrderModel>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state
        .services
        .workflow
        .release_art(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/submit-art",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = WorkflowActionRequest,
    responses(
        (status = 200, description = "Art sent for customer review", body = ApiResponse<OrderModel>),
        (status = 400, description = "No pending art version", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn submit_art(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    OptionalJson(payload): OptionalJson<WorkflowActionRequest>,
) -> Result<Json<ApiResponse<OrderModel>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let order = state
        .services
        .workflow
        .submit_art_for_review(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
