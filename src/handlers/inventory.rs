use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::common::served_page;
use crate::{
    auth::AuthUser,
    entities::{inventory_movement::Model as MovementModel, product::Model as ProductModel},
    errors::ServiceError,
    services::{
        inventory::{
            CreateProductRequest, MovementResult, ProductListQuery, RecordMovementRequest,
            UpdateProductRequest,
        },
        Actor,
    },
    ApiResponse, AppState, PaginatedResponse,
};

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/inventory/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products", body = ApiResponse<PaginatedResponse<ProductModel>>)
    ),
    tag = "inventory"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<ProductModel>>>, ServiceError> {
    let (items, total) = state
        .services
        .inventory
        .list_products(&query, state.config.default_page_size)
        .await?;
    let (page, limit) = served_page(&state, query.page, query.limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductModel>),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductModel>>), ServiceError> {
    let actor = Actor::from(&auth_user);
    let product = state.services.inventory.create_product(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<ProductModel>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state.services.inventory.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Update product details; the balance only moves through movements
#[utoipa::path(
    put,
    path = "/api/v1/inventory/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductModel>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state.services.inventory.update_product(id, request).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Movements, newest first", body = ApiResponse<Vec<MovementModel>>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<MovementModel>>>, ServiceError> {
    let movements = state.services.inventory.list_movements(id).await?;
    Ok(Json(ApiResponse::success(movements)))
}

/// Stock in, stock out, or a counted adjustment
#[utoipa::path(
    post,
    path = "/api/v1/inventory/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = ApiResponse<MovementResult>),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<RecordMovementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovementResult>>), ServiceError> {
    let actor = Actor::from(&auth_user);
    let result = state
        .services
        .inventory
        .record_movement(&actor, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}
