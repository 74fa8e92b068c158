use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::file_response;
use crate::{
    auth::AuthUser,
    entities::art_version::Model as ArtVersionModel,
    errors::ServiceError,
    services::{
        art::{ReviewArtRequest, UploadFileRequest},
        Actor,
    },
    ApiResponse, AppState,
};

/// Art versions of an order, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/art",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Art versions", body = ApiResponse<Vec<ArtVersionModel>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "art"
)]
pub async fn list_art_versions(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ArtVersionModel>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let versions = state.services.art.list_art_versions(&actor, order_id).await?;
    Ok(Json(ApiResponse::success(versions)))
}

/// Upload a new art proof for an order in progress
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/art",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UploadFileRequest,
    responses(
        (status = 201, description = "Art version stored", body = ApiResponse<ArtVersionModel>),
        (status = 400, description = "Order is not in art production", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse)
    ),
    tag = "art"
)]
pub async fn upload_art_version(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UploadFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ArtVersionModel>>), ServiceError> {
    let actor = Actor::from(&auth_user);
    let version = state
        .services
        .art
        .upload_art_version(&actor, order_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(version))))
}

/// Record the customer's approval or rejection of the pending proof
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/art/review",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ReviewArtRequest,
    responses(
        (status = 200, description = "Review recorded", body = ApiResponse<ArtVersionModel>),
        (status = 400, description = "Order is not in review, or a rejection without feedback", body = crate::errors::ErrorResponse)
    ),
    tag = "art"
)]
pub async fn review_art(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ReviewArtRequest>,
) -> Result<Json<ApiResponse<ArtVersionModel>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let version = state.services.art.review_art(&actor, order_id, request).await?;
    Ok(Json(ApiResponse::success(version)))
}

#[utoipa::path(
    get,
    path = "/api/v1/art/{id}/download",
    params(("id" = Uuid, Path, description = "Art version id")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "art"
)]
pub async fn download_art_version(
    State(state): State<AppState>,
    Path(art_id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    let actor = Actor::from(&auth_user);
    let file = state.services.art.download_art_version(&actor, art_id).await?;
    Ok(file_response(file))
}
