use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::file_response;
use crate::{
    auth::AuthUser,
    entities::document::Model as DocumentModel,
    errors::ServiceError,
    services::{
        documents::{DocumentListQuery, UploadDocumentRequest},
        Actor,
    },
    ApiResponse, AppState,
};

/// Documents attached to an order or a client
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Documents", body = ApiResponse<Vec<DocumentModel>>),
        (status = 400, description = "Neither order_id nor client_id given", body = crate::errors::ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<DocumentModel>>>, ServiceError> {
    let actor = Actor::from(&auth_user);
    let documents = state.services.documents.list_documents(&actor, &query).await?;
    Ok(Json(ApiResponse::success(documents)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body = UploadDocumentRequest,
    responses(
        (status = 201, description = "Document stored", body = ApiResponse<DocumentModel>),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn upload_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DocumentModel>>), ServiceError> {
    let actor = Actor::from(&auth_user);
    let document = state.services.documents.upload_document(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(document))))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    let actor = Actor::from(&auth_user);
    let file = state.services.documents.download_document(&actor, id).await?;
    Ok(file_response(file))
}

/// Only the uploader or a supervisor may delete
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    let actor = Actor::from(&auth_user);
    state.services.documents.delete_document(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
