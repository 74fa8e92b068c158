use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::common::served_page;
use crate::{
    auth::AuthUser,
    entities::client::Model as ClientModel,
    errors::ServiceError,
    services::{
        client_import::ImportSummary,
        clients::{ClientListQuery, CreateClientRequest, DeleteOutcome, UpdateClientRequest},
    },
    ApiResponse, AppState, PaginatedResponse,
};

/// List clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(ClientListQuery),
    responses(
        (status = 200, description = "Clients", body = ApiResponse<PaginatedResponse<ClientModel>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientListQuery>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<ClientModel>>>, ServiceError> {
    let (items, total) = state
        .services
        .clients
        .list_clients(&query, state.config.default_page_size)
        .await?;
    let (page, limit) = served_page(&state, query.page, query.limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Register a client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ApiResponse<ClientModel>),
        (status = 409, description = "Document already registered", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ClientModel>>), ServiceError> {
    let client = state.services.clients.create_client(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(client))))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = ApiResponse<ClientModel>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<ClientModel>>, ServiceError> {
    let client = state.services.clients.get_client(id).await?;
    Ok(Json(ApiResponse::success(client)))
}

#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ApiResponse<ClientModel>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Document already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ClientModel>>, ServiceError> {
    let client = state.services.clients.update_client(id, request).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// Delete a client, or deactivate it when it already has orders
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client removed or deactivated", body = ApiResponse<DeleteOutcome>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<DeleteOutcome>>, ServiceError> {
    let outcome = state.services.clients.delete_client(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Bulk import from a CSV body with a header row
#[utoipa::path(
    post,
    path = "/api/v1/clients/import",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import summary", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Unreadable CSV", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn import_clients(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    body: String,
) -> Result<Json<ApiResponse<ImportSummary>>, ServiceError> {
    let summary = state.services.client_import.import_clients(&body).await?;
    Ok(Json(ApiResponse::success(summary)))
}
