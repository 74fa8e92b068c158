//! Flagworks API library
//!
//! Back office for a flag workshop: clients, service orders and their art
//! approval workflow, production, inventory, finance and per-role dashboards.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::HeaderValue,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, AuthService};
use crate::db::DbPool;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        let auth = Arc::new(AuthService::new(
            auth::AuthConfig::from(&config),
            db.clone(),
        ));
        Self {
            db,
            config: Arc::new(config),
            services,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route, each group behind the permission it needs.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        art, calendar, clients, dashboard, documents, finance, goals, inventory, orders, reports,
        users,
    };

    let users = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).put(users::update_user))
        .route("/users/:id/password", put(users::reset_password))
        .with_permission(perm::USERS_MANAGE);

    // Clients
    let clients_read = Router::new()
        .route("/clients", get(clients::list_clients))
        .route("/clients/:id", get(clients::get_client))
        .with_permission(perm::CLIENTS_READ);
    let clients_write = Router::new()
        .route("/clients", post(clients::create_client))
        .route("/clients/:id", put(clients::update_client))
        .with_permission(perm::CLIENTS_WRITE);
    let clients_delete = Router::new()
        .route("/clients/:id", delete(clients::delete_client))
        .with_permission(perm::CLIENTS_DELETE);
    let clients_import = Router::new()
        .route("/clients/import", post(clients::import_clients))
        .with_permission(perm::CLIENTS_IMPORT);

    // Orders and workflow
    let orders_read = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/history", get(orders::order_history))
        .with_permission(perm::ORDERS_READ);
    let orders_create = Router::new()
        .route("/orders", post(orders::create_order))
        .with_permission(perm::ORDERS_CREATE);
    let orders_update = Router::new()
        .route("/orders/:id", put(orders::update_order))
        .with_permission(perm::ORDERS_UPDATE);
    let orders_delete = Router::new()
        .route("/orders/:id", delete(orders::delete_order))
        .with_permission(perm::ORDERS_DELETE);
    let orders_status = Router::new()
        .route("/orders/:id/status", post(orders::change_status))
        .route("/orders/:id/claim", post(orders::claim_art))
        .route("/orders/:id/release", post(orders::release_art))
        .route("/orders/:id/submit-art", post(orders::submit_art))
        .with_permission(perm::ORDERS_STATUS);

    // Art proofs
    let art_read = Router::new()
        .route("/orders/:id/art", get(art::list_art_versions))
        .route("/art/:id/download", get(art::download_art_version))
        .with_permission(perm::ART_READ);
    let art_upload = Router::new()
        .route("/orders/:id/art", post(art::upload_art_version))
        .with_permission(perm::ART_UPLOAD);
    let art_review = Router::new()
        .route("/orders/:id/art/review", post(art::review_art))
        .with_permission(perm::ART_REVIEW);

    // Documents
    let documents_read = Router::new()
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", get(documents::download_document))
        .with_permission(perm::DOCUMENTS_READ);
    let documents_write = Router::new()
        .route("/documents", post(documents::upload_document))
        .route("/documents/:id", delete(documents::delete_document))
        .with_permission(perm::DOCUMENTS_WRITE);

    // Inventory
    let inventory_read = Router::new()
        .route("/inventory/products", get(inventory::list_products))
        .route("/inventory/products/:id", get(inventory::get_product))
        .route(
            "/inventory/products/:id/movements",
            get(inventory::list_movements),
        )
        .with_permission(perm::INVENTORY_READ);
    let inventory_manage = Router::new()
        .route("/inventory/products", post(inventory::create_product))
        .route("/inventory/products/:id", put(inventory::update_product))
        .with_permission(perm::INVENTORY_MANAGE);
    let inventory_move = Router::new()
        .route(
            "/inventory/products/:id/movements",
            post(inventory::record_movement),
        )
        .with_permission(perm::INVENTORY_MOVE);

    // Finance
    let finance_read = Router::new()
        .route("/finance/receivables", get(finance::list_receivables))
        .route("/finance/payables", get(finance::list_payables))
        .route("/finance/summary", get(finance::finance_summary))
        .route("/finance/cash-flow", get(finance::cash_flow))
        .with_permission(perm::FINANCE_READ);
    let finance_manage = Router::new()
        .route("/finance/receivables", post(finance::create_receivable))
        .route("/finance/receivables/:id/pay", post(finance::pay_receivable))
        .route(
            "/finance/receivables/:id/cancel",
            post(finance::cancel_receivable),
        )
        .route("/finance/payables", post(finance::create_payable))
        .route("/finance/payables/:id/pay", post(finance::pay_payable))
        .route("/finance/payables/:id/cancel", post(finance::cancel_payable))
        .with_permission(perm::FINANCE_MANAGE);

    // Goals
    let goals_read = Router::new()
        .route("/goals", get(goals::list_goals))
        .route("/goals/progress", get(goals::goal_progress))
        .with_permission(perm::GOALS_READ);
    let goals_manage = Router::new()
        .route("/goals", put(goals::upsert_goal))
        .with_permission(perm::GOALS_MANAGE);

    // Read-only views
    let reports = Router::new()
        .route("/reports/sales", get(reports::sales_report))
        .route("/reports/top-clients", get(reports::top_clients))
        .route("/reports/sales.csv", get(reports::sales_csv))
        .with_permission(perm::REPORTS_READ);
    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .with_permission(perm::DASHBOARD_READ);
    let calendar = Router::new()
        .route("/calendar/deliveries", get(calendar::deliveries))
        .with_permission(perm::CALENDAR_READ);

    Router::new()
        .merge(users)
        .merge(clients_read)
        .merge(clients_write)
        .merge(clients_delete)
        .merge(clients_import)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_update)
        .merge(orders_delete)
        .merge(orders_status)
        .merge(art_read)
        .merge(art_upload)
        .merge(art_review)
        .merge(documents_read)
        .merge(documents_write)
        .merge(inventory_read)
        .merge(inventory_manage)
        .merge(inventory_move)
        .merge(finance_read)
        .merge(finance_manage)
        .merge(goals_read)
        .merge(goals_manage)
        .merge(reports)
        .merge(dashboard)
        .merge(calendar)
}

/// Largest accepted request body. Uploads travel base64-encoded inside
/// JSON, so the raw file limit grows by a third plus room for the envelope.
pub fn request_body_limit(cfg: &config::AppConfig) -> usize {
    cfg.max_upload_bytes / 3 * 4 + 64 * 1024
}

fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        // Cookies only travel cross-origin with credentials, which forbids wildcards
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::DELETE,
            ])
            .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .allow_credentials(true)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Config validation rejects this combination; deny cross-origin calls if it slips through
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// The full application: health, auth, OpenAPI and `/api/v1`, with the
/// HTTP layers every request passes through.
pub fn build_router(state: AppState) -> Router {
    let cfg = state.config.clone();
    let auth_service = state.auth.clone();
    let body_limit = request_body_limit(&cfg);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/status", get(handlers::health::api_status))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&cfg))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth_service))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}
