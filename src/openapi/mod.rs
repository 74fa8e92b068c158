use axum::response::Json;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flagworks API",
        version = "0.1.0",
        description = r#"
# Flagworks

Back office for a flag workshop: clients, service orders (OS) from quote to
delivery, art proof approval, inventory, receivables and payables, sales goals,
reports and per-role dashboards.

## Authentication

`POST /auth/login` sets an `HttpOnly` session cookie and also returns the token,
which API clients may send as `Authorization: Bearer <token>`.

## Envelope

Every JSON response is wrapped as
`{success, data, message, errors, meta: {request_id, timestamp}}`.
Errors use `{error, message, request_id, timestamp}`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SessionAuth),
    tags(
        (name = "auth", description = "Login and session"),
        (name = "users", description = "Staff accounts"),
        (name = "clients", description = "Client records and CSV import"),
        (name = "orders", description = "Service orders and the status workflow"),
        (name = "art", description = "Art proofs and customer review"),
        (name = "documents", description = "Files attached to orders and clients"),
        (name = "inventory", description = "Products and stock movements"),
        (name = "finance", description = "Receivables, payables and cash flow"),
        (name = "goals", description = "Monthly sales goals"),
        (name = "reports", description = "Sales reports and exports"),
        (name = "dashboard", description = "Per-role landing data"),
        (name = "calendar", description = "Delivery calendar"),
        (name = "health", description = "Liveness and build info")
    ),
    paths(
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,
        crate::handlers::health::health_check,
        crate::handlers::health::api_status,

        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::reset_password,

        crate::handlers::clients::list_clients,
        crate::handlers::clients::create_client,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,
        crate::handlers::clients::import_clients,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::change_status,
        crate::handlers::orders::order_history,
        crate::handlers::orders::claim_art,
        crate::handlers::orders::release_art,
        crate::handlers::orders::submit_art,

        crate::handlers::art::list_art_versions,
        crate::handlers::art::upload_art_version,
        crate::handlers::art::review_art,
        crate::handlers::art::download_art_version,

        crate::handlers::documents::list_documents,
        crate::handlers::documents::upload_document,
        crate::handlers::documents::download_document,
        crate::handlers::documents::delete_document,

        crate::handlers::inventory::list_products,
        crate::handlers::inventory::create_product,
        crate::handlers::inventory::get_product,
        crate::handlers::inventory::update_product,
        crate::handlers::inventory::list_movements,
        crate::handlers::inventory::record_movement,

        crate::handlers::finance::list_receivables,
        crate::handlers::finance::create_receivable,
        crate::handlers::finance::pay_receivable,
        crate::handlers::finance::cancel_receivable,
        crate::handlers::finance::list_payables,
        crate::handlers::finance::create_payable,
        crate::handlers::finance::pay_payable,
        crate::handlers::finance::cancel_payable,
        crate::handlers::finance::finance_summary,
        crate::handlers::finance::cash_flow,

        crate::handlers::goals::list_goals,
        crate::handlers::goals::upsert_goal,
        crate::handlers::goals::goal_progress,

        crate::handlers::reports::sales_report,
        crate::handlers::reports::top_clients,
        crate::handlers::reports::sales_csv,

        crate::handlers::dashboard::dashboard,
        crate::handlers::calendar::deliveries,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::auth::LoginRequest,
            crate::auth::LoginResponse,
            crate::auth::CurrentUser,
            crate::entities::OrderStatus,
            crate::entities::Role,
        )
    )
)]
pub struct ApiDocV1;

/// Registers the session cookie and bearer token schemes.
struct SessionAuth;

impl Modify for SessionAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("flagworks_session"))),
        );
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// `GET /api-docs/openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_workflow_routes() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Flagworks API"));
        assert!(json.contains("/api/v1/orders/{id}/status"));
        assert!(json.contains("/api/v1/calendar/deliveries"));
        assert!(json.contains("session_cookie"));
    }
}
