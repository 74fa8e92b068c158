//! Cached dashboards and reports against the writes that must refresh them.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Duration, Utc};
use common::{decimal, id_of, TestApp};
use flagworks_api::entities::{product, Role};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};

const TTL_SECS: u64 = 60;

async fn dashboard(app: &TestApp, role: Role) -> Value {
    let body = app
        .expect(role, Method::GET, "/api/v1/dashboard", None, StatusCode::OK)
        .await;
    body["data"]["data"].clone()
}

async fn create_product(app: &TestApp, sku: &str, quantity: &str, min_quantity: &str) -> uuid::Uuid {
    let body = app
        .expect(
            Role::Manager,
            Method::POST,
            "/api/v1/inventory/products",
            Some(json!({
                "sku": sku,
                "name": format!("Haste {}", sku),
                "unit": "un",
                "quantity": quantity,
                "min_quantity": min_quantity
            })),
            StatusCode::CREATED,
        )
        .await;
    id_of(&body["data"])
}

#[tokio::test]
async fn dashboards_are_served_from_cache_between_writes() {
    let app = TestApp::with_cache_ttl(TTL_SECS).await;
    let product_id = create_product(&app, "MASTRO-3M", "50", "5").await;
    assert_eq!(dashboard(&app, Role::Production).await["low_stock_products"], 0);

    // A change that bypasses the services is invisible until the entry expires
    let stored = product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = stored.into();
    active.quantity = Set(dec!(1));
    active.update(&*app.state.db).await.unwrap();
    assert_eq!(dashboard(&app, Role::Production).await["low_stock_products"], 0);

    // A stock movement through the API drops the cached dashboards
    app.expect(
        Role::Production,
        Method::POST,
        &format!("/api/v1/inventory/products/{}/movements", product_id),
        Some(json!({ "kind": "out", "quantity": "1" })),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(dashboard(&app, Role::Production).await["low_stock_products"], 1);
}

#[tokio::test]
async fn saving_a_goal_refreshes_the_seller_dashboard() {
    let app = TestApp::with_cache_ttl(TTL_SECS).await;
    let today = Utc::now().date_naive();

    let before = dashboard(&app, Role::Seller).await;
    assert_eq!(decimal(&before["month_goal"]), dec!(0));

    app.expect(
        Role::Manager,
        Method::PUT,
        "/api/v1/goals",
        Some(json!({
            "seller_id": app.user_id(Role::Seller),
            "year": today.year(),
            "month": today.month(),
            "target_amount": "5000.00"
        })),
        StatusCode::OK,
    )
    .await;

    let after = dashboard(&app, Role::Seller).await;
    assert_eq!(decimal(&after["month_goal"]), dec!(5000));
}

#[tokio::test]
async fn status_changes_refresh_sales_figures() {
    let app = TestApp::with_cache_ttl(TTL_SECS).await;
    let client_id = app.create_client("Escola Estadual Centro").await;
    let order_id = id_of(&app.create_quote(client_id, None).await);
    let today = Utc::now().date_naive();
    let report_uri = format!("/api/v1/reports/sales?from={}&to={}", today, today);

    assert_eq!(decimal(&dashboard(&app, Role::Seller).await["month_sales"]), dec!(0));
    assert_eq!(decimal(&dashboard(&app, Role::Manager).await["month_revenue"]), dec!(0));
    let report = app
        .expect(Role::Manager, Method::GET, &report_uri, None, StatusCode::OK)
        .await;
    assert_eq!(report["data"]["order_count"], 0);

    assert_eq!(
        app.change_status(Role::Seller, order_id, "approved").await.status(),
        StatusCode::OK
    );

    assert_eq!(decimal(&dashboard(&app, Role::Seller).await["month_sales"]), dec!(280));
    assert_eq!(decimal(&dashboard(&app, Role::Manager).await["month_revenue"]), dec!(280));
    let report = app
        .expect(Role::Manager, Method::GET, &report_uri, None, StatusCode::OK)
        .await;
    assert_eq!(report["data"]["order_count"], 1);
    assert_eq!(decimal(&report["data"]["revenue"]), dec!(280));
}

#[tokio::test]
async fn finance_writes_refresh_dashboard_and_summary() {
    let app = TestApp::with_cache_ttl(TTL_SECS).await;
    let client_id = app.create_client("Associação Comercial").await;
    let today = Utc::now().date_naive();
    let summary_uri = format!(
        "/api/v1/finance/summary?from={}&to={}",
        today - Duration::days(5),
        today + Duration::days(5)
    );

    assert_eq!(decimal(&dashboard(&app, Role::Manager).await["receivables_open"]), dec!(0));
    let summary = app
        .expect(Role::Manager, Method::GET, &summary_uri, None, StatusCode::OK)
        .await;
    assert_eq!(decimal(&summary["data"]["receivables"]["paid"]), dec!(0));

    let receivable = app
        .expect(
            Role::Manager,
            Method::POST,
            "/api/v1/finance/receivables",
            Some(json!({
                "client_id": client_id,
                "description": "Bandeiras do desfile",
                "amount": "420.00",
                "due_date": today + Duration::days(2)
            })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(
        decimal(&dashboard(&app, Role::Manager).await["receivables_open"]),
        dec!(420)
    );

    app.expect(
        Role::Manager,
        Method::POST,
        &format!("/api/v1/finance/receivables/{}/pay", id_of(&receivable["data"])),
        None,
        StatusCode::OK,
    )
    .await;
    assert_eq!(decimal(&dashboard(&app, Role::Manager).await["receivables_open"]), dec!(0));
    let summary = app
        .expect(Role::Manager, Method::GET, &summary_uri, None, StatusCode::OK)
        .await;
    assert_eq!(decimal(&summary["data"]["receivables"]["paid"]), dec!(420));
}
