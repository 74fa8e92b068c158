//! Aggregates over orders: sales reports, goals, dashboards and the
//! delivery calendar, plus order documents.

mod common;

use axum::http::{header, Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, Duration, Utc};
use common::{decimal, id_of, response_bytes, response_json, TestApp, PASSWORD};
use flagworks_api::entities::Role;
use rust_decimal_macros::dec;
use serde_json::json;

/// One approved sale of 280.00 and one open quote for the seeded seller.
async fn seed_sales(app: &TestApp) -> (uuid::Uuid, uuid::Uuid) {
    let client_id = app.create_client("Federação Paranaense").await;
    let sold = id_of(&app.create_quote(client_id, None).await);
    assert_eq!(app.change_status(Role::Seller, sold, "approved").await.status(), StatusCode::OK);
    app.create_quote(client_id, None).await;
    (client_id, sold)
}

#[tokio::test]
async fn sales_report_counts_orders_past_the_quote_stage() {
    let app = TestApp::new().await;
    let (client_id, _) = seed_sales(&app).await;
    let today = Utc::now().date_naive();

    let report = app
        .expect(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reports/sales?from={}&to={}", today, today),
            None,
            StatusCode::OK,
        )
        .await;
    let data = &report["data"];
    assert_eq!(data["order_count"], 1);
    assert_eq!(decimal(&data["revenue"]), dec!(280));
    assert_eq!(decimal(&data["average_ticket"]), dec!(280));
    assert_eq!(data["by_seller"][0]["seller_id"], app.user_id(Role::Seller).to_string());

    let top = app
        .expect(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reports/top-clients?from={}&to={}&limit=5", today, today),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(top["data"][0]["client_id"], client_id.to_string());
    assert_eq!(decimal(&top["data"][0]["revenue"]), dec!(280));

    let earlier = today - Duration::days(40);
    let empty = app
        .expect(
            Role::Admin,
            Method::GET,
            &format!("/api/v1/reports/sales?from={}&to={}", earlier, earlier),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(empty["data"]["order_count"], 0);
    assert_eq!(decimal(&empty["data"]["average_ticket"]), dec!(0));
}

#[tokio::test]
async fn sales_csv_is_a_download() {
    let app = TestApp::new().await;
    seed_sales(&app).await;
    let today = Utc::now().date_naive();

    let response = app
        .as_role(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reports/sales.csv?from={}&to={}", today, today),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains(&format!("sales-{}-{}.csv", today, today)));

    let text = String::from_utf8(response_bytes(response).await).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("order_number,created_at,client"));
    assert_eq!(lines.count(), 1);
}

#[tokio::test]
async fn goal_progress_tracks_monthly_sales() {
    let app = TestApp::new().await;
    seed_sales(&app).await;
    let today = Utc::now().date_naive();
    let seller_id = app.user_id(Role::Seller);

    app.expect(
        Role::Manager,
        Method::PUT,
        "/api/v1/goals",
        Some(json!({
            "seller_id": seller_id,
            "year": today.year(),
            "month": today.month(),
            "target_amount": "1000.00"
        })),
        StatusCode::OK,
    )
    .await;
    // Upsert replaces the target for the same month
    app.expect(
        Role::Manager,
        Method::PUT,
        "/api/v1/goals",
        Some(json!({
            "seller_id": seller_id,
            "year": today.year(),
            "month": today.month(),
            "target_amount": "560.00"
        })),
        StatusCode::OK,
    )
    .await;

    let goals = app
        .expect(
            Role::Seller,
            Method::GET,
            &format!("/api/v1/goals?year={}", today.year()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(goals["data"].as_array().unwrap().len(), 1);

    let progress = app
        .expect(
            Role::Seller,
            Method::GET,
            &format!("/api/v1/goals/progress?year={}&month={}", today.year(), today.month()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(decimal(&progress["data"]["target"]), dec!(560));
    assert_eq!(decimal(&progress["data"]["achieved"]), dec!(280));
    assert_eq!(decimal(&progress["data"]["percentage"]), dec!(50));

    // Sellers cannot peek at someone else's progress
    app.expect(
        Role::Seller,
        Method::GET,
        &format!(
            "/api/v1/goals/progress?year={}&month={}&seller_id={}",
            today.year(),
            today.month(),
            app.user_id(Role::Manager)
        ),
        None,
        StatusCode::FORBIDDEN,
    )
    .await;

    // Goals are set for sellers only
    app.expect(
        Role::Manager,
        Method::PUT,
        "/api/v1/goals",
        Some(json!({
            "seller_id": app.user_id(Role::Production),
            "year": today.year(),
            "month": today.month(),
            "target_amount": "100.00"
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn dashboard_shape_depends_on_role() {
    let app = TestApp::new().await;
    seed_sales(&app).await;

    let seller = app
        .expect(Role::Seller, Method::GET, "/api/v1/dashboard", None, StatusCode::OK)
        .await;
    assert_eq!(seller["data"]["kind"], "seller");
    assert_eq!(decimal(&seller["data"]["data"]["month_sales"]), dec!(280));
    assert_eq!(seller["data"]["data"]["open_quotes"], 1);

    let manager = app
        .expect(Role::Manager, Method::GET, "/api/v1/dashboard", None, StatusCode::OK)
        .await;
    assert_eq!(manager["data"]["kind"], "manager");
    assert_eq!(decimal(&manager["data"]["data"]["month_revenue"]), dec!(280));

    let admin = app
        .expect(Role::Admin, Method::GET, "/api/v1/dashboard", None, StatusCode::OK)
        .await;
    assert_eq!(admin["data"]["kind"], "manager");

    let art = app
        .expect(Role::ArtFinalist, Method::GET, "/api/v1/dashboard", None, StatusCode::OK)
        .await;
    assert_eq!(art["data"]["kind"], "art_finalist");
    assert!(art["data"]["data"]["awaiting_art"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn calendar_groups_deliveries_by_day() {
    let app = TestApp::new().await;
    let client_id = app.create_client("Time de Várzea").await;
    let today = Utc::now().date_naive();
    let soon = today + Duration::days(3);
    let later = today + Duration::days(10);

    app.create_quote(client_id, Some(&soon.to_string())).await;
    app.create_quote(client_id, Some(&soon.to_string())).await;
    let dropped = id_of(&app.create_quote(client_id, Some(&later.to_string())).await);
    assert_eq!(
        app.change_status(Role::Seller, dropped, "cancelled").await.status(),
        StatusCode::OK
    );

    let calendar = app
        .expect(
            Role::Production,
            Method::GET,
            &format!("/api/v1/calendar/deliveries?from={}&to={}", today, later),
            None,
            StatusCode::OK,
        )
        .await;
    let days = calendar["data"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["date"], soon.to_string());
    assert_eq!(days[0]["orders"].as_array().unwrap().len(), 2);
    assert_eq!(days[0]["orders"][0]["client_name"], "Time de Várzea");
    assert_eq!(days[0]["orders"][0]["late"], false);

    let too_wide = today + Duration::days(92);
    app.expect(
        Role::Production,
        Method::GET,
        &format!("/api/v1/calendar/deliveries?from={}&to={}", today, too_wide),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn documents_attach_to_orders() {
    let app = TestApp::new().await;
    let client_id = app.create_client("Igreja Matriz").await;
    let order_id = id_of(&app.create_quote(client_id, None).await);
    let content = b"pedido assinado";

    let uploaded = app
        .expect(
            Role::Seller,
            Method::POST,
            "/api/v1/documents",
            Some(json!({
                "order_id": order_id,
                "kind": "purchase_order",
                "file_name": "pedido.pdf",
                "content_type": "application/pdf",
                "content_base64": STANDARD.encode(content)
            })),
            StatusCode::CREATED,
        )
        .await;
    let document_id = id_of(&uploaded["data"]);
    assert_eq!(uploaded["data"]["size_bytes"], content.len());

    let listed = app
        .expect(
            Role::Production,
            Method::GET,
            &format!("/api/v1/documents?order_id={}", order_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let download = app
        .as_role(
            Role::Production,
            Method::GET,
            &format!("/api/v1/documents/{}", document_id),
            None,
        )
        .await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(response_bytes(download).await, content);

    // Only the uploader or a manager may delete
    let foreign = app
        .as_role(
            Role::ArtFinalist,
            Method::DELETE,
            &format!("/api/v1/documents/{}", document_id),
            None,
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let deleted = app
        .as_role(Role::Seller, Method::DELETE, &format!("/api/v1/documents/{}", document_id), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    app.expect(
        Role::Seller,
        Method::GET,
        "/api/v1/documents",
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn client_documents_hide_other_sellers_orders() {
    let app = TestApp::new().await;
    let client_id = app.create_client("Clube Náutico").await;

    app.expect(
        Role::Admin,
        Method::POST,
        "/api/v1/users",
        Some(json!({
            "name": "Outra Vendedora",
            "email": "outra@flagworks.test",
            "password": PASSWORD,
            "role": "seller"
        })),
        StatusCode::CREATED,
    )
    .await;
    let other = app.login("outra@flagworks.test", PASSWORD).await;

    let foreign_order = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "client_id": client_id,
                "items": [{ "description": "Galhardete", "quantity": 10, "unit_price": "12.00" }]
            })),
            Some(&other),
        )
        .await;
    assert_eq!(foreign_order.status(), StatusCode::CREATED);
    let foreign_order_id = id_of(&response_json(foreign_order).await["data"]);

    let foreign = app
        .request(
            Method::POST,
            "/api/v1/documents",
            Some(json!({
                "order_id": foreign_order_id,
                "client_id": client_id,
                "kind": "contract",
                "file_name": "contrato.pdf",
                "content_type": "application/pdf",
                "content_base64": STANDARD.encode(b"contrato assinado")
            })),
            Some(&other),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::CREATED);
    let foreign_id = id_of(&response_json(foreign).await["data"]);

    app.expect(
        Role::Seller,
        Method::POST,
        "/api/v1/documents",
        Some(json!({
            "client_id": client_id,
            "kind": "photo",
            "file_name": "fachada.png",
            "content_type": "image/png",
            "content_base64": STANDARD.encode(b"\x89PNG\r\n\x1a\nfachada")
        })),
        StatusCode::CREATED,
    )
    .await;

    let uri = format!("/api/v1/documents?client_id={}", client_id);
    let seen = app
        .expect(Role::Seller, Method::GET, &uri, None, StatusCode::OK)
        .await;
    let seen = seen["data"].as_array().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["kind"], "photo");

    let all = app
        .expect(Role::Manager, Method::GET, &uri, None, StatusCode::OK)
        .await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    app.expect(
        Role::Seller,
        Method::GET,
        &format!("/api/v1/documents/{}", foreign_id),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}
