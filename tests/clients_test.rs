mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{id_of, response_json, TestApp};
use flagworks_api::entities::Role;
use serde_json::json;

async fn import_csv(app: &TestApp, role: Role, csv: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/clients/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token(role)))
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap();
    let response = app.send(request).await;
    let status = response.status();
    (status, response_json(response).await)
}

#[tokio::test]
async fn document_is_normalized_and_unique() {
    let app = TestApp::new().await;

    let created = app
        .expect(
            Role::Seller,
            Method::POST,
            "/api/v1/clients",
            Some(json!({ "name": "Maria Souza", "document": "123.456.789-09" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(created["data"]["document"], "12345678909");

    app.expect(
        Role::Seller,
        Method::POST,
        "/api/v1/clients",
        Some(json!({ "name": "Outra Maria", "document": "12345678909" })),
        StatusCode::CONFLICT,
    )
    .await;

    app.expect(
        Role::Seller,
        Method::POST,
        "/api/v1/clients",
        Some(json!({ "name": "Documento Curto", "document": "1234" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn list_searches_and_paginates() {
    let app = TestApp::new().await;
    for name in ["Bandeiras Norte", "Bandeiras Sul", "Escola Leste"] {
        app.create_client(name).await;
    }

    let page = app
        .expect(
            Role::ArtFinalist,
            Method::GET,
            "/api/v1/clients?search=Bandeiras&limit=1",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(page["data"]["total"], 2);
    assert_eq!(page["data"]["limit"], 1);
    assert_eq!(page["data"]["total_pages"], 2);
    assert_eq!(page["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn client_with_orders_is_deactivated_not_deleted() {
    let app = TestApp::new().await;
    let busy = app.create_client("Cliente com Pedido").await;
    let idle = app.create_client("Cliente sem Pedido").await;
    app.create_quote(busy, None).await;

    // Sellers cannot delete clients
    let forbidden = app
        .as_role(Role::Seller, Method::DELETE, &format!("/api/v1/clients/{}", idle), None)
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let soft = app
        .expect(
            Role::Manager,
            Method::DELETE,
            &format!("/api/v1/clients/{}", busy),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(soft["data"], "deactivated");

    let still_there = app
        .expect(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/clients/{}", busy),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(still_there["data"]["active"], false);

    // Inactive clients cannot receive new quotes
    app.expect(
        Role::Seller,
        Method::POST,
        "/api/v1/orders",
        Some(json!({
            "client_id": busy,
            "items": [{ "description": "Bandeira", "quantity": 1, "unit_price": "50" }]
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let hard = app
        .expect(
            Role::Manager,
            Method::DELETE,
            &format!("/api/v1/clients/{}", idle),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(hard["data"], "deleted");
    app.expect(
        Role::Manager,
        Method::GET,
        &format!("/api/v1/clients/{}", idle),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn csv_import_reports_rows_it_could_not_take() {
    let app = TestApp::new().await;
    let existing = app
        .expect(
            Role::Seller,
            Method::POST,
            "/api/v1/clients",
            Some(json!({ "name": "Já Cadastrado", "document": "11.222.333/0001-81" })),
            StatusCode::CREATED,
        )
        .await;
    let existing_id = id_of(&existing["data"]);

    let csv = "\
Name,Document,Email,City,State
Clube Náutico,987.654.321-00,contato@nautico.test,Florianópolis,SC
Já Cadastrado Outra Vez,11222333000181,,,
,55566677788,,,
Escola Rural,987.654.321-00,,,
Paróquia Central,,paroquia@central.test,Curitiba,PR
Email Ruim,,not-an-email,,
";
    let (status, body) = import_csv(&app, Role::Seller, csv).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let summary = &body["data"];
    assert_eq!(summary["imported"], 2);
    // Existing document and the repeated document inside the file
    assert_eq!(summary["skipped"], 2);
    let errors = summary["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["line"], 4);
    assert_eq!(errors[1]["line"], 7);

    let listing = app
        .expect(Role::Manager, Method::GET, "/api/v1/clients?limit=50", None, StatusCode::OK)
        .await;
    assert_eq!(listing["data"]["total"], 3);

    let untouched = app
        .expect(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/clients/{}", existing_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(untouched["data"]["name"], "Já Cadastrado");
}

#[tokio::test]
async fn csv_import_needs_a_name_column() {
    let app = TestApp::new().await;
    let (status, _) = import_csv(&app, Role::Manager, "email,phone\na@b.test,123\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = import_csv(&app, Role::ArtFinalist, "name\nX\n").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
