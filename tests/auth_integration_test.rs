mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{response_json, TestApp, PASSWORD};
use flagworks_api::entities::Role;
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_session_cookie() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "seller@flagworks.test", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("flagworks_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "seller");
    assert_eq!(body["data"]["token"].as_str().unwrap().len(), 48);
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;

    for (email, password) in [
        ("seller@flagworks.test", "not-the-password"),
        ("nobody@flagworks.test", PASSWORD),
    ] {
        let response = app
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn session_cookie_authenticates_requests() {
    let app = TestApp::new().await;
    let token = app.token(Role::Manager).to_string();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header::COOKIE, format!("flagworks_session={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], "manager@flagworks.test");
    assert_eq!(body["data"]["role"], "manager");
    assert!(body["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p == "finance:*"));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = TestApp::new().await;
    let token = app.login("production@flagworks.test", PASSWORD).await;

    let me = app.request(Method::GET, "/auth/me", None, Some(&token)).await;
    assert_eq!(me.status(), StatusCode::OK);

    let logout = app.request(Method::POST, "/auth/logout", None, Some(&token)).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let cleared = logout
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    let after = app.request(Method::GET, "/auth/me", None, Some(&token)).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);

    // Other sessions of the same role are untouched
    let seeded = app.as_role(Role::Production, Method::GET, "/auth/me", None).await;
    assert_eq!(seeded.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(Method::GET, "/api/v1/orders", None, Some("not-a-session"))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_user_loses_access() {
    let app = TestApp::new().await;
    let seller_id = app.user_id(Role::Seller);

    app.expect(
        Role::Admin,
        Method::PUT,
        &format!("/api/v1/users/{}", seller_id),
        Some(json!({ "active": false })),
        StatusCode::OK,
    )
    .await;

    let response = app.as_role(Role::Seller, Method::GET, "/api/v1/orders", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let login = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "seller@flagworks.test", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(login.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_deactivate_own_account() {
    let app = TestApp::new().await;
    let admin_id = app.user_id(Role::Admin);

    app.expect(
        Role::Admin,
        Method::PUT,
        &format!("/api/v1/users/{}", admin_id),
        Some(json!({ "active": false })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[rstest]
#[case(Role::Admin, "/api/v1/users", StatusCode::OK)]
#[case(Role::Manager, "/api/v1/users", StatusCode::FORBIDDEN)]
#[case(Role::Manager, "/api/v1/finance/receivables", StatusCode::OK)]
#[case(Role::Seller, "/api/v1/finance/receivables", StatusCode::FORBIDDEN)]
#[case(Role::Seller, "/api/v1/reports/sales?from=2026-01-01&to=2026-01-31", StatusCode::FORBIDDEN)]
#[case(Role::Seller, "/api/v1/clients", StatusCode::OK)]
#[case(Role::ArtFinalist, "/api/v1/inventory/products", StatusCode::FORBIDDEN)]
#[case(Role::Production, "/api/v1/inventory/products", StatusCode::OK)]
#[case(Role::Production, "/api/v1/goals?year=2026", StatusCode::FORBIDDEN)]
#[case(Role::ArtFinalist, "/api/v1/calendar/deliveries?from=2026-01-01&to=2026-01-31", StatusCode::OK)]
#[tokio::test]
async fn route_permissions_follow_roles(
    #[case] role: Role,
    #[case] uri: &str,
    #[case] expected: StatusCode,
) {
    let app = TestApp::new().await;
    let response = app.as_role(role, Method::GET, uri, None).await;
    assert_eq!(response.status(), expected, "{} {}", role.as_ref(), uri);
}

#[tokio::test]
async fn errors_carry_the_request_id() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/orders/{}", uuid::Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token(Role::Admin)))
        .header("x-request-id", "trace-me-123")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me-123")
    );

    let body = response_json(response).await;
    assert_eq!(body["request_id"], "trace-me-123");
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    let body = response_json(health).await;
    assert_eq!(body["data"]["database"]["status"], "up");

    let docs = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(docs.status(), StatusCode::OK);
    let spec = response_json(docs).await;
    assert!(spec["paths"]["/api/v1/orders/{id}/status"].is_object());
}
