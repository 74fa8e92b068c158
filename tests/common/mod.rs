#![allow(dead_code)]

use std::{collections::HashMap, str::FromStr};

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flagworks_api::{
    config::AppConfig,
    db,
    entities::Role,
    services::users::CreateUserRequest,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

pub const ALL_ROLES: [Role; 5] = [
    Role::Admin,
    Role::Manager,
    Role::Seller,
    Role::ArtFinalist,
    Role::Production,
];

/// Application over an in-memory SQLite database with one logged-in
/// account per role.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    tokens: HashMap<Role, String>,
    user_ids: HashMap<Role, Uuid>,
    _upload_dir: TempDir,
}

impl TestApp {
    /// Dashboard and report caching disabled, so every read hits the database.
    pub async fn new() -> Self {
        Self::with_cache_ttl(0).await
    }

    /// Caches dashboards and reports for `ttl_secs`, as a deployed server does.
    pub async fn with_cache_ttl(ttl_secs: u64) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.upload_dir = upload_dir.path().to_string_lossy().into_owned();
        cfg.max_upload_bytes = 64 * 1024;
        cfg.dashboard_cache_ttl_secs = ttl_secs;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(std::sync::Arc::new(pool), cfg);
        let router = flagworks_api::build_router(state.clone());

        let mut app = Self {
            router,
            state,
            tokens: HashMap::new(),
            user_ids: HashMap::new(),
            _upload_dir: upload_dir,
        };

        for role in ALL_ROLES {
            let email = format!("{}@flagworks.test", role.as_ref());
            let user = app
                .state
                .services
                .users
                .create_user(CreateUserRequest {
                    name: format!("Test {}", role.as_ref()),
                    email: email.clone(),
                    password: PASSWORD.to_string(),
                    role,
                })
                .await
                .expect("seed user");
            let token = app.login(&email, PASSWORD).await;
            app.user_ids.insert(role, user.id);
            app.tokens.insert(role, token);
        }

        app
    }

    /// Logs in through the HTTP endpoint and returns the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");
        let body = response_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub fn token(&self, role: Role) -> &str {
        &self.tokens[&role]
    }

    pub fn user_id(&self, role: Role) -> Uuid {
        self.user_ids[&role]
    }

    /// Send a JSON request with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated request as the seeded user of `role`.
    pub async fn as_role(
        &self,
        role: Role,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token(role))).await
    }

    /// Like [`as_role`](Self::as_role) but asserts the status and returns the JSON body.
    pub async fn expect(
        &self,
        role: Role,
        method: Method,
        uri: &str,
        body: Option<Value>,
        status: StatusCode,
    ) -> Value {
        let response = self.as_role(role, method.clone(), uri, body).await;
        let actual = response.status();
        let json = response_json(response).await;
        assert_eq!(actual, status, "{} {} as {}: {}", method, uri, role.as_ref(), json);
        json
    }

    pub async fn create_client(&self, name: &str) -> Uuid {
        let body = self
            .expect(
                Role::Seller,
                Method::POST,
                "/api/v1/clients",
                Some(json!({ "name": name, "city": "Curitiba", "state": "PR" })),
                StatusCode::CREATED,
            )
            .await;
        id_of(&body["data"])
    }

    /// Quote owned by the seeded seller: 2 x 150.00 less a 20.00 discount.
    pub async fn create_quote(&self, client_id: Uuid, delivery_date: Option<&str>) -> Value {
        let body = self
            .expect(
                Role::Seller,
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "client_id": client_id,
                    "items": [{
                        "description": "Bandeira 90x130 cetim",
                        "size": "90x130",
                        "material": "cetim",
                        "quantity": 2,
                        "unit_price": "150.00"
                    }],
                    "discount": "20.00",
                    "delivery_date": delivery_date,
                })),
                StatusCode::CREATED,
            )
            .await;
        body["data"].clone()
    }

    pub async fn change_status(&self, role: Role, order_id: Uuid, to: &str) -> Response {
        self.as_role(
            role,
            Method::POST,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": to })),
        )
        .await
    }

    /// Walks a fresh quote to `art_review` with one pending proof.
    pub async fn order_in_art_review(&self, client_id: Uuid) -> Uuid {
        let order = self.create_quote(client_id, None).await;
        let order_id = id_of(&order);
        for to in ["approved", "awaiting_art"] {
            assert_eq!(self.change_status(Role::Seller, order_id, to).await.status(), StatusCode::OK);
        }
        self.expect(
            Role::ArtFinalist,
            Method::POST,
            &format!("/api/v1/orders/{}/claim", order_id),
            None,
            StatusCode::OK,
        )
        .await;
        self.expect(
            Role::ArtFinalist,
            Method::POST,
            &format!("/api/v1/orders/{}/art", order_id),
            Some(png_upload("proof-v1.png")),
            StatusCode::CREATED,
        )
        .await;
        self.expect(
            Role::ArtFinalist,
            Method::POST,
            &format!("/api/v1/orders/{}/submit-art", order_id),
            None,
            StatusCode::OK,
        )
        .await;
        order_id
    }
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("no id in {}", value))
}

/// Decimals are serialized as strings.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nflagworks-proof";

pub fn png_upload(file_name: &str) -> Value {
    json!({
        "file_name": file_name,
        "content_type": "image/png",
        "content_base64": STANDARD.encode(PNG_BYTES),
    })
}
