/*!
 * # Authentication and Authorization Module
 *
 * Staff log in with email and password and receive an opaque session token,
 * delivered as an `HttpOnly` cookie and echoed in the login body for API
 * clients that prefer `Authorization: Bearer`. Only the SHA-256 of the token
 * is persisted.
 *
 * Routers are protected with [`AuthRouterExt::with_permission`], which layers
 * session resolution plus a permission check taken from the role table in
 * [`rbac`].
 */

use crate::config::AppConfig;
use crate::entities::{session, user, Role};
use crate::ApiResponse;
use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub mod password;
pub mod permissions;
pub mod rbac;

pub use permissions::consts;

const SESSION_TOKEN_LEN: usize = 48;

/// The authenticated staff member behind a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub session_id: Uuid,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin()
            || self
                .permissions
                .iter()
                .any(|granted| rbac::check_permission(granted, permission))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Managers and admins
    pub fn is_supervisor(&self) -> bool {
        self.role.is_supervisor()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Session settings derived from the application config
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_ttl: ChronoDuration,
    pub secure_cookie: bool,
}

impl AuthConfig {
    pub fn new(cookie_name: impl Into<String>, session_ttl_secs: u64, secure_cookie: bool) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            session_ttl: ChronoDuration::seconds(session_ttl_secs as i64),
            secure_cookie,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.session_cookie_name.clone(),
            cfg.session_ttl_secs,
            cfg.session_cookie_secure,
        )
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: user::Model,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service for session handling
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify credentials and open a new session.
    ///
    /// Unknown email, wrong password and inactive account are reported the
    /// same way so the endpoint cannot be used to probe accounts.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = email.trim().to_lowercase();
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to look up user: {}", e);
                AuthError::DatabaseError(e.to_string())
            })?;

        let user = match found {
            Some(user) if password::verify_password(password, &user.password_hash) => user,
            _ => {
                warn!("Rejected login");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.active {
            warn!(user_id = %user.id, "Inactive user attempted to log in");
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.config.session_ttl;

        session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            token_hash: Set(hash_token(&token)),
            created_at: Set(now),
            expires_at: Set(expires_at),
            last_seen_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!("Failed to create session: {}", e);
            AuthError::DatabaseError(e.to_string())
        })?;

        info!(user_id = %user.id, role = user.role.as_ref(), "User logged in");

        Ok(LoginOutcome {
            user,
            token,
            expires_at,
        })
    }

    /// Resolve a session token into the user it belongs to.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let found = session::Entity::find()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let (session, user) = match found {
            Some((session, Some(user))) => (session, user),
            _ => return Err(AuthError::InvalidSession),
        };

        let now = Utc::now();
        if session.expires_at <= now {
            debug!(session_id = %session.id, "Deleting expired session");
            session::Entity::delete_by_id(session.id)
                .exec(&*self.db)
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
            return Err(AuthError::SessionExpired);
        }

        if !user.active {
            return Err(AuthError::InactiveUser);
        }

        let session_id = session.id;
        let mut active: session::ActiveModel = session.into();
        active.last_seen_at = Set(now);
        active
            .update(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(AuthUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            permissions: rbac::permissions_for(user.role),
            session_id,
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, session_id: Uuid) -> Result<(), AuthError> {
        session::Entity::delete_by_id(session_id)
            .exec(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        info!("Session closed");
        Ok(())
    }

    /// Session token from `Authorization: Bearer` or the session cookie.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Some(token.to_string());
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|raw| cookie_value(raw, &self.config.cookie_name))
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.config.cookie_name,
            token,
            self.config.session_ttl.num_seconds()
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_session_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
            self.config.cookie_name
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hex SHA-256 of a session token, the form stored in `sessions.token_hash`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Session has expired")]
    SessionExpired,

    #[error("User is inactive")]
    InactiveUser,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            Self::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_SESSION",
                "Invalid session".to_string(),
            ),
            Self::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_SESSION_EXPIRED",
                "Session has expired".to_string(),
            ),
            Self::InactiveUser => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INACTIVE_USER",
                "User account is inactive".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "AUTH_BAD_REQUEST", msg.clone()),
            Self::DatabaseError(msg) => {
                error!("Authentication database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if !user.has_permission(&required_permission) {
        debug!(
            user_id = %user.user_id,
            permission = %required_permission,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware: resolves the session and stores [`AuthUser`]
/// in the request extensions. Expects an `Arc<AuthService>` extension.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            error!("Authentication service not available");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = match auth_service.token_from_headers(request.headers()) {
        Some(token) => token,
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Profile of the logged-in user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

impl From<&AuthUser> for CurrentUser {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: CurrentUser,
    /// Same value as the session cookie, for `Authorization: Bearer` clients
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication routes
pub fn auth_routes() -> Router<Arc<AuthService>> {
    let protected = Router::new()
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
        .with_auth();

    Router::new()
        .route("/login", post(login_handler))
        .merge(protected)
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Log in and receive the session cookie
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    credentials
        .validate()
        .map_err(|e| AuthError::BadRequest(e.to_string()))?;

    let outcome = auth_service
        .login(&credentials.email, &credentials.password)
        .await?;

    let cookie = auth_service.session_cookie(&outcome.token);
    let user = &outcome.user;
    let body = LoginResponse {
        user: CurrentUser {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            permissions: rbac::permissions_for(user.role),
        },
        token: outcome.token,
        expires_at: outcome.expires_at,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(body)),
    )
        .into_response())
}

/// Close the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out; cookie cleared")),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    user: AuthUser,
) -> Result<Response, AuthError> {
    auth_service.logout(user.session_id).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, auth_service.clear_session_cookie())],
        Json(ApiResponse::<()>::message("Logged out")),
    )
        .into_response())
}

/// Current user with role and permissions
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Current user", body = CurrentUser)),
    tag = "auth"
)]
pub async fn me_handler(user: AuthUser) -> Json<ApiResponse<CurrentUser>> {
    Json(ApiResponse::success(CurrentUser::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        let db = sea_orm::DatabaseConnection::Disconnected;
        AuthService::new(AuthConfig::new("flagworks_session", 3600, true), Arc::new(db))
    }

    #[test]
    fn session_tokens_are_long_and_alphanumeric() {
        let token = generate_session_token();
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let svc = service();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; flagworks_session=from-cookie"),
        );
        assert_eq!(svc.token_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(svc.token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_or_foreign_cookies_are_ignored() {
        let svc = service();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("flagworks_session=; other=1"),
        );
        assert!(svc.token_from_headers(&headers).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let svc = service();
        let cookie = svc.session_cookie("tok");
        assert!(cookie.starts_with("flagworks_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));
        assert!(svc.clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn admin_passes_any_permission() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            name: "Root".into(),
            email: "root@example.com".into(),
            role: Role::Admin,
            permissions: vec![],
            session_id: Uuid::new_v4(),
        };
        assert!(user.has_permission(consts::USERS_MANAGE));
    }
}
