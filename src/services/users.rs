use crate::{
    auth::password::{hash_password, MIN_PASSWORD_LEN},
    db::DbPool,
    entities::{
        session,
        user::{self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel},
        Role,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 120, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "Password must have at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Staff account administration.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let email = request.email.trim().to_lowercase();

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let now = Utc::now();
        let model = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create user");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %model.id, role = model.role.as_ref(), "User created");
        Ok(model.into())
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = UserEntity::find()
            .order_by_asc(user::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        Ok(self.find_user(user_id).await?.into())
    }

    /// Deactivating a user also ends every session they hold.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let existing = self.find_user(user_id).await?;
        let deactivating = existing.active && request.active == Some(false);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for user update");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: UserActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if deactivating {
            let removed = session::Entity::delete_many()
                .filter(session::Column::UserId.eq(user_id))
                .exec(&txn)
                .await?;
            info!(user_id = %user_id, sessions = removed.rows_affected, "User deactivated");
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit user update");
            ServiceError::DatabaseError(e)
        })?;

        Ok(updated.into())
    }

    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        request: ResetPasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::ValidationError(format!(
                "Password must have at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let existing = self.find_user(user_id).await?;
        let mut active: UserActiveModel = existing.into();
        active.password_hash = Set(hash_password(&request.password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db_pool).await?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_validation() {
        let mut request = CreateUserRequest {
            name: "Ana".into(),
            email: "ana@flagworks.test".into(),
            password: "long-enough".into(),
            role: Role::Seller,
        };
        assert!(request.validate().is_ok());

        request.password = "short".into();
        assert!(request.validate().is_err());

        request.password = "long-enough".into();
        request.email = "not-an-email".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn response_hides_password_hash() {
        let now = Utc::now();
        let model = UserModel {
            id: Uuid::new_v4(),
            name: "Bia".into(),
            email: "bia@flagworks.test".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Production,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(model)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "production");
    }
}
