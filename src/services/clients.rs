use crate::{
    db::DbPool,
    entities::{
        client::{self, ActiveModel as ClientActiveModel, Entity as ClientEntity, Model as ClientModel},
        order,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    /// CPF or CNPJ; punctuation is ignored
    pub document: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[validate(length(max = 2, message = "State must be a two-letter code"))]
    pub state: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub document: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[validate(length(max = 2, message = "State must be a two-letter code"))]
    pub state: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, document, email or city
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The client had orders and was only deactivated
    Deactivated,
    Deleted,
}

/// Strip punctuation from a CPF/CNPJ and check its length.
///
/// Blank input means "no document".
pub fn normalize_document(raw: &str) -> Result<Option<String>, ServiceError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    if raw
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' ')))
    {
        return Err(ServiceError::ValidationError(format!(
            "Document '{}' contains invalid characters",
            raw
        )));
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        11 | 14 => Ok(Some(digits)),
        n => Err(ServiceError::ValidationError(format!(
            "Document must have 11 (CPF) or 14 (CNPJ) digits, got {}",
            n
        ))),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
    max_page_size: u64,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>, max_page_size: u64) -> Self {
        Self {
            db_pool,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_client(&self, request: CreateClientRequest) -> Result<ClientModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let document = match request.document.as_deref() {
            Some(raw) => normalize_document(raw)?,
            None => None,
        };
        if let Some(doc) = &document {
            ensure_document_free(db, doc, None).await?;
        }

        let now = Utc::now();
        let model = ClientActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            document: Set(document),
            email: Set(blank_to_none(request.email).map(|e| e.to_lowercase())),
            phone: Set(blank_to_none(request.phone)),
            address: Set(blank_to_none(request.address)),
            city: Set(blank_to_none(request.city)),
            state: Set(blank_to_none(request.state).map(|s| s.to_uppercase())),
            notes: Set(blank_to_none(request.notes)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert client");
            ServiceError::DatabaseError(e)
        })?;

        info!(client_id = %model.id, "Client created");
        Ok(model)
    }

    pub async fn get_client(&self, client_id: Uuid) -> Result<ClientModel, ServiceError> {
        ClientEntity::find_by_id(client_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))
    }

    pub async fn list_clients(
        &self,
        query: &ClientListQuery,
        default_limit: u64,
    ) -> Result<(Vec<ClientModel>, u64), ServiceError> {
        let (page, limit) = super::page_bounds(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(default_limit),
            self.max_page_size,
        );

        let mut select = ClientEntity::find();
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let digits: String = term.chars().filter(char::is_ascii_digit).collect();
            let mut condition = Condition::any()
                .add(client::Column::Name.contains(term))
                .add(client::Column::Email.contains(term.to_lowercase()))
                .add(client::Column::City.contains(term));
            if !digits.is_empty() {
                condition = condition.add(client::Column::Document.contains(digits));
            }
            select = select.filter(condition);
        }
        if let Some(active) = query.active {
            select = select.filter(client::Column::Active.eq(active));
        }

        let paginator = select
            .order_by_asc(client::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        request: UpdateClientRequest,
    ) -> Result<ClientModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let existing = self.get_client(client_id).await?;
        let mut active: ClientActiveModel = existing.into();

        if let Some(raw) = request.document.as_deref() {
            let document = normalize_document(raw)?;
            if let Some(doc) = &document {
                ensure_document_free(db, doc, Some(client_id)).await?;
            }
            active.document = Set(document);
        }
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if request.email.is_some() {
            active.email = Set(blank_to_none(request.email).map(|e| e.to_lowercase()));
        }
        if request.phone.is_some() {
            active.phone = Set(blank_to_none(request.phone));
        }
        if request.address.is_some() {
            active.address = Set(blank_to_none(request.address));
        }
        if request.city.is_some() {
            active.city = Set(blank_to_none(request.city));
        }
        if request.state.is_some() {
            active.state = Set(blank_to_none(request.state).map(|s| s.to_uppercase()));
        }
        if request.notes.is_some() {
            active.notes = Set(blank_to_none(request.notes));
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Clients referenced by orders are deactivated instead of removed.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<DeleteOutcome, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get_client(client_id).await?;

        let order_count = order::Entity::find()
            .filter(order::Column::ClientId.eq(client_id))
            .count(db)
            .await?;

        if order_count > 0 {
            let mut active: ClientActiveModel = existing.into();
            active.active = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
            info!(client_id = %client_id, orders = order_count, "Client deactivated");
            Ok(DeleteOutcome::Deactivated)
        } else {
            ClientEntity::delete_by_id(client_id).exec(db).await?;
            info!(client_id = %client_id, "Client deleted");
            Ok(DeleteOutcome::Deleted)
        }
    }
}

pub(crate) async fn ensure_document_free<C: ConnectionTrait>(
    db: &C,
    document: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut select = ClientEntity::find().filter(client::Column::Document.eq(document));
    if let Some(id) = except {
        select = select.filter(client::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(ServiceError::Conflict(format!(
            "A client with document {} already exists",
            document
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("123.456.789-09", Some("12345678909"))]
    #[case("12.345.678/0001-95", Some("12345678000195"))]
    #[case("12345678909", Some("12345678909"))]
    #[case("   ", None)]
    #[case("", None)]
    fn accepts_valid_documents(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            normalize_document(raw).unwrap(),
            expected.map(str::to_string)
        );
    }

    #[rstest]
    #[case("1234")]
    #[case("123.456.789-0")]
    #[case("123456789012")]
    #[case("ABC.456.789-09")]
    fn rejects_invalid_documents(#[case] raw: &str) {
        assert_matches!(normalize_document(raw), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn create_request_requires_name_and_valid_email() {
        let mut request = CreateClientRequest {
            name: "Prefeitura de Olinda".into(),
            email: Some("compras@olinda.test".into()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());

        request.email = Some("compras".into());
        assert!(request.validate().is_err());

        request.email = None;
        request.name = String::new();
        assert!(request.validate().is_err());
    }
}
