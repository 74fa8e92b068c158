use super::{
    art::FileDownload,
    orders::find_visible_order,
    storage::{ensure_content_type, FileStorage, DOCUMENT_CONTENT_TYPES},
    Actor,
};
use crate::{
    db::DbPool,
    entities::{
        client,
        document::{self, Entity as DocumentEntity, Model as DocumentModel},
        order,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder,
    Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Sellers see documents of their own orders plus those tied to no order.
fn visible_documents(select: Select<DocumentEntity>, actor: &Actor) -> Select<DocumentEntity> {
    if !actor.is_seller() {
        return select;
    }
    let own_orders = Query::select()
        .column(order::Column::Id)
        .from(order::Entity)
        .and_where(order::Column::SellerId.eq(actor.id))
        .to_owned();
    select.filter(
        Condition::any()
            .add(document::Column::OrderId.is_null())
            .add(document::Column::OrderId.in_subquery(own_orders)),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadDocumentRequest {
    pub order_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    /// invoice, contract, photo...
    #[validate(length(min = 1, max = 50, message = "Document kind is required"))]
    pub kind: String,
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    #[validate(length(min = 1, message = "File content is required"))]
    pub content_base64: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentListQuery {
    pub order_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct DocumentService {
    db_pool: Arc<DbPool>,
    storage: FileStorage,
}

impl DocumentService {
    pub fn new(db_pool: Arc<DbPool>, storage: FileStorage) -> Self {
        Self { db_pool, storage }
    }

    #[instrument(skip(self, request), fields(actor = %actor.id, kind = %request.kind))]
    pub async fn upload_document(
        &self,
        actor: &Actor,
        request: UploadDocumentRequest,
    ) -> Result<DocumentModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        if request.order_id.is_none() && request.client_id.is_none() {
            return Err(ServiceError::ValidationError(
                "A document must be linked to an order or a client".to_string(),
            ));
        }
        if let Some(order_id) = request.order_id {
            find_visible_order(db, actor, order_id).await?;
        }
        if let Some(client_id) = request.client_id {
            client::Entity::find_by_id(client_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;
        }

        ensure_content_type(&request.content_type, DOCUMENT_CONTENT_TYPES)?;
        let bytes = self.storage.decode_upload(&request.content_base64)?;
        let stored = self.storage.store(&request.file_name, &bytes).await?;

        let inserted = document::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(request.order_id),
            client_id: Set(request.client_id),
            kind: Set(request.kind.trim().to_lowercase()),
            file_name: Set(request.file_name.trim().to_string()),
            content_type: Set(request.content_type),
            stored_path: Set(stored.relative_path.clone()),
            size_bytes: Set(stored.size_bytes),
            uploaded_by: Set(actor.id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await;

        match inserted {
            Ok(model) => {
                info!(document_id = %model.id, size = model.size_bytes, "Document uploaded");
                Ok(model)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored.relative_path).await {
                    warn!(error = %cleanup, "Could not remove orphaned document file");
                }
                Err(e.into())
            }
        }
    }

    /// Documents of one order or one client; a filter is mandatory.
    pub async fn list_documents(
        &self,
        actor: &Actor,
        query: &DocumentListQuery,
    ) -> Result<Vec<DocumentModel>, ServiceError> {
        let db = &*self.db_pool;
        let mut select = DocumentEntity::find();
        match (query.order_id, query.client_id) {
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Filter by order_id or client_id".to_string(),
                ))
            }
            (order_id, client_id) => {
                if let Some(order_id) = order_id {
                    find_visible_order(db, actor, order_id).await?;
                    select = select.filter(document::Column::OrderId.eq(order_id));
                }
                if let Some(client_id) = client_id {
                    select = select.filter(document::Column::ClientId.eq(client_id));
                }
            }
        }
        Ok(visible_documents(select, actor)
            .order_by_desc(document::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn download_document(
        &self,
        actor: &Actor,
        document_id: Uuid,
    ) -> Result<FileDownload, ServiceError> {
        let document = self.find_document(actor, document_id).await?;
        let bytes = self.storage.read(&document.stored_path).await?;
        Ok(FileDownload {
            file_name: document.file_name,
            content_type: document.content_type,
            bytes,
        })
    }

    /// The uploader or a supervisor may delete.
    #[instrument(skip(self), fields(actor = %actor.id, document_id = %document_id))]
    pub async fn delete_document(&self, actor: &Actor, document_id: Uuid) -> Result<(), ServiceError> {
        let document = self.find_document(actor, document_id).await?;
        if document.uploaded_by != actor.id && !actor.is_supervisor() {
            return Err(ServiceError::Forbidden(
                "Only the uploader or a manager can delete this document".to_string(),
            ));
        }

        DocumentEntity::delete_by_id(document_id)
            .exec(&*self.db_pool)
            .await?;
        self.storage.delete(&document.stored_path).await?;
        info!(document_id = %document_id, "Document deleted");
        Ok(())
    }

    async fn find_document(&self, actor: &Actor, document_id: Uuid) -> Result<DocumentModel, ServiceError> {
        let db = &*self.db_pool;
        let document = DocumentEntity::find_by_id(document_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Document {} not found", document_id)))?;
        if let Some(order_id) = document.order_id {
            match find_visible_order(db, actor, order_id).await {
                Err(ServiceError::NotFound(_)) => {
                    return Err(ServiceError::NotFound(format!(
                        "Document {} not found",
                        document_id
                    )))
                }
                other => {
                    other?;
                }
            }
        }
        Ok(document)
    }
}
