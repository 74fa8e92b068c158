use super::{
    order_workflow::OrderWorkflowService,
    orders::find_visible_order,
    storage::{ensure_content_type, FileStorage, ART_CONTENT_TYPES},
    Actor,
};
use crate::{
    db::DbPool,
    entities::{
        art_version::{self, ArtStatus, Entity as ArtVersionEntity, Model as ArtVersionModel},
        OrderStatus, Role,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadFileRequest {
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    /// File bytes, standard base64
    #[validate(length(min = 1, message = "File content is required"))]
    pub content_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviewArtRequest {
    pub decision: ReviewDecision,
    /// Required when rejecting
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
    pub version: Option<i32>,
}

/// Raw file plus the metadata needed to serve it.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ArtService {
    db_pool: Arc<DbPool>,
    storage: FileStorage,
    workflow: OrderWorkflowService,
}

impl ArtService {
    pub fn new(db_pool: Arc<DbPool>, storage: FileStorage, workflow: OrderWorkflowService) -> Self {
        Self {
            db_pool,
            storage,
            workflow,
        }
    }

    /// Store a new proof for an order whose art is in progress. Only the
    /// claimant art finalist or a supervisor may upload.
    #[instrument(skip(self, request), fields(actor = %actor.id, order_id = %order_id, file = %request.file_name))]
    pub async fn upload_art_version(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: UploadFileRequest,
    ) -> Result<ArtVersionModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let order = find_visible_order(db, actor, order_id).await?;

        if order.status != OrderStatus::ArtInProgress {
            return Err(ServiceError::InvalidStatus(format!(
                "Art can only be uploaded while order {} is art_in_progress (currently {})",
                order.order_number,
                order.status.as_ref()
            )));
        }
        let allowed = actor.is_supervisor()
            || (actor.role == Role::ArtFinalist && order.art_finalist_id == Some(actor.id));
        if !allowed {
            return Err(ServiceError::Forbidden(format!(
                "Only the art finalist who claimed order {} can upload proofs",
                order.order_number
            )));
        }

        ensure_content_type(&request.content_type, ART_CONTENT_TYPES)?;
        let bytes = self.storage.decode_upload(&request.content_base64)?;
        let stored = self.storage.store(&request.file_name, &bytes).await?;

        match self.insert_version(actor, order_id, &request, &stored.relative_path, stored.size_bytes).await {
            Ok(version) => {
                info!(art_id = %version.id, version = version.version_number, "Art version uploaded");
                Ok(version)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored.relative_path).await {
                    warn!(error = %cleanup, "Could not remove orphaned art file");
                }
                Err(e)
            }
        }
    }

    async fn insert_version(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: &UploadFileRequest,
        stored_path: &str,
        size_bytes: i64,
    ) -> Result<ArtVersionModel, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for art upload");
            ServiceError::DatabaseError(e)
        })?;

        let latest = ArtVersionEntity::find()
            .filter(art_version::Column::OrderId.eq(order_id))
            .order_by_desc(art_version::Column::VersionNumber)
            .limit(1)
            .one(&txn)
            .await?;

        let model = art_version::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            version_number: Set(latest.map(|v| v.version_number).unwrap_or(0) + 1),
            file_name: Set(request.file_name.trim().to_string()),
            content_type: Set(request.content_type.clone()),
            stored_path: Set(stored_path.to_string()),
            size_bytes: Set(size_bytes),
            uploaded_by: Set(actor.id),
            status: Set(ArtStatus::Pending),
            feedback: Set(None),
            created_at: Set(Utc::now()),
            reviewed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit art upload");
            ServiceError::DatabaseError(e)
        })?;
        Ok(model)
    }

    pub async fn list_art_versions(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<Vec<ArtVersionModel>, ServiceError> {
        let db = &*self.db_pool;
        find_visible_order(db, actor, order_id).await?;
        Ok(ArtVersionEntity::find()
            .filter(art_version::Column::OrderId.eq(order_id))
            .order_by_asc(art_version::Column::VersionNumber)
            .all(db)
            .await?)
    }

    pub async fn download_art_version(
        &self,
        actor: &Actor,
        art_id: Uuid,
    ) -> Result<FileDownload, ServiceError> {
        let db = &*self.db_pool;
        let version = ArtVersionEntity::find_by_id(art_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Art version {} not found", art_id)))?;
        find_visible_order(db, actor, version.order_id).await?;

        let bytes = self.storage.read(&version.stored_path).await?;
        Ok(FileDownload {
            file_name: version.file_name,
            content_type: version.content_type,
            bytes,
        })
    }

    /// Client decision on the newest pending proof. Approval moves the
    /// order to art_approved, rejection sends it back to art_in_progress.
    #[instrument(skip(self, request), fields(actor = %actor.id, order_id = %order_id, decision = ?request.decision))]
    pub async fn review_art(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: ReviewArtRequest,
    ) -> Result<ArtVersionModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let order = find_visible_order(db, actor, order_id).await?;

        if order.status != OrderStatus::ArtReview {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is not awaiting art review",
                order.order_number
            )));
        }
        if !(actor.is_supervisor() || (actor.is_seller() && order.seller_id == actor.id)) {
            return Err(ServiceError::Forbidden(
                "Only the order's seller or a manager can review art".to_string(),
            ));
        }

        let feedback = request
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        let target = match request.decision {
            ReviewDecision::Approve => OrderStatus::ArtApproved,
            ReviewDecision::Reject if feedback.is_none() => {
                return Err(ServiceError::ValidationError(
                    "Feedback is required when rejecting art".to_string(),
                ))
            }
            ReviewDecision::Reject => OrderStatus::ArtInProgress,
        };

        let pending = ArtVersionEntity::find()
            .filter(art_version::Column::OrderId.eq(order_id))
            .filter(art_version::Column::Status.eq(ArtStatus::Pending))
            .order_by_desc(art_version::Column::VersionNumber)
            .limit(1)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Order {} has no pending art version",
                    order.order_number
                ))
            })?;

        self.workflow
            .transition(
                actor,
                order_id,
                Some(OrderStatus::ArtReview),
                target,
                feedback,
                request.version,
            )
            .await?;

        ArtVersionEntity::find_by_id(pending.id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Art version {} not found", pending.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_request_parses_decision() {
        let request: ReviewArtRequest =
            serde_json::from_str(r#"{"decision":"reject","feedback":"Trocar a cor do brasão"}"#).unwrap();
        assert_eq!(request.decision, ReviewDecision::Reject);
        assert!(request.version.is_none());
    }

    #[test]
    fn upload_request_requires_content() {
        let request = UploadFileRequest {
            file_name: "prova.png".into(),
            content_type: "image/png".into(),
            content_base64: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
