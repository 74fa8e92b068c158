//! Order status workflow: the transition graph, the per-role gates on it,
//! and the art hand-off side effects that ride along with some edges.

use super::{
    orders::{find_visible_order, record_history, save_versioned},
    Actor,
};
use crate::{
    cache::QueryCache,
    db::DbPool,
    entities::{
        art_version::{self, ArtStatus},
        order::{ActiveModel as OrderActiveModel, Model as OrderModel},
        OrderStatus, Role,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    /// Version the caller last saw
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct WorkflowActionRequest {
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    pub version: Option<i32>,
}

/// Edges of the order status graph.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Quote, Approved)
            | (Quote, Cancelled)
            | (Approved, AwaitingArt)
            | (Approved, Cancelled)
            | (AwaitingArt, ArtInProgress)
            | (AwaitingArt, Cancelled)
            | (ArtInProgress, ArtReview)
            | (ArtInProgress, AwaitingArt)
            | (ArtInProgress, Cancelled)
            | (ArtReview, ArtApproved)
            | (ArtReview, ArtInProgress)
            | (ArtReview, Cancelled)
            | (ArtApproved, InProduction)
            | (ArtApproved, Cancelled)
            | (InProduction, Ready)
            | (Ready, Delivered)
    )
}

/// Role gate for an edge already known to be in the graph.
///
/// Sellers act only on their own orders; art finalists hand off and
/// release only orders they claimed.
pub fn may_change_status(actor: &Actor, order: &OrderModel, to: OrderStatus) -> bool {
    use OrderStatus::*;
    let from = order.status;
    match actor.role {
        Role::Admin | Role::Manager => true,
        Role::Seller => {
            order.seller_id == actor.id
                && matches!(
                    (from, to),
                    (Quote, Approved)
                        | (Quote, Cancelled)
                        | (Approved, AwaitingArt)
                        | (Approved, Cancelled)
                        | (ArtReview, ArtApproved)
                        | (ArtReview, ArtInProgress)
                        | (Ready, Delivered)
                )
        }
        Role::ArtFinalist => {
            let is_claimant = order.art_finalist_id == Some(actor.id);
            match (from, to) {
                (AwaitingArt, ArtInProgress) => true,
                (ArtInProgress, ArtReview) | (ArtInProgress, AwaitingArt) => is_claimant,
                _ => false,
            }
        }
        Role::Production => matches!((from, to), (ArtApproved, InProduction) | (InProduction, Ready)),
    }
}

/// Full check for one transition: same-status and off-graph requests are
/// `InvalidStatus`, role refusals are `Forbidden`, and a hand-off to
/// review needs a pending proof.
pub fn check_transition(
    actor: &Actor,
    order: &OrderModel,
    to: OrderStatus,
    has_pending_art: bool,
) -> Result<(), ServiceError> {
    let from = order.status;
    if from == to {
        return Err(ServiceError::InvalidStatus(format!(
            "Order {} is already {}",
            order.order_number,
            to.as_ref()
        )));
    }
    if !is_valid_transition(from, to) {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot move order {} from {} to {}",
            order.order_number,
            from.as_ref(),
            to.as_ref()
        )));
    }
    if !may_change_status(actor, order, to) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not move order {} from {} to {}",
            actor.role.as_ref(),
            order.order_number,
            from.as_ref(),
            to.as_ref()
        )));
    }
    if to == OrderStatus::ArtReview && !has_pending_art {
        return Err(ServiceError::InvalidOperation(format!(
            "Order {} has no pending art version to review",
            order.order_number
        )));
    }
    Ok(())
}

/// Sending a proof back from review is a rejection, which needs feedback
/// whichever route takes the edge.
pub fn check_rejection_feedback(
    from: OrderStatus,
    to: OrderStatus,
    note: Option<&str>,
) -> Result<(), ServiceError> {
    let rejecting = from == OrderStatus::ArtReview && to == OrderStatus::ArtInProgress;
    if rejecting && note.map_or(true, |n| n.trim().is_empty()) {
        return Err(ServiceError::ValidationError(
            "Feedback is required when sending art back from review".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct OrderWorkflowService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
}

impl OrderWorkflowService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache) -> Self {
        Self { db_pool, cache }
    }

    pub async fn change_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: ChangeStatusRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        self.transition(actor, order_id, None, request.status, request.note, request.version)
            .await
    }

    /// awaiting_art -> art_in_progress; the art finalist becomes the claimant.
    pub async fn claim_art(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: WorkflowActionRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        self.transition(
            actor,
            order_id,
            Some(OrderStatus::AwaitingArt),
            OrderStatus::ArtInProgress,
            request.note,
            request.version,
        )
        .await
    }

    /// art_in_progress -> awaiting_art; clears the claimant.
    pub async fn release_art(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: WorkflowActionRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        self.transition(
            actor,
            order_id,
            Some(OrderStatus::ArtInProgress),
            OrderStatus::AwaitingArt,
            request.note,
            request.version,
        )
        .await
    }

    /// art_in_progress -> art_review, once a proof has been uploaded.
    pub async fn submit_art_for_review(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: WorkflowActionRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        self.transition(
            actor,
            order_id,
            Some(OrderStatus::ArtInProgress),
            OrderStatus::ArtReview,
            request.note,
            request.version,
        )
        .await
    }

    #[instrument(skip(self, note), fields(actor = %actor.id, order_id = %order_id, to = to.as_ref()))]
    pub(crate) async fn transition(
        &self,
        actor: &Actor,
        order_id: Uuid,
        expected_from: Option<OrderStatus>,
        to: OrderStatus,
        note: Option<String>,
        version: Option<i32>,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for status change");
            ServiceError::DatabaseError(e)
        })?;

        let order = find_visible_order(&txn, actor, order_id).await?;
        if let Some(expected) = version {
            if expected != order.version {
                return Err(ServiceError::ConcurrentModification(order_id));
            }
        }
        if let Some(expected) = expected_from {
            if order.status != expected {
                return Err(ServiceError::InvalidStatus(format!(
                    "Order {} is {}, expected {}",
                    order.order_number,
                    order.status.as_ref(),
                    expected.as_ref()
                )));
            }
        }

        let has_pending_art = pending_art_count(&txn, order_id).await? > 0;
        check_transition(actor, &order, to, has_pending_art)?;
        check_rejection_feedback(order.status, to, note.as_deref())?;

        let from = order.status;
        let mut active: OrderActiveModel = order.clone().into();
        active.status = Set(to);
        match (from, to) {
            (OrderStatus::AwaitingArt, OrderStatus::ArtInProgress) if actor.role == Role::ArtFinalist => {
                active.art_finalist_id = Set(Some(actor.id));
            }
            (OrderStatus::ArtInProgress, OrderStatus::AwaitingArt) => {
                active.art_finalist_id = Set(None);
            }
            (OrderStatus::ArtReview, OrderStatus::ArtApproved) => {
                resolve_pending_art(&txn, order_id, true, note.clone()).await?;
            }
            (OrderStatus::ArtReview, OrderStatus::ArtInProgress) => {
                resolve_pending_art(&txn, order_id, false, note.clone()).await?;
            }
            _ => {}
        }

        let updated = save_versioned(&txn, &order, active).await?;
        record_history(&txn, order_id, Some(from), to, actor.id, note).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status change");
            ServiceError::DatabaseError(e)
        })?;

        self.cache.invalidate_aggregates().await;
        info!(
            order_number = %updated.order_number,
            from = from.as_ref(),
            to = to.as_ref(),
            version = updated.version,
            "Order status changed"
        );
        Ok(updated)
    }
}

async fn pending_art_count<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<u64, ServiceError> {
    Ok(art_version::Entity::find()
        .filter(art_version::Column::OrderId.eq(order_id))
        .filter(art_version::Column::Status.eq(ArtStatus::Pending))
        .count(db)
        .await?)
}

/// Approving marks the newest pending proof approved and supersedes the
/// rest; rejecting marks every pending proof rejected with the feedback.
async fn resolve_pending_art<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    approve: bool,
    feedback: Option<String>,
) -> Result<(), ServiceError> {
    let pending = art_version::Entity::find()
        .filter(art_version::Column::OrderId.eq(order_id))
        .filter(art_version::Column::Status.eq(ArtStatus::Pending))
        .order_by_desc(art_version::Column::VersionNumber)
        .all(db)
        .await?;

    let now = Utc::now();
    let newest = pending.first().map(|v| v.version_number);
    for version in pending {
        let (status, note) = match (approve, Some(version.version_number) == newest) {
            (true, true) => (ArtStatus::Approved, feedback.clone()),
            (true, false) => (
                ArtStatus::Rejected,
                newest.map(|n| format!("Superseded by version {}", n)),
            ),
            (false, _) => (ArtStatus::Rejected, feedback.clone()),
        };
        let mut active: art_version::ActiveModel = version.into();
        active.status = Set(status);
        active.feedback = Set(note);
        active.reviewed_at = Set(Some(now));
        active.update(db).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use OrderStatus::*;

    fn order(status: OrderStatus, seller_id: Uuid, art_finalist_id: Option<Uuid>) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            order_number: "OS-2026-00001".into(),
            client_id: Uuid::new_v4(),
            seller_id,
            art_finalist_id,
            status,
            subtotal: Decimal::new(100, 0),
            discount: Decimal::ZERO,
            total_amount: Decimal::new(100, 0),
            delivery_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[rstest]
    #[case(Quote, Approved, true)]
    #[case(Quote, Cancelled, true)]
    #[case(Quote, InProduction, false)]
    #[case(Approved, AwaitingArt, true)]
    #[case(AwaitingArt, ArtInProgress, true)]
    #[case(ArtInProgress, ArtReview, true)]
    #[case(ArtInProgress, AwaitingArt, true)]
    #[case(ArtReview, ArtApproved, true)]
    #[case(ArtReview, ArtInProgress, true)]
    #[case(ArtApproved, InProduction, true)]
    #[case(InProduction, Ready, true)]
    #[case(InProduction, Cancelled, false)]
    #[case(Ready, Delivered, true)]
    #[case(Ready, Cancelled, false)]
    #[case(Delivered, Cancelled, false)]
    #[case(Cancelled, Quote, false)]
    #[case(ArtApproved, ArtReview, false)]
    fn transition_graph(#[case] from: OrderStatus, #[case] to: OrderStatus, #[case] allowed: bool) {
        assert_eq!(is_valid_transition(from, to), allowed);
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        use sea_orm::Iterable;
        for to in OrderStatus::iter() {
            assert!(!is_valid_transition(Delivered, to));
            assert!(!is_valid_transition(Cancelled, to));
        }
    }

    #[rstest]
    #[case(Role::Seller, Quote, Approved, true)]
    #[case(Role::Seller, Approved, AwaitingArt, true)]
    #[case(Role::Seller, ArtReview, ArtApproved, true)]
    #[case(Role::Seller, ArtReview, ArtInProgress, true)]
    #[case(Role::Seller, Ready, Delivered, true)]
    #[case(Role::Seller, AwaitingArt, ArtInProgress, false)]
    #[case(Role::Seller, ArtApproved, InProduction, false)]
    #[case(Role::Seller, ArtApproved, Cancelled, false)]
    #[case(Role::ArtFinalist, AwaitingArt, ArtInProgress, true)]
    #[case(Role::ArtFinalist, Quote, Approved, false)]
    #[case(Role::ArtFinalist, ArtReview, ArtApproved, false)]
    #[case(Role::Production, ArtApproved, InProduction, true)]
    #[case(Role::Production, InProduction, Ready, true)]
    #[case(Role::Production, Ready, Delivered, false)]
    #[case(Role::Production, Quote, Cancelled, false)]
    #[case(Role::Manager, ArtApproved, Cancelled, true)]
    #[case(Role::Admin, InProduction, Ready, true)]
    fn role_gates(
        #[case] role: Role,
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        let actor = Actor::new(Uuid::new_v4(), role);
        let order = order(from, actor.id, None);
        assert_eq!(may_change_status(&actor, &order, to), allowed);
    }

    #[test]
    fn sellers_cannot_move_other_sellers_orders() {
        let actor = Actor::new(Uuid::new_v4(), Role::Seller);
        let order = order(Quote, Uuid::new_v4(), None);
        assert!(!may_change_status(&actor, &order, Approved));
    }

    #[test]
    fn only_the_claimant_hands_off_or_releases() {
        let claimant = Actor::new(Uuid::new_v4(), Role::ArtFinalist);
        let other = Actor::new(Uuid::new_v4(), Role::ArtFinalist);
        let order = order(ArtInProgress, Uuid::new_v4(), Some(claimant.id));

        assert!(may_change_status(&claimant, &order, ArtReview));
        assert!(may_change_status(&claimant, &order, AwaitingArt));
        assert!(!may_change_status(&other, &order, ArtReview));
        assert!(!may_change_status(&other, &order, AwaitingArt));
    }

    #[test]
    fn check_transition_error_kinds() {
        let seller = Actor::new(Uuid::new_v4(), Role::Seller);
        let quote = order(Quote, seller.id, None);

        assert_matches!(
            check_transition(&seller, &quote, Quote, false),
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            check_transition(&seller, &quote, Delivered, false),
            Err(ServiceError::InvalidStatus(_))
        );
        assert!(check_transition(&seller, &quote, Approved, false).is_ok());

        let production = Actor::new(Uuid::new_v4(), Role::Production);
        assert_matches!(
            check_transition(&production, &quote, Approved, false),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[rstest]
    #[case(ArtReview, ArtInProgress, None, false)]
    #[case(ArtReview, ArtInProgress, Some("   "), false)]
    #[case(ArtReview, ArtInProgress, Some("Trocar o azul"), true)]
    #[case(ArtReview, ArtApproved, None, true)]
    #[case(ArtInProgress, AwaitingArt, None, true)]
    fn rejection_from_review_needs_feedback(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] note: Option<&str>,
        #[case] allowed: bool,
    ) {
        let result = check_rejection_feedback(from, to, note);
        if allowed {
            assert!(result.is_ok());
        } else {
            assert_matches!(result, Err(ServiceError::ValidationError(_)));
        }
    }

    #[test]
    fn review_hand_off_needs_pending_art() {
        let manager = Actor::new(Uuid::new_v4(), Role::Manager);
        let in_progress = order(ArtInProgress, Uuid::new_v4(), None);
        assert_matches!(
            check_transition(&manager, &in_progress, ArtReview, false),
            Err(ServiceError::InvalidOperation(_))
        );
        assert!(check_transition(&manager, &in_progress, ArtReview, true).is_ok());
    }
}
