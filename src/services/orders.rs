use super::{page_bounds, storage::FileStorage, Actor};
use crate::{
    cache::QueryCache,
    db::DbPool,
    entities::{
        art_version, client, document,
        order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
        order_item::{self, ActiveModel as OrderItemActiveModel, Model as OrderItemModel},
        order_status_history::{self, Model as StatusHistoryModel},
        user, OrderStatus, Role,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Item description is required"))]
    pub description: String,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 100))]
    pub material: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub client_id: Uuid,
    /// Required when a manager creates the quote on behalf of a seller
    pub seller_id: Option<Uuid>,
    #[validate]
    pub items: Vec<OrderItemInput>,
    pub discount: Option<Decimal>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    pub notes: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub discount: Option<Decimal>,
    /// Replaces every item when present
    pub items: Option<Vec<OrderItemInput>>,
    /// Version the caller last saw
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub client_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    /// Order number fragment
    pub search: Option<String>,
    /// Created on or after this date
    pub from: Option<NaiveDate>,
    /// Created on or before this date
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderModel,
    pub client_name: String,
    pub items: Vec<OrderItemModel>,
}

/// Money totals derived from a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub line_totals: Vec<Decimal>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
}

/// `total_price = quantity * unit_price`, `subtotal = sum`, and the
/// discount must stay within `[0, subtotal]`.
pub fn compute_totals(items: &[OrderItemInput], discount: Decimal) -> Result<OrderTotals, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "An order needs at least one item".to_string(),
        ));
    }

    let mut line_totals = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for '{}' must be at least 1",
                item.description
            )));
        }
        if item.unit_price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "Unit price for '{}' cannot be negative",
                item.description
            )));
        }
        let line_total = item
            .unit_price
            .checked_mul(Decimal::from(item.quantity))
            .ok_or_else(|| too_large(&format!("Total for '{}'", item.description)))?;
        line_totals.push(line_total);
    }

    let subtotal = line_totals
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(*line))
        .ok_or_else(|| too_large("Order subtotal"))?;
    if discount.is_sign_negative() || discount > subtotal {
        return Err(ServiceError::ValidationError(format!(
            "Discount must be between 0 and {}",
            subtotal
        )));
    }

    Ok(OrderTotals {
        line_totals,
        subtotal,
        discount,
        total_amount: subtotal - discount,
    })
}

fn too_large(what: &str) -> ServiceError {
    ServiceError::ValidationError(format!("{} is too large", what))
}

pub fn format_order_number(year: i32, sequence: u32) -> String {
    format!("OS-{}-{:05}", year, sequence)
}

/// Trailing sequence of an `OS-YYYY-NNNNN` number.
fn parse_sequence(order_number: &str) -> Option<u32> {
    order_number.rsplit('-').next()?.parse().ok()
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Sellers only ever see their own orders.
pub(crate) fn visible_to(select: Select<OrderEntity>, actor: &Actor) -> Select<OrderEntity> {
    if actor.is_seller() {
        select.filter(order::Column::SellerId.eq(actor.id))
    } else {
        select
    }
}

/// Loads an order the actor may see; invisible orders read as missing.
pub(crate) async fn find_visible_order<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    order_id: Uuid,
) -> Result<OrderModel, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .one(db)
        .await?
        .filter(|o| !actor.is_seller() || o.seller_id == actor.id)
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// Writes `active` only if the row still carries `loaded.version`.
pub(crate) async fn save_versioned<C: ConnectionTrait>(
    db: &C,
    loaded: &OrderModel,
    mut active: OrderActiveModel,
) -> Result<OrderModel, ServiceError> {
    active.version = Set(loaded.version + 1);
    active.updated_at = Set(Utc::now());
    OrderEntity::update(active)
        .filter(order::Column::Version.eq(loaded.version))
        .exec(db)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                warn!(order_id = %loaded.id, version = loaded.version, "Stale order version");
                ServiceError::ConcurrentModification(loaded.id)
            }
            other => ServiceError::DatabaseError(other),
        })
}

pub(crate) async fn record_history<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    from: Option<OrderStatus>,
    to: OrderStatus,
    changed_by: Uuid,
    note: Option<String>,
) -> Result<StatusHistoryModel, ServiceError> {
    Ok(order_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        from_status: Set(from),
        to_status: Set(to),
        changed_by: Set(changed_by),
        note: Set(note),
        changed_at: Set(Utc::now()),
    }
    .insert(db)
    .await?)
}

async fn insert_items<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    items: Vec<OrderItemInput>,
    totals: &OrderTotals,
) -> Result<Vec<OrderItemModel>, ServiceError> {
    let mut saved = Vec::with_capacity(items.len());
    for (item, line_total) in items.into_iter().zip(totals.line_totals.iter()) {
        let model = OrderItemActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            description: Set(item.description.trim().to_string()),
            size: Set(item.size),
            material: Set(item.material),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total_price: Set(*line_total),
        }
        .insert(db)
        .await?;
        saved.push(model);
    }
    Ok(saved)
}

/// Quotes and their lifecycle outside of status changes.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
    storage: FileStorage,
    max_page_size: u64,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache, storage: FileStorage, max_page_size: u64) -> Self {
        Self {
            db_pool,
            cache,
            storage,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(actor = %actor.id, client_id = %request.client_id))]
    pub async fn create_quote(
        &self,
        actor: &Actor,
        request: CreateOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let totals = compute_totals(&request.items, request.discount.unwrap_or_default())?;
        let seller_id = self.resolve_seller(actor, request.seller_id).await?;

        let client = client::Entity::find_by_id(request.client_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", request.client_id)))?;
        if !client.active {
            return Err(ServiceError::InvalidOperation(format!(
                "Client {} is inactive",
                client.name
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for quote creation");
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let order_number = next_order_number(&txn, now.year()).await?;
        let order_id = Uuid::new_v4();

        let order = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            client_id: Set(client.id),
            seller_id: Set(seller_id),
            art_finalist_id: Set(None),
            status: Set(OrderStatus::Quote),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            total_amount: Set(totals.total_amount),
            delivery_date: Set(request.delivery_date),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_number = %order_number, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let items = insert_items(&txn, order_id, request.items, &totals).await?;
        record_history(&txn, order_id, None, OrderStatus::Quote, actor.id, None).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit quote creation");
            ServiceError::DatabaseError(e)
        })?;

        self.cache.invalidate_aggregates().await;
        info!(order_id = %order_id, order_number = %order.order_number, total = %order.total_amount, "Quote created");

        Ok(OrderDetail {
            order,
            client_name: client.name,
            items,
        })
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let order = find_visible_order(db, actor, order_id).await?;
        self.detail(order).await
    }

    pub async fn list_orders(
        &self,
        actor: &Actor,
        query: &OrderListQuery,
        default_limit: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let (page, limit) = page_bounds(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(default_limit),
            self.max_page_size,
        );

        let mut select = visible_to(OrderEntity::find(), actor);
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        if let Some(client_id) = query.client_id {
            select = select.filter(order::Column::ClientId.eq(client_id));
        }
        if let Some(seller_id) = query.seller_id {
            select = select.filter(order::Column::SellerId.eq(seller_id));
        }
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(order::Column::OrderNumber.contains(term.to_uppercase()));
        }
        if let Some(from) = query.from {
            select = select.filter(order::Column::CreatedAt.gte(start_of_day(from)));
        }
        if let Some(to) = query.to {
            select = select.filter(order::Column::CreatedAt.lt(start_of_day(to) + Duration::days(1)));
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        Ok((orders, total))
    }

    /// Header fields and items can change only in `quote` or `approved`.
    #[instrument(skip(self, request), fields(actor = %actor.id, order_id = %order_id))]
    pub async fn update_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;
        for item in request.items.iter().flatten() {
            item.validate()?;
        }
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order update");
            ServiceError::DatabaseError(e)
        })?;

        let existing = find_visible_order(&txn, actor, order_id).await?;
        if let Some(expected) = request.version {
            if expected != existing.version {
                return Err(ServiceError::ConcurrentModification(order_id));
            }
        }
        if !existing.status.is_editable() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} can no longer be edited in status {}",
                existing.order_number,
                existing.status.as_ref()
            )));
        }

        let mut active: OrderActiveModel = existing.clone().into();
        if request.notes.is_some() {
            active.notes = Set(request.notes.filter(|n| !n.trim().is_empty()));
        }
        if request.delivery_date.is_some() {
            active.delivery_date = Set(request.delivery_date);
        }

        let discount = request.discount.unwrap_or(existing.discount);
        match request.items {
            Some(items) => {
                let totals = compute_totals(&items, discount)?;
                order_item::Entity::delete_many()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .exec(&txn)
                    .await?;
                insert_items(&txn, order_id, items, &totals).await?;
                active.subtotal = Set(totals.subtotal);
                active.discount = Set(totals.discount);
                active.total_amount = Set(totals.total_amount);
            }
            None if request.discount.is_some() => {
                if discount.is_sign_negative() || discount > existing.subtotal {
                    return Err(ServiceError::ValidationError(format!(
                        "Discount must be between 0 and {}",
                        existing.subtotal
                    )));
                }
                active.discount = Set(discount);
                active.total_amount = Set(existing.subtotal - discount);
            }
            None => {}
        }

        let updated = save_versioned(&txn, &existing, active).await?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order update");
            ServiceError::DatabaseError(e)
        })?;

        self.cache.invalidate_aggregates().await;
        info!(order_id = %order_id, version = updated.version, "Order updated");
        self.detail(updated).await
    }

    /// Removes a quote or cancelled order together with its items,
    /// history and art proofs. Linked documents are kept but detached.
    #[instrument(skip(self), fields(actor = %actor.id, order_id = %order_id))]
    pub async fn delete_order(&self, actor: &Actor, order_id: Uuid) -> Result<(), ServiceError> {
        if !actor.is_supervisor() {
            return Err(ServiceError::Forbidden(
                "Only managers can delete orders".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let existing = find_visible_order(db, actor, order_id).await?;
        if !matches!(existing.status, OrderStatus::Quote | OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidOperation(format!(
                "Only quotes or cancelled orders can be deleted; {} is {}",
                existing.order_number,
                existing.status.as_ref()
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order deletion");
            ServiceError::DatabaseError(e)
        })?;

        let art_paths: Vec<String> = art_version::Entity::find()
            .filter(art_version::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|a| a.stored_path)
            .collect();

        art_version::Entity::delete_many()
            .filter(art_version::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order_status_history::Entity::delete_many()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        document::Entity::update_many()
            .col_expr(document::Column::OrderId, Expr::value(Option::<Uuid>::None))
            .filter(document::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;

        for path in art_paths {
            if let Err(e) = self.storage.delete(&path).await {
                warn!(error = %e, path = %path, "Could not remove art file of deleted order");
            }
        }

        self.cache.invalidate_aggregates().await;
        info!(order_id = %order_id, order_number = %existing.order_number, "Order deleted");
        Ok(())
    }

    pub async fn history(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<Vec<StatusHistoryModel>, ServiceError> {
        let db = &*self.db_pool;
        find_visible_order(db, actor, order_id).await?;
        Ok(order_status_history::Entity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::ChangedAt)
            .all(db)
            .await?)
    }

    async fn detail(&self, order: OrderModel) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(db)
            .await?;
        let client_name = client::Entity::find_by_id(order.client_id)
            .one(db)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();
        Ok(OrderDetail {
            order,
            client_name,
            items,
        })
    }

    /// Sellers quote for themselves; supervisors may name a seller.
    async fn resolve_seller(&self, actor: &Actor, requested: Option<Uuid>) -> Result<Uuid, ServiceError> {
        match requested {
            None => Ok(actor.id),
            Some(id) if id == actor.id => Ok(id),
            Some(id) if actor.is_supervisor() => {
                let seller = user::Entity::find_by_id(id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", id)))?;
                if seller.role != Role::Seller || !seller.active {
                    return Err(ServiceError::ValidationError(format!(
                        "User {} is not an active seller",
                        seller.name
                    )));
                }
                Ok(id)
            }
            Some(_) => Err(ServiceError::Forbidden(
                "Sellers can only create quotes for themselves".to_string(),
            )),
        }
    }
}

/// Next `OS-{year}-NNNNN`, one past the highest number issued that year.
async fn next_order_number<C: ConnectionTrait>(db: &C, year: i32) -> Result<String, ServiceError> {
    let prefix = format!("OS-{}-", year);
    let last = OrderEntity::find()
        .filter(order::Column::OrderNumber.starts_with(prefix.as_str()))
        // Past 99999 the sequence gains a digit, so string order alone misranks it
        .order_by_desc(Expr::cust("LENGTH(order_number)"))
        .order_by_desc(order::Column::OrderNumber)
        .limit(1)
        .one(db)
        .await?;
    let sequence = last
        .as_ref()
        .and_then(|o| parse_sequence(&o.order_number))
        .unwrap_or(0)
        + 1;
    Ok(format_order_number(year, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn item(quantity: i32, unit_price: Decimal) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            description: "Bandeira 90x130 cetim".into(),
            size: Some("90x130".into()),
            material: Some("cetim".into()),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn totals_sum_lines_and_apply_discount() {
        let totals = compute_totals(&[item(3, dec!(45.50)), item(1, dec!(120))], dec!(16.50)).unwrap();
        assert_eq!(totals.line_totals, vec![dec!(136.50), dec!(120)]);
        assert_eq!(totals.subtotal, dec!(256.50));
        assert_eq!(totals.total_amount, dec!(240.00));
    }

    #[test]
    fn discount_may_equal_subtotal() {
        let totals = compute_totals(&[item(2, dec!(10))], dec!(20)).unwrap();
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn totals_reject_bad_input() {
        assert_matches!(compute_totals(&[], Decimal::ZERO), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            compute_totals(&[item(0, dec!(10))], Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            compute_totals(&[item(1, dec!(-1))], Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            compute_totals(&[item(1, dec!(10))], dec!(10.01)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            compute_totals(&[item(1, dec!(10))], dec!(-1)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn overflowing_totals_are_a_validation_error() {
        assert_matches!(
            compute_totals(&[item(2, Decimal::MAX)], Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            compute_totals(&[item(1, Decimal::MAX), item(1, dec!(1))], Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn order_numbers_are_zero_padded() {
        assert_eq!(format_order_number(2026, 7), "OS-2026-00007");
        assert_eq!(parse_sequence("OS-2026-00042"), Some(42));
        assert_eq!(parse_sequence("garbage"), None);
    }

    #[test]
    fn start_of_day_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(start_of_day(date).to_rfc3339(), "2026-03-15T00:00:00+00:00");
    }
}
