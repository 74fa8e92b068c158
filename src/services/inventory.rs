use super::{page_bounds, Actor};
use crate::{
    cache::QueryCache,
    db::DbPool,
    entities::{
        inventory_movement::{self, Entity as MovementEntity, Model as MovementModel, MovementKind},
        order,
        product::{self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    DbErr, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 50, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 10, message = "Unit is required"))]
    pub unit: String,
    /// Opening balance, recorded as an `in` movement
    pub quantity: Option<Decimal>,
    pub min_quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub unit: Option<String>,
    pub min_quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches SKU or name
    pub search: Option<String>,
    /// Only products at or below their minimum
    pub low_stock: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    pub kind: MovementKind,
    /// Amount moved, or the counted balance for an adjustment
    pub quantity: Decimal,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovementResult {
    pub product: ProductModel,
    pub movement: MovementModel,
}

/// New balance after a movement. `in` adds, `out` subtracts and may not
/// go negative, `adjustment` replaces the balance.
pub fn apply_movement(current: Decimal, kind: MovementKind, quantity: Decimal) -> Result<Decimal, ServiceError> {
    match kind {
        MovementKind::In | MovementKind::Out if quantity <= Decimal::ZERO => Err(
            ServiceError::ValidationError("Movement quantity must be greater than zero".to_string()),
        ),
        MovementKind::Adjustment if quantity.is_sign_negative() => Err(ServiceError::ValidationError(
            "Adjusted balance cannot be negative".to_string(),
        )),
        MovementKind::In => current.checked_add(quantity).ok_or_else(|| {
            ServiceError::ValidationError("Resulting balance is too large".to_string())
        }),
        MovementKind::Out if quantity > current => Err(ServiceError::InsufficientStock(format!(
            "Requested {} but only {} available",
            quantity, current
        ))),
        MovementKind::Out => Ok(current - quantity),
        MovementKind::Adjustment => Ok(quantity),
    }
}

fn ensure_not_negative(value: Option<Decimal>, field: &str) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.is_sign_negative() => Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            field
        ))),
        _ => Ok(()),
    }
}

/// Products at or below their minimum quantity.
pub(crate) async fn low_stock_count<C: ConnectionTrait>(db: &C) -> Result<u64, ServiceError> {
    Ok(ProductEntity::find()
        .filter(product::Column::Active.eq(true))
        .filter(Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::MinQuantity)))
        .count(db)
        .await?)
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
    max_page_size: u64,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache, max_page_size: u64) -> Self {
        Self {
            db_pool,
            cache,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(actor = %actor.id, sku = %request.sku))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        ensure_not_negative(request.quantity, "Quantity")?;
        ensure_not_negative(request.min_quantity, "Minimum quantity")?;
        ensure_not_negative(request.unit_cost, "Unit cost")?;

        let db = &*self.db_pool;
        let sku = request.sku.trim().to_uppercase();
        let taken = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku.clone()))
            .count(db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!("SKU {} already exists", sku)));
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for product creation");
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let opening = request.quantity.unwrap_or_default();
        let product = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(request.name.trim().to_string()),
            unit: Set(request.unit.trim().to_lowercase()),
            quantity: Set(opening),
            min_quantity: Set(request.min_quantity.unwrap_or_default()),
            unit_cost: Set(request.unit_cost.unwrap_or_default()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if opening > Decimal::ZERO {
            insert_movement(
                &txn,
                product.id,
                MovementKind::In,
                opening,
                opening,
                Some("Opening balance".to_string()),
                None,
                actor.id,
            )
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit product creation");
            ServiceError::DatabaseError(e)
        })?;

        self.cache.invalidate_aggregates().await;
        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    pub async fn list_products(
        &self,
        query: &ProductListQuery,
        default_limit: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let (page, limit) = page_bounds(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(default_limit),
            self.max_page_size,
        );

        let mut select = ProductEntity::find();
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(product::Column::Sku.contains(term.to_uppercase()))
                    .add(product::Column::Name.contains(term)),
            );
        }
        match query.low_stock {
            Some(true) => {
                select = select.filter(
                    Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::MinQuantity)),
                )
            }
            Some(false) => {
                select = select.filter(
                    Expr::col(product::Column::Quantity).gt(Expr::col(product::Column::MinQuantity)),
                )
            }
            None => {}
        }
        if let Some(active) = query.active {
            select = select.filter(product::Column::Active.eq(active));
        }

        let paginator = select
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    /// Stock levels change only through movements.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        ensure_not_negative(request.min_quantity, "Minimum quantity")?;
        ensure_not_negative(request.unit_cost, "Unit cost")?;

        let existing = self.get_product(product_id).await?;
        let mut active: ProductActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit.trim().to_lowercase());
        }
        if let Some(min) = request.min_quantity {
            active.min_quantity = Set(min);
        }
        if let Some(cost) = request.unit_cost {
            active.unit_cost = Set(cost);
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        self.cache.invalidate_aggregates().await;
        Ok(updated)
    }

    #[instrument(skip(self, request), fields(actor = %actor.id, product_id = %product_id, kind = ?request.kind))]
    pub async fn record_movement(
        &self,
        actor: &Actor,
        product_id: Uuid,
        request: RecordMovementRequest,
    ) -> Result<MovementResult, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock movement");
            ServiceError::DatabaseError(e)
        })?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        if !product.active {
            return Err(ServiceError::InvalidOperation(format!(
                "Product {} is inactive",
                product.sku
            )));
        }
        if let Some(order_id) = request.order_id {
            order::Entity::find_by_id(order_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        }

        let balance = match apply_movement(product.quantity, request.kind, request.quantity) {
            Ok(balance) => balance,
            Err(e) => {
                warn!(sku = %product.sku, error = %e, "Stock movement refused");
                return Err(e);
            }
        };

        let product = save_balance(&txn, &product, balance).await?;

        let movement = insert_movement(
            &txn,
            product_id,
            request.kind,
            request.quantity,
            balance,
            request.reason.filter(|r| !r.trim().is_empty()),
            request.order_id,
            actor.id,
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit stock movement");
            ServiceError::DatabaseError(e)
        })?;

        self.cache.invalidate_aggregates().await;
        info!(sku = %product.sku, balance = %balance, "Stock movement recorded");
        Ok(MovementResult { product, movement })
    }

    pub async fn list_movements(&self, product_id: Uuid) -> Result<Vec<MovementModel>, ServiceError> {
        self.get_product(product_id).await?;
        Ok(MovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }
}

/// Writes a new balance only if the stored one is still the balance it was
/// computed from; a concurrent movement in between is a conflict.
pub async fn save_balance<C: ConnectionTrait>(
    db: &C,
    loaded: &ProductModel,
    balance: Decimal,
) -> Result<ProductModel, ServiceError> {
    let mut active: ProductActiveModel = loaded.clone().into();
    active.quantity = Set(balance);
    active.updated_at = Set(Utc::now());
    ProductEntity::update(active)
        .filter(product::Column::Quantity.eq(loaded.quantity))
        .exec(db)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                warn!(sku = %loaded.sku, quantity = %loaded.quantity, "Stock changed during movement");
                ServiceError::Conflict(format!(
                    "Stock of {} changed while recording the movement, retry",
                    loaded.sku
                ))
            }
            other => ServiceError::DatabaseError(other),
        })
}

#[allow(clippy::too_many_arguments)]
async fn insert_movement<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    kind: MovementKind,
    quantity: Decimal,
    balance_after: Decimal,
    reason: Option<String>,
    order_id: Option<Uuid>,
    created_by: Uuid,
) -> Result<MovementModel, ServiceError> {
    Ok(inventory_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        kind: Set(kind),
        quantity: Set(quantity),
        balance_after: Set(balance_after),
        reason: Set(reason),
        order_id: Set(order_id),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?)
}
