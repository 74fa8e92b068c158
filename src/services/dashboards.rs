//! Per-role landing dashboards, cached under `dashboard:` keys.

use super::{
    finance::FinanceService,
    goals::{month_bounds, percentage, sales_total},
    inventory::low_stock_count,
    reports::{build_sales_report, client_names, sale_orders, user_names, SellerSales},
    Actor,
};
use crate::{
    cache::{query::DASHBOARD_PREFIX, QueryCache},
    db::DbPool,
    entities::{order, sales_goal, OrderStatus, Role},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

const UPCOMING_DAYS: i64 = 7;
const QUEUE_LIMIT: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Compact order row for dashboard lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub client_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SellerDashboard {
    pub orders_by_status: Vec<StatusCount>,
    pub month_sales: Decimal,
    pub month_goal: Decimal,
    pub goal_percentage: Decimal,
    pub open_quotes: u64,
    pub upcoming_deliveries: Vec<OrderSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArtFinalistDashboard {
    /// Oldest first
    pub awaiting_art: Vec<OrderSummary>,
    pub my_claimed: Vec<OrderSummary>,
    pub in_review: Vec<OrderSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductionDashboard {
    pub art_approved: Vec<OrderSummary>,
    pub in_production: Vec<OrderSummary>,
    pub ready: Vec<OrderSummary>,
    pub due_soon: Vec<OrderSummary>,
    pub low_stock_products: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManagerDashboard {
    pub month_revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub receivables_open: Decimal,
    pub receivables_overdue: Decimal,
    pub payables_due_soon_count: u64,
    pub payables_due_soon_amount: Decimal,
    pub low_stock_products: u64,
    pub seller_ranking: Vec<SellerSales>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Dashboard {
    Seller(SellerDashboard),
    ArtFinalist(ArtFinalistDashboard),
    Production(ProductionDashboard),
    Manager(ManagerDashboard),
}

fn not_finished() -> [OrderStatus; 2] {
    [OrderStatus::Delivered, OrderStatus::Cancelled]
}

async fn status_counts<C: ConnectionTrait>(
    db: &C,
    seller_id: Option<Uuid>,
) -> Result<Vec<StatusCount>, ServiceError> {
    let mut select = order::Entity::find()
        .select_only()
        .column(order::Column::Status)
        .column_as(Expr::col(order::Column::Id).count(), "count")
        .group_by(order::Column::Status);
    if let Some(id) = seller_id {
        select = select.filter(order::Column::SellerId.eq(id));
    }
    let mut counts: Vec<StatusCount> = select
        .into_tuple::<(OrderStatus, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount {
            status,
            count: count.max(0) as u64,
        })
        .collect();
    counts.sort_by(|a, b| a.status.as_ref().cmp(b.status.as_ref()));
    Ok(counts)
}

async fn summarize<C: ConnectionTrait>(
    db: &C,
    select: Select<order::Entity>,
) -> Result<Vec<OrderSummary>, ServiceError> {
    let orders = select.limit(QUEUE_LIMIT).all(db).await?;
    let names = client_names(db, orders.iter().map(|o| o.client_id)).await?;
    Ok(orders
        .into_iter()
        .map(|o| OrderSummary {
            client_name: names.get(&o.client_id).cloned().unwrap_or_default(),
            id: o.id,
            order_number: o.order_number,
            status: o.status,
            total_amount: o.total_amount,
            delivery_date: o.delivery_date,
            created_at: o.created_at,
        })
        .collect())
}

fn queue(status: OrderStatus) -> Select<order::Entity> {
    order::Entity::find()
        .filter(order::Column::Status.eq(status))
        .order_by_asc(order::Column::CreatedAt)
}

fn deliveries_between(from: NaiveDate, to: NaiveDate) -> Select<order::Entity> {
    order::Entity::find()
        .filter(order::Column::DeliveryDate.between(from, to))
        .filter(order::Column::Status.is_not_in(not_finished()))
        .order_by_asc(order::Column::DeliveryDate)
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
    finance: FinanceService,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache, finance: FinanceService) -> Self {
        Self {
            db_pool,
            cache,
            finance,
        }
    }

    /// Picks the dashboard for the caller's role.
    #[instrument(skip(self), fields(actor = %actor.id, role = actor.role.as_ref()))]
    pub async fn dashboard(&self, actor: &Actor) -> Result<Dashboard, ServiceError> {
        match actor.role {
            Role::Seller => {
                let key = format!("{}seller:{}", DASHBOARD_PREFIX, actor.id);
                self.cache
                    .remember(&key, None, move || async move {
                        Ok::<_, ServiceError>(Dashboard::Seller(self.seller(actor.id).await?))
                    })
                    .await
            }
            Role::ArtFinalist => {
                let key = format!("{}art_finalist:{}", DASHBOARD_PREFIX, actor.id);
                self.cache
                    .remember(&key, None, move || async move {
                        Ok::<_, ServiceError>(Dashboard::ArtFinalist(self.art_finalist(actor.id).await?))
                    })
                    .await
            }
            Role::Production => {
                let key = format!("{}production", DASHBOARD_PREFIX);
                self.cache
                    .remember(&key, None, move || async move {
                        Ok::<_, ServiceError>(Dashboard::Production(self.production().await?))
                    })
                    .await
            }
            Role::Manager | Role::Admin => {
                let key = format!("{}manager", DASHBOARD_PREFIX);
                self.cache
                    .remember(&key, None, move || async move {
                        Ok::<_, ServiceError>(Dashboard::Manager(self.manager().await?))
                    })
                    .await
            }
        }
    }

    async fn seller(&self, seller_id: Uuid) -> Result<SellerDashboard, ServiceError> {
        let db = &*self.db_pool;
        let today = Utc::now().date_naive();
        let (from, to) = month_bounds(today.year(), today.month() as i32)?;

        let month_sales = sales_total(db, Some(seller_id), from, to).await?;
        let month_goal = sales_goal::Entity::find()
            .filter(sales_goal::Column::SellerId.eq(seller_id))
            .filter(sales_goal::Column::Year.eq(today.year()))
            .filter(sales_goal::Column::Month.eq(today.month() as i32))
            .one(db)
            .await?
            .map(|g| g.target_amount)
            .unwrap_or_default();
        let open_quotes = order::Entity::find()
            .filter(order::Column::SellerId.eq(seller_id))
            .filter(order::Column::Status.eq(OrderStatus::Quote))
            .count(db)
            .await?;
        let upcoming = summarize(
            db,
            deliveries_between(today, today + Duration::days(UPCOMING_DAYS))
                .filter(order::Column::SellerId.eq(seller_id)),
        )
        .await?;

        Ok(SellerDashboard {
            orders_by_status: status_counts(db, Some(seller_id)).await?,
            month_sales,
            month_goal,
            goal_percentage: percentage(month_sales, month_goal),
            open_quotes,
            upcoming_deliveries: upcoming,
        })
    }

    async fn art_finalist(&self, user_id: Uuid) -> Result<ArtFinalistDashboard, ServiceError> {
        let db = &*self.db_pool;
        Ok(ArtFinalistDashboard {
            awaiting_art: summarize(db, queue(OrderStatus::AwaitingArt)).await?,
            my_claimed: summarize(
                db,
                queue(OrderStatus::ArtInProgress).filter(order::Column::ArtFinalistId.eq(user_id)),
            )
            .await?,
            in_review: summarize(db, queue(OrderStatus::ArtReview)).await?,
        })
    }

    async fn production(&self) -> Result<ProductionDashboard, ServiceError> {
        let db = &*self.db_pool;
        let today = Utc::now().date_naive();
        Ok(ProductionDashboard {
            art_approved: summarize(db, queue(OrderStatus::ArtApproved)).await?,
            in_production: summarize(db, queue(OrderStatus::InProduction)).await?,
            ready: summarize(db, queue(OrderStatus::Ready)).await?,
            due_soon: summarize(db, deliveries_between(today, today + Duration::days(UPCOMING_DAYS))).await?,
            low_stock_products: low_stock_count(db).await?,
        })
    }

    async fn manager(&self) -> Result<ManagerDashboard, ServiceError> {
        let db = &*self.db_pool;
        let today = Utc::now().date_naive();
        let month_start = today.with_day(1).unwrap_or(today);

        let orders = sale_orders(db, month_start, today).await?;
        let names = user_names(db, orders.iter().map(|o| o.seller_id)).await?;
        let month = build_sales_report(month_start, today, &orders, &names);

        let (receivables_open, receivables_overdue) = self.finance.open_receivables().await?;
        let (payables_due_soon_count, payables_due_soon_amount) =
            self.finance.payables_due_within(UPCOMING_DAYS).await?;

        Ok(ManagerDashboard {
            month_revenue: month.revenue,
            orders_by_status: status_counts(db, None).await?,
            receivables_open,
            receivables_overdue,
            payables_due_soon_count,
            payables_due_soon_amount,
            low_stock_products: low_stock_count(db).await?,
            seller_ranking: month.by_seller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_serializes_with_kind_tag() {
        let dashboard = Dashboard::ArtFinalist(ArtFinalistDashboard {
            awaiting_art: vec![],
            my_claimed: vec![],
            in_review: vec![],
        });
        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["kind"], "art_finalist");
        assert!(json["data"]["awaiting_art"].as_array().unwrap().is_empty());
    }
}
