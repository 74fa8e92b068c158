use super::{orders::start_of_day, Actor};
use crate::{
    cache::{query::DASHBOARD_PREFIX, QueryCache},
    db::DbPool,
    entities::{
        order,
        sales_goal::{self, ActiveModel as GoalActiveModel, Entity as GoalEntity, Model as GoalModel},
        user, OrderStatus, Role,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertGoalRequest {
    pub seller_id: Uuid,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    pub target_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GoalListQuery {
    pub year: i32,
    pub month: Option<i32>,
    pub seller_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GoalProgressQuery {
    /// Defaults to the caller
    pub seller_id: Option<Uuid>,
    pub year: i32,
    pub month: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GoalProgress {
    pub seller_id: Uuid,
    pub seller_name: String,
    pub year: i32,
    pub month: i32,
    pub target: Decimal,
    pub achieved: Decimal,
    /// achieved / target * 100, two decimals; 0 without a target
    pub percentage: Decimal,
}

/// `[first day of month, first day of next month)` in UTC.
pub fn month_bounds(year: i32, month: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let first = u32::try_from(month)
        .ok()
        .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid month {}-{}", year, month)))?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid month {}-{}", year, month)))?;
    Ok((start_of_day(first), start_of_day(next)))
}

pub fn percentage(achieved: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (achieved * Decimal::ONE_HUNDRED / target).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Total of sale-counting orders created in `[from, to)`, optionally for one seller.
pub(crate) async fn sales_total<C: ConnectionTrait>(
    db: &C,
    seller_id: Option<Uuid>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Decimal, ServiceError> {
    let mut select = order::Entity::find()
        .filter(order::Column::CreatedAt.gte(from))
        .filter(order::Column::CreatedAt.lt(to))
        .filter(order::Column::Status.is_not_in([OrderStatus::Quote, OrderStatus::Cancelled]));
    if let Some(id) = seller_id {
        select = select.filter(order::Column::SellerId.eq(id));
    }
    Ok(select.all(db).await?.iter().map(|o| o.total_amount).sum())
}

#[derive(Clone)]
pub struct GoalService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
}

impl GoalService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache) -> Self {
        Self { db_pool, cache }
    }

    /// One goal per seller and month; a second call replaces the target.
    #[instrument(skip(self, request), fields(seller_id = %request.seller_id, year = request.year, month = request.month))]
    pub async fn upsert_goal(&self, request: UpsertGoalRequest) -> Result<GoalModel, ServiceError> {
        request.validate()?;
        if request.target_amount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "Target amount cannot be negative".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let seller = self.find_seller(request.seller_id).await?;

        let existing = GoalEntity::find()
            .filter(sales_goal::Column::SellerId.eq(seller.id))
            .filter(sales_goal::Column::Year.eq(request.year))
            .filter(sales_goal::Column::Month.eq(request.month))
            .one(db)
            .await?;

        let now = Utc::now();
        let saved = match existing {
            Some(goal) => {
                let mut active: GoalActiveModel = goal.into();
                active.target_amount = Set(request.target_amount);
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                GoalActiveModel {
                    id: Set(Uuid::new_v4()),
                    seller_id: Set(seller.id),
                    year: Set(request.year),
                    month: Set(request.month),
                    target_amount: Set(request.target_amount),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?
            }
        };

        // Seller and manager dashboards show the month's goal
        self.cache.invalidate_prefix(DASHBOARD_PREFIX).await;
        info!(goal_id = %saved.id, target = %saved.target_amount, "Sales goal saved");
        Ok(saved)
    }

    /// Sellers only see their own goals.
    pub async fn list_goals(&self, actor: &Actor, query: &GoalListQuery) -> Result<Vec<GoalModel>, ServiceError> {
        let mut select = GoalEntity::find().filter(sales_goal::Column::Year.eq(query.year));
        if let Some(month) = query.month {
            select = select.filter(sales_goal::Column::Month.eq(month));
        }
        let seller_filter = if actor.is_seller() { Some(actor.id) } else { query.seller_id };
        if let Some(seller_id) = seller_filter {
            select = select.filter(sales_goal::Column::SellerId.eq(seller_id));
        }
        Ok(select
            .order_by_asc(sales_goal::Column::Month)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn progress(
        &self,
        actor: &Actor,
        seller_id: Option<Uuid>,
        year: i32,
        month: i32,
    ) -> Result<GoalProgress, ServiceError> {
        let seller_id = match seller_id {
            Some(id) if actor.is_seller() && id != actor.id => {
                return Err(ServiceError::Forbidden(
                    "Sellers can only see their own goal progress".to_string(),
                ))
            }
            Some(id) => id,
            None => actor.id,
        };
        let (from, to) = month_bounds(year, month)?;
        let db = &*self.db_pool;
        let seller = self.find_seller(seller_id).await?;

        let target = GoalEntity::find()
            .filter(sales_goal::Column::SellerId.eq(seller_id))
            .filter(sales_goal::Column::Year.eq(year))
            .filter(sales_goal::Column::Month.eq(month))
            .one(db)
            .await?
            .map(|g| g.target_amount)
            .unwrap_or_default();
        let achieved = sales_total(db, Some(seller_id), from, to).await?;

        Ok(GoalProgress {
            seller_id,
            seller_name: seller.name,
            year,
            month,
            target,
            achieved,
            percentage: percentage(achieved, target),
        })
    }

    async fn find_seller(&self, seller_id: Uuid) -> Result<user::Model, ServiceError> {
        let seller = user::Entity::find_by_id(seller_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", seller_id)))?;
        if seller.role != Role::Seller {
            return Err(ServiceError::ValidationError(format!(
                "User {} is not a seller",
                seller.name
            )));
        }
        Ok(seller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_of_target() {
        assert_eq!(percentage(dec!(7500), dec!(10000)), dec!(75.00));
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percentage(dec!(12000), dec!(10000)), dec!(120.00));
        assert_eq!(percentage(dec!(500), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn month_bounds_roll_over_december() {
        let (from, to) = month_bounds(2026, 12).unwrap();
        assert_eq!(from.to_rfc3339(), "2026-12-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2027-01-01T00:00:00+00:00");
        assert!(month_bounds(2026, 13).is_err());
        assert!(month_bounds(2026, 0).is_err());
    }
}
