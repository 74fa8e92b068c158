use super::{orders::visible_to, reports::client_names, Actor};
use crate::{
    db::DbPool,
    entities::{order, order::Model as OrderModel, OrderStatus},
    errors::ServiceError,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Longest window, in days, a single calendar request may cover.
pub const MAX_WINDOW_DAYS: i64 = 92;

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryEntry {
    pub order_id: Uuid,
    pub order_number: String,
    pub client_name: String,
    pub status: OrderStatus,
    /// Past its delivery date and still not delivered
    pub late: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryDay {
    pub date: NaiveDate,
    pub orders: Vec<DeliveryEntry>,
}

pub fn validate_window(from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
    if from > to {
        return Err(ServiceError::ValidationError(
            "'from' must not be after 'to'".to_string(),
        ));
    }
    if (to - from).num_days() + 1 > MAX_WINDOW_DAYS {
        return Err(ServiceError::ValidationError(format!(
            "Calendar window is limited to {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(())
}

pub fn is_late(delivery_date: NaiveDate, status: OrderStatus, today: NaiveDate) -> bool {
    delivery_date < today && !status.is_terminal()
}

/// Bucket orders by delivery date, earliest day first.
pub fn group_by_day(
    orders: Vec<OrderModel>,
    client_names: &HashMap<Uuid, String>,
    today: NaiveDate,
) -> Vec<DeliveryDay> {
    let mut days: BTreeMap<NaiveDate, Vec<DeliveryEntry>> = BTreeMap::new();
    for o in orders {
        let Some(date) = o.delivery_date else {
            continue;
        };
        days.entry(date).or_default().push(DeliveryEntry {
            order_id: o.id,
            client_name: client_names.get(&o.client_id).cloned().unwrap_or_default(),
            late: is_late(date, o.status, today),
            order_number: o.order_number,
            status: o.status,
        });
    }
    days.into_iter()
        .map(|(date, orders)| DeliveryDay { date, orders })
        .collect()
}

#[derive(Clone)]
pub struct CalendarService {
    db_pool: Arc<DbPool>,
}

impl CalendarService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Orders due in `[from, to]`; cancelled orders are left out.
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn deliveries(
        &self,
        actor: &Actor,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DeliveryDay>, ServiceError> {
        validate_window(from, to)?;
        let db = &*self.db_pool;

        let orders = visible_to(order::Entity::find(), actor)
            .filter(order::Column::DeliveryDate.between(from, to))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .order_by_asc(order::Column::DeliveryDate)
            .order_by_asc(order::Column::OrderNumber)
            .all(db)
            .await?;
        let names = client_names(db, orders.iter().map(|o| o.client_id)).await?;

        Ok(group_by_day(orders, &names, Utc::now().date_naive()))
    }
}
