//! Sales reports. Every result goes through the query cache under the
//! `report:` prefix, which order and finance writes invalidate.

use super::orders::start_of_day;
use crate::{
    cache::{query::REPORT_PREFIX, QueryCache},
    db::DbPool,
    entities::{client, order::Model as OrderModel, order, user, OrderStatus},
    errors::ServiceError,
};
use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const MAX_TOP_CLIENTS: u64 = 100;

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Only for top clients; defaults to 10
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SellerSales {
    pub seller_id: Uuid,
    pub seller_name: String,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusSales {
    pub status: OrderStatus,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SalesReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub order_count: u64,
    pub revenue: Decimal,
    pub average_ticket: Decimal,
    /// Highest revenue first
    pub by_seller: Vec<SellerSales>,
    pub by_status: Vec<StatusSales>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClientSales {
    pub client_id: Uuid,
    pub client_name: String,
    pub orders: u64,
    pub revenue: Decimal,
}

pub fn average_ticket(revenue: Decimal, orders: u64) -> Decimal {
    if orders == 0 {
        return Decimal::ZERO;
    }
    (revenue / Decimal::from(orders)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Aggregate already-filtered sale orders.
pub fn build_sales_report(
    from: NaiveDate,
    to: NaiveDate,
    orders: &[OrderModel],
    seller_names: &HashMap<Uuid, String>,
) -> SalesReport {
    let revenue: Decimal = orders.iter().map(|o| o.total_amount).sum();

    let mut per_seller: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
    let mut per_status: HashMap<OrderStatus, (u64, Decimal)> = HashMap::new();
    for o in orders {
        let seller = per_seller.entry(o.seller_id).or_default();
        seller.0 += 1;
        seller.1 += o.total_amount;
        let status = per_status.entry(o.status).or_default();
        status.0 += 1;
        status.1 += o.total_amount;
    }

    let mut by_seller: Vec<SellerSales> = per_seller
        .into_iter()
        .map(|(seller_id, (orders, revenue))| SellerSales {
            seller_id,
            seller_name: seller_names.get(&seller_id).cloned().unwrap_or_default(),
            orders,
            revenue,
        })
        .collect();
    by_seller.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.seller_name.cmp(&b.seller_name))
    });

    let mut by_status: Vec<StatusSales> = per_status
        .into_iter()
        .map(|(status, (orders, revenue))| StatusSales {
            status,
            orders,
            revenue,
        })
        .collect();
    by_status.sort_by(|a, b| a.status.as_ref().cmp(b.status.as_ref()));

    SalesReport {
        from,
        to,
        order_count: orders.len() as u64,
        revenue,
        average_ticket: average_ticket(revenue, orders.len() as u64),
        by_seller,
        by_status,
    }
}

pub fn rank_clients(
    orders: &[OrderModel],
    client_names: &HashMap<Uuid, String>,
    limit: usize,
) -> Vec<ClientSales> {
    let mut per_client: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
    for o in orders {
        let entry = per_client.entry(o.client_id).or_default();
        entry.0 += 1;
        entry.1 += o.total_amount;
    }
    let mut ranked: Vec<ClientSales> = per_client
        .into_iter()
        .map(|(client_id, (orders, revenue))| ClientSales {
            client_id,
            client_name: client_names.get(&client_id).cloned().unwrap_or_default(),
            orders,
            revenue,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.client_name.cmp(&b.client_name))
    });
    ranked.truncate(limit);
    ranked
}

fn validate_period(from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
    if from > to {
        return Err(ServiceError::ValidationError(
            "'from' must not be after 'to'".to_string(),
        ));
    }
    Ok(())
}

/// Orders created between the two dates (inclusive) that count as sales.
pub(crate) async fn sale_orders<C: ConnectionTrait>(
    db: &C,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<OrderModel>, ServiceError> {
    Ok(order::Entity::find()
        .filter(order::Column::CreatedAt.gte(start_of_day(from)))
        .filter(order::Column::CreatedAt.lt(start_of_day(to) + Duration::days(1)))
        .filter(order::Column::Status.is_not_in([OrderStatus::Quote, OrderStatus::Cancelled]))
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await?)
}

pub(crate) async fn user_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

pub(crate) async fn client_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(client::Entity::find()
        .filter(client::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache) -> Self {
        Self { db_pool, cache }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(&self, from: NaiveDate, to: NaiveDate) -> Result<SalesReport, ServiceError> {
        validate_period(from, to)?;
        let key = format!("{}sales:{}:{}", REPORT_PREFIX, from, to);
        self.cache
            .remember(&key, None, move || async move {
                let db = &*self.db_pool;
                let orders = sale_orders(db, from, to).await?;
                let names = user_names(db, orders.iter().map(|o| o.seller_id)).await?;
                debug!(orders = orders.len(), "Building sales report");
                Ok::<_, ServiceError>(build_sales_report(from, to, &orders, &names))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn top_clients(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: Option<u64>,
    ) -> Result<Vec<ClientSales>, ServiceError> {
        validate_period(from, to)?;
        let limit = limit.unwrap_or(10).clamp(1, MAX_TOP_CLIENTS);
        let key = format!("{}top_clients:{}:{}:{}", REPORT_PREFIX, from, to, limit);
        self.cache
            .remember(&key, None, move || async move {
                let db = &*self.db_pool;
                let orders = sale_orders(db, from, to).await?;
                let names = client_names(db, orders.iter().map(|o| o.client_id)).await?;
                Ok::<_, ServiceError>(rank_clients(&orders, &names, limit as usize))
            })
            .await
    }

    /// One CSV row per sale order in the period.
    #[instrument(skip(self))]
    pub async fn export_sales_csv(&self, from: NaiveDate, to: NaiveDate) -> Result<String, ServiceError> {
        validate_period(from, to)?;
        let key = format!("{}sales_csv:{}:{}", REPORT_PREFIX, from, to);
        self.cache
            .remember(&key, None, move || async move {
                let db = &*self.db_pool;
                let orders = sale_orders(db, from, to).await?;
                let sellers = user_names(db, orders.iter().map(|o| o.seller_id)).await?;
                let clients = client_names(db, orders.iter().map(|o| o.client_id)).await?;
                sales_csv(&orders, &clients, &sellers)
            })
            .await
    }
}

pub fn sales_csv(
    orders: &[OrderModel],
    client_names: &HashMap<Uuid, String>,
    seller_names: &HashMap<Uuid, String>,
) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| ServiceError::SerializationError(e.to_string());

    writer
        .write_record([
            "order_number",
            "created_at",
            "client",
            "seller",
            "status",
            "subtotal",
            "discount",
            "total_amount",
            "delivery_date",
        ])
        .map_err(csv_err)?;
    for o in orders {
        writer
            .write_record([
                o.order_number.clone(),
                o.created_at.format("%Y-%m-%d").to_string(),
                client_names.get(&o.client_id).cloned().unwrap_or_default(),
                seller_names.get(&o.seller_id).cloned().unwrap_or_default(),
                o.status.as_ref().to_string(),
                o.subtotal.round_dp(2).to_string(),
                o.discount.round_dp(2).to_string(),
                o.total_amount.round_dp(2).to_string(),
                o.delivery_date.map(|d| d.to_string()).unwrap_or_default(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sale(seller_id: Uuid, client_id: Uuid, status: OrderStatus, total: Decimal) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            order_number: format!("OS-2026-{}", total),
            client_id,
            seller_id,
            art_finalist_id: None,
            status,
            subtotal: total,
            discount: Decimal::ZERO,
            total_amount: total,
            delivery_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn sales_report_groups_by_seller_and_status() {
        let ana = Uuid::new_v4();
        let bruno = Uuid::new_v4();
        let client = Uuid::new_v4();
        let orders = vec![
            sale(ana, client, OrderStatus::Approved, dec!(100)),
            sale(bruno, client, OrderStatus::Delivered, dec!(300)),
            sale(ana, client, OrderStatus::Delivered, dec!(50)),
        ];
        let names = HashMap::from([(ana, "Ana".to_string()), (bruno, "Bruno".to_string())]);

        let report = build_sales_report(date(1), date(31), &orders, &names);
        assert_eq!(report.order_count, 3);
        assert_eq!(report.revenue, dec!(450));
        assert_eq!(report.average_ticket, dec!(150));
        assert_eq!(report.by_seller[0].seller_name, "Bruno");
        assert_eq!(report.by_seller[1].orders, 2);
        assert_eq!(report.by_seller[1].revenue, dec!(150));

        let delivered = report
            .by_status
            .iter()
            .find(|s| s.status == OrderStatus::Delivered)
            .unwrap();
        assert_eq!(delivered.orders, 2);
    }

    #[test]
    fn empty_period_has_zero_ticket() {
        let report = build_sales_report(date(1), date(2), &[], &HashMap::new());
        assert_eq!(report.average_ticket, Decimal::ZERO);
        assert!(report.by_seller.is_empty());
    }

    #[test]
    fn top_clients_are_ranked_and_truncated() {
        let seller = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let orders = vec![
            sale(seller, a, OrderStatus::Ready, dec!(10)),
            sale(seller, b, OrderStatus::Ready, dec!(500)),
            sale(seller, c, OrderStatus::Ready, dec!(40)),
            sale(seller, a, OrderStatus::Ready, dec!(45)),
        ];
        let ranked = rank_clients(&orders, &HashMap::new(), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].client_id, b);
        assert_eq!(ranked[1].client_id, a);
        assert_eq!(ranked[1].revenue, dec!(55));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let seller = Uuid::new_v4();
        let client = Uuid::new_v4();
        let orders = vec![sale(seller, client, OrderStatus::Delivered, dec!(99.9))];
        let clients = HashMap::from([(client, "Clube Náutico, Recife".to_string())]);
        let csv = sales_csv(&orders, &clients, &HashMap::new()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("order_number,created_at,client"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Clube Náutico, Recife\""));
        assert!(row.contains("delivered"));
        assert!(row.contains("99.9"));
    }
}
