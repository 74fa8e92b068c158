use super::{orders::start_of_day, page_bounds};
use crate::{
    cache::{query::REPORT_PREFIX, QueryCache},
    db::DbPool,
    entities::{
        client, order,
        payable::{self, ActiveModel as PayableActiveModel, Entity as PayableEntity, Model as PayableModel},
        receivable::{
            self, ActiveModel as ReceivableActiveModel, EntryStatus, Entity as ReceivableEntity,
            Model as ReceivableModel,
        },
    },
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReceivableRequest {
    /// Defaults to the order's client when `order_id` is given
    pub client_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    #[validate(length(min = 1, max = 300, message = "Description is required"))]
    pub description: String,
    /// Defaults to the order total when `order_id` is given
    pub amount: Option<Decimal>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePayableRequest {
    #[validate(length(min = 1, max = 200, message = "Supplier is required"))]
    pub supplier: String,
    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, max = 300, message = "Description is required"))]
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<EntryStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Open entries whose due date has passed
    pub overdue: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EntryTotals {
    pub open: Decimal,
    pub overdue: Decimal,
    pub paid: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FinanceSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub receivables: EntryTotals,
    pub payables: EntryTotals,
    /// Paid receivables minus paid payables
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CashFlowMonth {
    pub month: u32,
    pub paid_in: Decimal,
    pub paid_out: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CashFlow {
    pub year: i32,
    pub months: Vec<CashFlowMonth>,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net: Decimal,
}

/// The parts of a receivable or payable that the totals look at.
#[derive(Debug, Clone, Copy)]
pub struct EntryView {
    pub status: EntryStatus,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&ReceivableModel> for EntryView {
    fn from(m: &ReceivableModel) -> Self {
        Self {
            status: m.status,
            amount: m.amount,
            due_date: m.due_date,
            paid_at: m.paid_at,
        }
    }
}

impl From<&PayableModel> for EntryView {
    fn from(m: &PayableModel) -> Self {
        Self {
            status: m.status,
            amount: m.amount,
            due_date: m.due_date,
            paid_at: m.paid_at,
        }
    }
}

/// Open and overdue amounts go by due date, paid amounts by payment date;
/// both bounds are inclusive.
pub fn totals_for(entries: &[EntryView], from: NaiveDate, to: NaiveDate, today: NaiveDate) -> EntryTotals {
    entries.iter().fold(EntryTotals::default(), |mut acc, e| {
        match e.status {
            EntryStatus::Open if e.due_date >= from && e.due_date <= to => {
                acc.open += e.amount;
                if e.due_date < today {
                    acc.overdue += e.amount;
                }
            }
            EntryStatus::Paid => {
                if let Some(paid) = e.paid_at.map(|p| p.date_naive()) {
                    if paid >= from && paid <= to {
                        acc.paid += e.amount;
                    }
                }
            }
            _ => {}
        }
        acc
    })
}

/// Twelve months of paid-in and paid-out for `year`.
pub fn cash_flow_for(year: i32, paid_in: &[EntryView], paid_out: &[EntryView]) -> CashFlow {
    let mut months: Vec<CashFlowMonth> = (1..=12)
        .map(|month| CashFlowMonth {
            month,
            paid_in: Decimal::ZERO,
            paid_out: Decimal::ZERO,
            net: Decimal::ZERO,
        })
        .collect();

    let paid_month = |e: &EntryView| {
        e.paid_at
            .filter(|p| e.status == EntryStatus::Paid && p.year() == year)
            .map(|p| p.month0() as usize)
    };
    for entry in paid_in {
        if let Some(m) = paid_month(entry) {
            months[m].paid_in += entry.amount;
        }
    }
    for entry in paid_out {
        if let Some(m) = paid_month(entry) {
            months[m].paid_out += entry.amount;
        }
    }
    for m in months.iter_mut() {
        m.net = m.paid_in - m.paid_out;
    }

    let total_in: Decimal = months.iter().map(|m| m.paid_in).sum();
    let total_out: Decimal = months.iter().map(|m| m.paid_out).sum();
    CashFlow {
        year,
        months,
        total_in,
        total_out,
        net: total_in - total_out,
    }
}

/// The guarded settle found no open row: someone settled it first.
fn settle_error(e: DbErr, what: &str, id: Uuid) -> ServiceError {
    match e {
        DbErr::RecordNotUpdated => {
            ServiceError::InvalidOperation(format!("{} {} was settled concurrently", what, id))
        }
        other => ServiceError::DatabaseError(other),
    }
}

fn ensure_open(status: EntryStatus, what: &str, id: Uuid) -> Result<(), ServiceError> {
    if status == EntryStatus::Open {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "{} {} is already {}",
            what,
            id,
            status.as_ref()
        )))
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), ServiceError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Amount must be greater than zero".to_string(),
        ))
    }
}

fn validate_period(from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
    if from > to {
        return Err(ServiceError::ValidationError(
            "'from' must not be after 'to'".to_string(),
        ));
    }
    Ok(())
}

/// Filters shared by the receivable and payable lists. `$col` is the
/// entity's column enum.
macro_rules! entry_filters {
    ($select:expr, $col:ident, $query:expr, $today:expr) => {{
        let mut select = $select;
        if let Some(status) = $query.status {
            select = select.filter($col::Status.eq(status));
        }
        if let Some(from) = $query.due_from {
            select = select.filter($col::DueDate.gte(from));
        }
        if let Some(to) = $query.due_to {
            select = select.filter($col::DueDate.lte(to));
        }
        match $query.overdue {
            Some(true) => {
                select = select
                    .filter($col::Status.eq(EntryStatus::Open))
                    .filter($col::DueDate.lt($today));
            }
            Some(false) => {
                select = select.filter(
                    Condition::any()
                        .add($col::Status.ne(EntryStatus::Open))
                        .add($col::DueDate.gte($today)),
                );
            }
            None => {}
        }
        select
    }};
}

#[derive(Clone)]
pub struct FinanceService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
    max_page_size: u64,
}

impl FinanceService {
    pub fn new(db_pool: Arc<DbPool>, cache: QueryCache, max_page_size: u64) -> Self {
        Self {
            db_pool,
            cache,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(order_id = ?request.order_id))]
    pub async fn create_receivable(
        &self,
        request: CreateReceivableRequest,
    ) -> Result<ReceivableModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let order = match request.order_id {
            Some(order_id) => Some(
                order::Entity::find_by_id(order_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?,
            ),
            None => None,
        };

        let client_id = request
            .client_id
            .or_else(|| order.as_ref().map(|o| o.client_id))
            .ok_or_else(|| {
                ServiceError::ValidationError("client_id or order_id is required".to_string())
            })?;
        if let Some(o) = &order {
            if o.client_id != client_id {
                return Err(ServiceError::ValidationError(format!(
                    "Order {} belongs to a different client",
                    o.order_number
                )));
            }
        }
        client::Entity::find_by_id(client_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;

        let amount = request
            .amount
            .or_else(|| order.as_ref().map(|o| o.total_amount))
            .ok_or_else(|| ServiceError::ValidationError("Amount is required".to_string()))?;
        ensure_positive(amount)?;

        let model = ReceivableActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(client_id),
            order_id: Set(request.order_id),
            description: Set(request.description.trim().to_string()),
            amount: Set(amount),
            due_date: Set(request.due_date),
            status: Set(EntryStatus::Open),
            paid_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        self.cache.invalidate_aggregates().await;
        info!(receivable_id = %model.id, amount = %model.amount, "Receivable created");
        Ok(model)
    }

    pub async fn list_receivables(
        &self,
        query: &EntryListQuery,
        default_limit: u64,
    ) -> Result<(Vec<ReceivableModel>, u64), ServiceError> {
        let (page, limit) = page_bounds(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(default_limit),
            self.max_page_size,
        );
        let today = Utc::now().date_naive();
        use receivable::Column as Col;
        let paginator = entry_filters!(ReceivableEntity::find(), Col, query, today)
            .order_by_asc(Col::DueDate)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    pub async fn mark_receivable_paid(&self, id: Uuid) -> Result<ReceivableModel, ServiceError> {
        self.settle_receivable(id, EntryStatus::Paid).await
    }

    pub async fn cancel_receivable(&self, id: Uuid) -> Result<ReceivableModel, ServiceError> {
        self.settle_receivable(id, EntryStatus::Cancelled).await
    }

    #[instrument(skip(self), fields(receivable_id = %id))]
    async fn settle_receivable(&self, id: Uuid, status: EntryStatus) -> Result<ReceivableModel, ServiceError> {
        let db = &*self.db_pool;
        let existing = ReceivableEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Receivable {} not found", id)))?;
        ensure_open(existing.status, "Receivable", id)?;

        let mut active: ReceivableActiveModel = existing.into();
        active.status = Set(status);
        if status == EntryStatus::Paid {
            active.paid_at = Set(Some(Utc::now()));
        }
        let updated = ReceivableEntity::update(active)
            .filter(receivable::Column::Status.eq(EntryStatus::Open))
            .exec(db)
            .await
            .map_err(|e| settle_error(e, "Receivable", id))?;

        self.cache.invalidate_aggregates().await;
        info!(status = updated.status.as_ref(), "Receivable settled");
        Ok(updated)
    }

    #[instrument(skip(self, request), fields(supplier = %request.supplier))]
    pub async fn create_payable(&self, request: CreatePayableRequest) -> Result<PayableModel, ServiceError> {
        request.validate()?;
        ensure_positive(request.amount)?;

        let model = PayableActiveModel {
            id: Set(Uuid::new_v4()),
            supplier: Set(request.supplier.trim().to_string()),
            category: Set(request.category.trim().to_lowercase()),
            description: Set(request.description.trim().to_string()),
            amount: Set(request.amount),
            due_date: Set(request.due_date),
            status: Set(EntryStatus::Open),
            paid_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        self.cache.invalidate_aggregates().await;
        info!(payable_id = %model.id, amount = %model.amount, "Payable created");
        Ok(model)
    }

    pub async fn list_payables(
        &self,
        query: &EntryListQuery,
        default_limit: u64,
    ) -> Result<(Vec<PayableModel>, u64), ServiceError> {
        let (page, limit) = page_bounds(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(default_limit),
            self.max_page_size,
        );
        let today = Utc::now().date_naive();
        use payable::Column as Col;
        let paginator = entry_filters!(PayableEntity::find(), Col, query, today)
            .order_by_asc(Col::DueDate)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    pub async fn mark_payable_paid(&self, id: Uuid) -> Result<PayableModel, ServiceError> {
        self.settle_payable(id, EntryStatus::Paid).await
    }

    pub async fn cancel_payable(&self, id: Uuid) -> Result<PayableModel, ServiceError> {
        self.settle_payable(id, EntryStatus::Cancelled).await
    }

    #[instrument(skip(self), fields(payable_id = %id))]
    async fn settle_payable(&self, id: Uuid, status: EntryStatus) -> Result<PayableModel, ServiceError> {
        let db = &*self.db_pool;
        let existing = PayableEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payable {} not found", id)))?;
        ensure_open(existing.status, "Payable", id)?;

        let mut active: PayableActiveModel = existing.into();
        active.status = Set(status);
        if status == EntryStatus::Paid {
            active.paid_at = Set(Some(Utc::now()));
        }
        let updated = PayableEntity::update(active)
            .filter(payable::Column::Status.eq(EntryStatus::Open))
            .exec(db)
            .await
            .map_err(|e| settle_error(e, "Payable", id))?;

        self.cache.invalidate_aggregates().await;
        info!(status = updated.status.as_ref(), "Payable settled");
        Ok(updated)
    }

    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> Result<FinanceSummary, ServiceError> {
        validate_period(from, to)?;
        let key = format!("{}finance:summary:{}:{}", REPORT_PREFIX, from, to);
        self.cache
            .remember(&key, None, move || async move {
                let today = Utc::now().date_naive();
                let (receivables, payables) = self.entries_touching(from, to).await?;
                let receivables = totals_for(&receivables, from, to, today);
                let payables = totals_for(&payables, from, to, today);
                Ok::<_, ServiceError>(FinanceSummary {
                    from,
                    to,
                    receivables,
                    payables,
                    balance: receivables.paid - payables.paid,
                })
            })
            .await
    }

    pub async fn cash_flow(&self, year: i32) -> Result<CashFlow, ServiceError> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {}", year)))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {}", year)))?;
        let key = format!("{}finance:cash_flow:{}", REPORT_PREFIX, year);
        self.cache
            .remember(&key, None, move || async move {
                let (receivables, payables) = self.entries_touching(from, to).await?;
                Ok::<_, ServiceError>(cash_flow_for(year, &receivables, &payables))
            })
            .await
    }

    /// Open entries due in the window plus entries paid in it.
    pub(crate) async fn entries_touching(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(Vec<EntryView>, Vec<EntryView>), ServiceError> {
        let db = &*self.db_pool;
        let paid_from = start_of_day(from);
        let paid_to = start_of_day(to) + Duration::days(1);

        let receivables = ReceivableEntity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(receivable::Column::Status.eq(EntryStatus::Open))
                            .add(receivable::Column::DueDate.between(from, to)),
                    )
                    .add(
                        Condition::all()
                            .add(receivable::Column::Status.eq(EntryStatus::Paid))
                            .add(receivable::Column::PaidAt.gte(paid_from))
                            .add(receivable::Column::PaidAt.lt(paid_to)),
                    ),
            )
            .all(db)
            .await?;
        let payables = PayableEntity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(payable::Column::Status.eq(EntryStatus::Open))
                            .add(payable::Column::DueDate.between(from, to)),
                    )
                    .add(
                        Condition::all()
                            .add(payable::Column::Status.eq(EntryStatus::Paid))
                            .add(payable::Column::PaidAt.gte(paid_from))
                            .add(payable::Column::PaidAt.lt(paid_to)),
                    ),
            )
            .all(db)
            .await?;

        Ok((
            receivables.iter().map(EntryView::from).collect(),
            payables.iter().map(EntryView::from).collect(),
        ))
    }

    /// Open receivables overall: (open total, overdue total).
    pub(crate) async fn open_receivables(&self) -> Result<(Decimal, Decimal), ServiceError> {
        let today = Utc::now().date_naive();
        let open = ReceivableEntity::find()
            .filter(receivable::Column::Status.eq(EntryStatus::Open))
            .all(&*self.db_pool)
            .await?;
        let total: Decimal = open.iter().map(|r| r.amount).sum();
        let overdue: Decimal = open
            .iter()
            .filter(|r| r.due_date < today)
            .map(|r| r.amount)
            .sum();
        Ok((total, overdue))
    }

    /// Open payables due from today through `days` ahead.
    pub(crate) async fn payables_due_within(&self, days: i64) -> Result<(u64, Decimal), ServiceError> {
        let today = Utc::now().date_naive();
        let due = PayableEntity::find()
            .filter(payable::Column::Status.eq(EntryStatus::Open))
            .filter(payable::Column::DueDate.between(today, today + Duration::days(days)))
            .all(&*self.db_pool)
            .await?;
        Ok((due.len() as u64, due.iter().map(|p| p.amount).sum()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn losing_a_settle_race_is_an_invalid_operation() {
        let id = Uuid::new_v4();
        assert!(matches!(
            settle_error(DbErr::RecordNotUpdated, "Receivable", id),
            ServiceError::InvalidOperation(_)
        ));
        assert!(matches!(
            settle_error(DbErr::Custom("boom".into()), "Payable", id),
            ServiceError::DatabaseError(_)
        ));
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open(amount: Decimal, due: NaiveDate) -> EntryView {
        EntryView {
            status: EntryStatus::Open,
            amount,
            due_date: due,
            paid_at: None,
        }
    }

    fn paid(amount: Decimal, on: NaiveDate) -> EntryView {
        EntryView {
            status: EntryStatus::Paid,
            amount,
            due_date: on,
            paid_at: Some(Utc.from_utc_datetime(&on.and_hms_opt(15, 30, 0).unwrap())),
        }
    }

    #[test]
    fn totals_split_open_overdue_and_paid() {
        let entries = vec![
            open(dec!(100), date(2026, 5, 2)),
            open(dec!(50), date(2026, 5, 20)),
            open(dec!(999), date(2026, 6, 1)),
            paid(dec!(70), date(2026, 5, 31)),
            paid(dec!(30), date(2026, 4, 30)),
            EntryView {
                status: EntryStatus::Cancelled,
                ..open(dec!(5), date(2026, 5, 3))
            },
        ];
        let totals = totals_for(&entries, date(2026, 5, 1), date(2026, 5, 31), date(2026, 5, 10));
        assert_eq!(totals.open, dec!(150));
        assert_eq!(totals.overdue, dec!(100));
        assert_eq!(totals.paid, dec!(70));
    }

    #[test]
    fn cash_flow_buckets_by_payment_month() {
        let incoming = vec![paid(dec!(200), date(2026, 1, 15)), paid(dec!(50), date(2026, 3, 1))];
        let outgoing = vec![paid(dec!(80), date(2026, 1, 20)), paid(dec!(10), date(2025, 12, 31))];
        let flow = cash_flow_for(2026, &incoming, &outgoing);

        assert_eq!(flow.months.len(), 12);
        assert_eq!(flow.months[0].net, dec!(120));
        assert_eq!(flow.months[2].paid_in, dec!(50));
        assert_eq!(flow.total_out, dec!(80));
        assert_eq!(flow.net, dec!(170));
    }

    #[test]
    fn only_open_entries_can_be_settled() {
        let id = Uuid::new_v4();
        assert!(ensure_open(EntryStatus::Open, "Receivable", id).is_ok());
        assert!(matches!(
            ensure_open(EntryStatus::Paid, "Receivable", id),
            Err(ServiceError::InvalidOperation(_))
        ));
    }

    #[test]
    fn period_must_be_ordered() {
        assert!(validate_period(date(2026, 1, 2), date(2026, 1, 1)).is_err());
        assert!(validate_period(date(2026, 1, 1), date(2026, 1, 1)).is_ok());
    }
}
