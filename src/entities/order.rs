use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// An OS (service order): the customer order moving from quote to delivery.
#[derive(
    Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema,
)]
#[sea_orm(table_name = "orders")]
#[schema(as = Order)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 32,
        message = "Order number must be between 1 and 32 characters"
    ))]
    #[sea_orm(unique)]
    pub order_number: String,

    pub client_id: Uuid,
    pub seller_id: Uuid,
    #[sea_orm(nullable)]
    pub art_finalist_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    #[sea_orm(nullable)]
    pub delivery_date: Option<NaiveDate>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-lock counter, bumped on every write
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::art_version::Entity")]
    ArtVersions,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::art_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArtVersions.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::AsRefStr,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "quote")]
    Quote,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "awaiting_art")]
    AwaitingArt,
    #[sea_orm(string_value = "art_in_progress")]
    ArtInProgress,
    #[sea_orm(string_value = "art_review")]
    ArtReview,
    #[sea_orm(string_value = "art_approved")]
    ArtApproved,
    #[sea_orm(string_value = "in_production")]
    InProduction,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Header fields and items may only change before art work starts.
    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Quote | OrderStatus::Approved)
    }

    /// Orders past the quote stage and not cancelled count as sales.
    pub fn counts_as_sale(&self) -> bool {
        !matches!(self, OrderStatus::Quote | OrderStatus::Cancelled)
    }
}
