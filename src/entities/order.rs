use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Persisted status of an active order. Cancellation is a flag, not a status.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    #[strum(serialize = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    #[strum(serialize = "COMPLETED")]
    Completed,
}

/// Lifecycle state derived from a stored row.
///
/// `Archived` never comes out of [`OrderState::of`]: an archived order only
/// exists in `order_history`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    Cancelled,
    Completed,
    Archived,
}

impl OrderState {
    pub fn of(order: &Model) -> Self {
        if order.is_cancelled {
            Self::Cancelled
        } else {
            match order.status {
                OrderStatus::Pending => Self::Pending,
                OrderStatus::Completed => Self::Completed,
            }
        }
    }

    /// Only a live, unpaid order may be paid or cancelled.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// The `orders` table: orders that have not been archived yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub is_cancelled: bool,
    pub cancel_reason: Option<String>,
    pub order_date: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn state(&self) -> OrderState {
        OrderState::of(self)
    }

    /// Neither cancelled nor already paid.
    pub fn is_payable(&self) -> bool {
        self.state().is_open()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
