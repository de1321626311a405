use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "UPI")]
    #[serde(rename = "UPI")]
    #[strum(serialize = "UPI", ascii_case_insensitive)]
    Upi,
    #[sea_orm(string_value = "Card")]
    #[strum(serialize = "Card", ascii_case_insensitive)]
    Card,
    #[sea_orm(string_value = "Wallet")]
    #[strum(serialize = "Wallet", ascii_case_insensitive)]
    Wallet,
}

/// Payments are simulated and always succeed.
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
pub enum PaymentStatus {
    #[sea_orm(string_value = "SUCCESS")]
    #[serde(rename = "SUCCESS")]
    #[strum(serialize = "SUCCESS")]
    Success,
}

/// The `payments` table. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub method: PaymentMethod,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn payment_method_parses_case_insensitively() {
        assert_eq!(PaymentMethod::from_str("upi").unwrap(), PaymentMethod::Upi);
        assert_eq!(PaymentMethod::from_str("Card").unwrap(), PaymentMethod::Card);
        assert_eq!(
            PaymentMethod::from_str("WALLET").unwrap(),
            PaymentMethod::Wallet
        );
        assert!(PaymentMethod::from_str("cash").is_err());
    }

    #[test]
    fn payment_method_json_uses_display_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"UPI\"");
        let parsed: PaymentMethod = serde_json::from_str("\"Wallet\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Wallet);
    }
}
