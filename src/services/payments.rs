use crate::{
    db::DbPool,
    entities::order::{
        ActiveModel as OrderActiveModel, Entity as OrderEntity, OrderState, OrderStatus,
    },
    entities::payment::{
        self, ActiveModel as PaymentActiveModel, Entity as PaymentEntity, Model as PaymentModel,
        PaymentMethod, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::archival::{self, HistoryResponse},
    services::orders::order_not_found,
    services::users::UserProfile,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub transaction_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
}

impl From<PaymentModel> for PaymentResponse {
    fn from(model: PaymentModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            method: model.method,
            transaction_id: model.transaction_id,
            amount: model.amount,
            status: model.status,
            payment_date: model.payment_date,
        }
    }
}

/// Result of a successful payment: the payment row and the archived order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentReceipt {
    pub payment: PaymentResponse,
    pub history: HistoryResponse,
}

/// `TXN_` followed by 12 upper-case hex digits.
pub fn generate_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN_{}", &hex[..12])
}

/// Records simulated payments and completes the order lifecycle.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Pays for an order and archives it.
    ///
    /// Payment insert, completion, archival and removal from the active store
    /// commit together; on any error none of them is visible.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn pay_order(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        actor: &UserProfile,
    ) -> Result<PaymentReceipt, ServiceError> {
        let result = self.settle(order_id, method, actor).await;
        if let Err(e) = &result {
            metrics::record_failure("pay_order", e);
        }
        result
    }

    async fn settle(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        actor: &UserProfile,
    ) -> Result<PaymentReceipt, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for payment");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        // Someone else's order is reported as missing
        if order.user_id != actor.id {
            warn!(%order_id, "Payment rejected: order belongs to another user");
            return Err(order_not_found(order_id));
        }
        if !order.is_payable() {
            let state = order.state();
            warn!(%order_id, %state, "Payment rejected: order is not payable");
            return Err(ServiceError::StateViolation(match state {
                OrderState::Cancelled => {
                    format!("Order {} is cancelled and cannot be paid", order_id)
                }
                _ => format!("Order {} is already paid", order_id),
            }));
        }

        let now = Utc::now();
        let amount = order.total_amount;
        let payment = PaymentActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            user_id: Set(actor.id),
            method: Set(method),
            transaction_id: Set(generate_transaction_id()),
            amount: Set(amount),
            status: Set(PaymentStatus::Success),
            payment_date: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "Failed to insert payment");
            ServiceError::DatabaseError(e)
        })?;

        let mut completed: OrderActiveModel = order.into();
        completed.status = Set(OrderStatus::Completed);
        completed.updated_at = Set(Some(now));
        completed.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to mark order completed");
            ServiceError::DatabaseError(e)
        })?;

        let history = archival::archive(&txn, order_id, &actor.full_name).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to commit payment");
            ServiceError::DatabaseError(e)
        })?;

        metrics::PAYMENTS_RECORDED.inc();
        metrics::ORDERS_ARCHIVED.inc();
        self.event_sender
            .send_or_log(Event::PaymentRecorded {
                order_id,
                transaction_id: payment.transaction_id.clone(),
                method,
                amount,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderArchived {
                order_id,
                updated_by: history.updated_by.clone(),
            })
            .await;

        info!(
            %order_id,
            transaction_id = %payment.transaction_id,
            %amount,
            "Payment completed and order archived"
        );
        Ok(PaymentReceipt {
            payment: payment.into(),
            history: history.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn payments_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentModel>, ServiceError> {
        PaymentEntity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_asc(payment::Column::PaymentDate)
            .all(&*self.db_pool)
            .await
            .map_err(Into::into)
    }
}
