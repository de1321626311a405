//! Moves a paid order out of the active store and into `order_history`.
//!
//! [`archive`] runs on whatever connection it is handed, so the payment flow can
//! execute it inside its own transaction and roll everything back together.

use crate::{
    db::DbPool,
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::order_history::{
        self, ActiveModel as HistoryActiveModel, Entity as HistoryEntity, Model as HistoryModel,
    },
    errors::ServiceError,
    services::orders::{delete_order, order_not_found},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const ARCHIVE_COMMENT: &str = "Order paid and archived";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address_id: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub is_cancelled: bool,
    pub cancel_reason: Option<String>,
    pub comment: String,
    pub updated_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub changed_at: DateTime<Utc>,
}

impl From<HistoryModel> for HistoryResponse {
    fn from(model: HistoryModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            address_id: model.address_id,
            order_date: model.order_date,
            status: model.status,
            total_amount: model.total_amount,
            is_cancelled: model.is_cancelled,
            cancel_reason: model.cancel_reason,
            comment: model.comment,
            updated_by: model.updated_by,
            updated_at: model.updated_at,
            changed_at: model.changed_at,
        }
    }
}

/// Copies a completed order into history and deletes the active row.
///
/// Only a completed, uncancelled order that has never been archived qualifies.
#[instrument(skip(conn))]
pub async fn archive<C>(conn: &C, order_id: Uuid, actor: &str) -> Result<HistoryModel, ServiceError>
where
    C: ConnectionTrait,
{
    let order = OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

    if order.is_cancelled {
        warn!(%order_id, "Archival rejected: order is cancelled");
        return Err(ServiceError::StateViolation(format!(
            "Order {} is cancelled and cannot be archived",
            order_id
        )));
    }
    if order.status != OrderStatus::Completed {
        warn!(%order_id, status = %order.status, "Archival rejected: order not completed");
        return Err(ServiceError::StateViolation(format!(
            "Order {} must be completed before it is archived",
            order_id
        )));
    }

    let already_archived = HistoryEntity::find()
        .filter(order_history::Column::OrderId.eq(order_id))
        .count(conn)
        .await?;
    if already_archived > 0 {
        return Err(ServiceError::StateViolation(format!(
            "Order {} is already archived",
            order_id
        )));
    }

    let history = HistoryActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        user_id: Set(order.user_id),
        address_id: Set(order.address_id.clone()),
        order_date: Set(order.order_date),
        status: Set(OrderStatus::Completed),
        total_amount: Set(order.total_amount),
        is_cancelled: Set(order.is_cancelled),
        cancel_reason: Set(order.cancel_reason.clone()),
        comment: Set(ARCHIVE_COMMENT.to_string()),
        updated_by: Set(actor.to_string()),
        updated_at: Set(order.updated_at),
        changed_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, %order_id, "Failed to insert order history");
        ServiceError::DatabaseError(e)
    })?;

    delete_order(conn, order_id).await?;

    info!(%order_id, history_id = %history.id, "Order archived");
    Ok(history)
}

/// Read side of the archive.
#[derive(Clone)]
pub struct HistoryService {
    db_pool: Arc<DbPool>,
}

impl HistoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Archived orders of a user, most recently archived first.
    #[instrument(skip(self))]
    pub async fn list_history(&self, user_id: Uuid) -> Result<Vec<HistoryModel>, ServiceError> {
        HistoryEntity::find()
            .filter(order_history::Column::UserId.eq(user_id))
            .order_by_desc(order_history::Column::ChangedAt)
            .all(&*self.db_pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::ActiveModel as OrderActiveModel;
    use crate::services::test_support;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use sea_orm::TransactionTrait;

    async fn insert_order(
        db: &DbPool,
        user_id: Uuid,
        status: OrderStatus,
        is_cancelled: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        OrderActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            address_id: Set("ADDR1001".into()),
            total_amount: Set(dec!(240)),
            status: Set(status),
            is_cancelled: Set(is_cancelled),
            cancel_reason: Set(is_cancelled.then(|| "Changed my mind".to_string())),
            order_date: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn completed_order_moves_to_history() {
        let ctx = test_support::setup().await;
        let user = test_support::insert_user(&ctx.db, "Asha").await;
        let order_id = insert_order(&ctx.db, user.id, OrderStatus::Completed, false).await;

        let history = archive(&*ctx.db, order_id, "Asha").await.unwrap();
        assert_eq!(history.order_id, order_id);
        assert_eq!(history.status, OrderStatus::Completed);
        assert_eq!(history.total_amount, dec!(240));
        assert_eq!(history.comment, ARCHIVE_COMMENT);
        assert_eq!(history.updated_by, "Asha");
        assert!(history.updated_at.is_some());

        assert!(OrderEntity::find_by_id(order_id)
            .one(&*ctx.db)
            .await
            .unwrap()
            .is_none());

        let listed = HistoryService::new(ctx.db.clone())
            .list_history(user.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn pending_and_cancelled_orders_are_not_archived() {
        let ctx = test_support::setup().await;
        let user = test_support::insert_user(&ctx.db, "Asha").await;
        let pending = insert_order(&ctx.db, user.id, OrderStatus::Pending, false).await;
        let cancelled = insert_order(&ctx.db, user.id, OrderStatus::Pending, true).await;

        assert_matches!(
            archive(&*ctx.db, pending, "Asha").await,
            Err(ServiceError::StateViolation(_))
        );
        assert_matches!(
            archive(&*ctx.db, cancelled, "Asha").await,
            Err(ServiceError::StateViolation(_))
        );
        assert_matches!(
            archive(&*ctx.db, Uuid::new_v4(), "Asha").await,
            Err(ServiceError::NotFound(_))
        );
        assert_eq!(HistoryEntity::find().count(&*ctx.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn order_id_already_in_history_is_rejected() {
        let ctx = test_support::setup().await;
        let user = test_support::insert_user(&ctx.db, "Asha").await;
        let order_id = insert_order(&ctx.db, user.id, OrderStatus::Completed, false).await;
        let first = archive(&*ctx.db, order_id, "Asha").await.unwrap();

        // Re-insert a row with the same id to simulate a stale active copy.
        OrderActiveModel {
            id: Set(order_id),
            user_id: Set(user.id),
            address_id: Set(first.address_id.clone()),
            total_amount: Set(first.total_amount),
            status: Set(OrderStatus::Completed),
            is_cancelled: Set(false),
            cancel_reason: Set(None),
            order_date: Set(first.order_date),
            updated_at: Set(None),
        }
        .insert(&*ctx.db)
        .await
        .unwrap();

        assert_matches!(
            archive(&*ctx.db, order_id, "Asha").await,
            Err(ServiceError::StateViolation(_))
        );
    }

    #[tokio::test]
    async fn rolled_back_archive_leaves_order_active() {
        let ctx = test_support::setup().await;
        let user = test_support::insert_user(&ctx.db, "Asha").await;
        let order_id = insert_order(&ctx.db, user.id, OrderStatus::Completed, false).await;

        let txn = ctx.db.begin().await.unwrap();
        archive(&txn, order_id, "Asha").await.unwrap();
        txn.rollback().await.unwrap();

        assert!(OrderEntity::find_by_id(order_id)
            .one(&*ctx.db)
            .await
            .unwrap()
            .is_some());
        assert_eq!(HistoryEntity::find().count(&*ctx.db).await.unwrap(), 0);
    }
}
