use crate::{
    catalog::Catalog,
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderState, OrderStatus,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 64, message = "Address ID is required"))]
    pub address_id: String,
    /// Product name to quantity.
    pub items: BTreeMap<String, i32>,
}

/// Preset cancellation reasons offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelReasonKind {
    ChangedMyMind,
    OrderedByMistake,
    FoundBetterPrice,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    ChangedMyMind,
    OrderedByMistake,
    FoundBetterPrice,
    Other(String),
}

impl CancelReason {
    pub fn from_parts(kind: CancelReasonKind, custom: Option<String>) -> Self {
        match kind {
            CancelReasonKind::ChangedMyMind => Self::ChangedMyMind,
            CancelReasonKind::OrderedByMistake => Self::OrderedByMistake,
            CancelReasonKind::FoundBetterPrice => Self::FoundBetterPrice,
            CancelReasonKind::Other => Self::Other(custom.unwrap_or_default()),
        }
    }

    /// The text stored on the order. A custom reason must not be blank.
    pub fn resolve(&self) -> Result<String, ServiceError> {
        let text = match self {
            Self::ChangedMyMind => "Changed my mind",
            Self::OrderedByMistake => "Ordered by mistake",
            Self::FoundBetterPrice => "Found better price",
            Self::Other(custom) => {
                let trimmed = custom.trim();
                if trimmed.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "A custom cancellation reason is required".to_string(),
                    ));
                }
                trimmed
            }
        };
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: CancelReasonKind,
    /// Required when `reason` is `other`.
    #[serde(default)]
    pub custom_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        Self {
            line_total: model.line_total(),
            id: model.id,
            product_name: model.product_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: String,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub state: OrderState,
    pub is_cancelled: bool,
    pub cancel_reason: Option<String>,
    pub order_date: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Empty in list views.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderModel> for OrderResponse {
    fn from(model: OrderModel) -> Self {
        Self {
            state: model.state(),
            id: model.id,
            user_id: model.user_id,
            address_id: model.address_id,
            total_amount: model.total_amount,
            status: model.status,
            is_cancelled: model.is_cancelled,
            cancel_reason: model.cancel_reason,
            order_date: model.order_date,
            updated_at: model.updated_at,
            items: Vec::new(),
        }
    }
}

impl OrderResponse {
    pub fn with_items(order: OrderModel, items: Vec<OrderItemModel>) -> Self {
        let mut response = Self::from(order);
        response.items = items.into_iter().map(OrderItemResponse::from).collect();
        response
    }
}

/// Checks a selection against the catalog and returns its total.
///
/// Fails on an empty selection, a non-positive quantity or an unknown product.
pub fn compute_total(
    catalog: &Catalog,
    items: &BTreeMap<String, i32>,
) -> Result<Decimal, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Select at least one item".to_string(),
        ));
    }

    let mut total = Decimal::ZERO;
    for (name, quantity) in items {
        if *quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                name
            )));
        }
        let price = catalog
            .price(name)
            .ok_or_else(|| ServiceError::ValidationError(format!("Unknown product: {}", name)))?;
        total += price * Decimal::from(*quantity);
    }
    Ok(total)
}

/// Service for the active order store
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    catalog: Arc<Catalog>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, catalog: Arc<Catalog>) -> Self {
        Self {
            db_pool,
            event_sender,
            catalog,
        }
    }

    /// Creates an order and its line items in one transaction, pricing from the catalog.
    #[instrument(skip(self, request), fields(address_id = %request.address_id))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        request: PlaceOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let result = self.create_order(user_id, request).await;
        if let Err(e) = &result {
            metrics::record_failure("place_order", e);
        }
        result
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        request: PlaceOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        if request.address_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Address ID is required".to_string(),
            ));
        }
        let total = compute_total(&self.catalog, &request.items)?;

        let db = &*self.db_pool;
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            address_id: Set(request.address_id.trim().to_string()),
            total_amount: Set(total),
            status: Set(OrderStatus::Pending),
            is_cancelled: Set(false),
            cancel_reason: Set(None),
            order_date: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let mut items = Vec::with_capacity(request.items.len());
        for (name, quantity) in &request.items {
            // compute_total has already checked every name
            let unit_price = self.catalog.price(name).unwrap_or(Decimal::ZERO);
            let item = OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_name: Set(name.clone()),
                quantity: Set(*quantity),
                unit_price: Set(unit_price),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, %order_id, product = %name, "Failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
            items.push(item);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        metrics::ORDERS_PLACED.inc();
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                user_id,
                total_amount: total,
            })
            .await;

        info!(%order_id, %total, items = items.len(), "Order placed");
        Ok(OrderResponse::with_items(order, items))
    }

    /// Every order of the user still in the active store, newest first.
    #[instrument(skip(self))]
    pub async fn list_active_orders(&self, user_id: Uuid) -> Result<Vec<OrderModel>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db_pool)
            .await
            .map_err(Into::into)
    }

    /// Active orders that can still be paid: neither cancelled nor completed.
    #[instrument(skip(self))]
    pub async fn list_payable_orders(&self, user_id: Uuid) -> Result<Vec<OrderModel>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::IsCancelled.eq(false))
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db_pool)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    /// Like [`get_order`](Self::get_order), but another user's order is reported as missing.
    pub async fn get_order_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let order = self.get_order(order_id).await?;
        if order.user_id != user_id {
            return Err(order_not_found(order_id));
        }
        Ok(order)
    }

    /// Line items of an order; still available after the order is archived.
    #[instrument(skip(self))]
    pub async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, ServiceError> {
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::ProductName)
            .all(&*self.db_pool)
            .await
            .map_err(Into::into)
    }

    /// Flags a pending order as cancelled. Cancelling again replaces the reason.
    #[instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: CancelReason,
    ) -> Result<OrderModel, ServiceError> {
        let result = self.flag_cancelled(order_id, reason).await;
        if let Err(e) = &result {
            metrics::record_failure("cancel_order", e);
        }
        result
    }

    async fn flag_cancelled(
        &self,
        order_id: Uuid,
        reason: CancelReason,
    ) -> Result<OrderModel, ServiceError> {
        let reason = reason.resolve()?;
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order cancellation");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        if order.status == OrderStatus::Completed {
            warn!(%order_id, "Cancellation rejected: order already completed");
            return Err(ServiceError::StateViolation(format!(
                "Order {} is already completed",
                order_id
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.is_cancelled = Set(true);
        active.cancel_reason = Set(Some(reason.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to update order for cancellation");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to commit order cancellation");
            ServiceError::DatabaseError(e)
        })?;

        metrics::ORDERS_CANCELLED.inc();
        self.event_sender
            .send_or_log(Event::OrderCancelled {
                order_id,
                reason: reason.clone(),
            })
            .await;

        info!(%order_id, reason = %reason, "Order cancelled");
        Ok(updated)
    }
}

/// Hard-deletes an active order row on the caller's connection or transaction.
pub(crate) async fn delete_order<C>(conn: &C, order_id: Uuid) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let result = OrderEntity::delete_by_id(order_id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(order_not_found(order_id));
    }
    Ok(())
}

pub(crate) fn order_not_found(order_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Order {} not found", order_id))
}
