use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::orders::{
        CancelOrderRequest, CancelReason, CancelReasonKind, OrderResponse, PlaceOrderRequest,
    },
    services::payments::{PayOrderRequest, PaymentReceipt},
    session::Session,
    ApiResponse, AppState,
};

/// Returned when a cancellation is started; lists the reasons to choose from.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelPrompt {
    pub order_id: Uuid,
    pub reasons: Vec<CancelReasonKind>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Empty selection, unknown product or bad quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Session(session): Session,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state
        .services
        .orders
        .place_order(session.user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Active orders, newest first", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = state
        .services
        .orders
        .list_active_orders(session.user.id)
        .await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(OrderResponse::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/payable",
    responses(
        (status = 200, description = "Orders that are neither cancelled nor completed", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_payable_orders(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = state
        .services
        .orders
        .list_payable_orders(session.user.id)
        .await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(OrderResponse::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its line items", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Session(session): Session,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let orders = &state.services.orders;
    let order = orders.get_order_for_user(order_id, session.user.id).await?;
    let items = orders.order_items(order_id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::with_items(
        order, items,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel/request",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Cancellation started; confirm with a reason", body = ApiResponse<CancelPrompt>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is already cancelled or completed", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn request_cancel(
    State(state): State<AppState>,
    Session(session): Session,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelPrompt>>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_for_user(order_id, session.user.id)
        .await?;

    let order_state = order.state();
    if !order_state.is_open() {
        return Err(ServiceError::StateViolation(format!(
            "Order {} is already {}",
            order_id,
            order_state.to_string().to_lowercase()
        )));
    }

    state
        .sessions
        .set_pending_cancel(&session.token, Some(order_id))?;

    Ok(Json(ApiResponse::success(CancelPrompt {
        order_id,
        reasons: vec![
            CancelReasonKind::ChangedMyMind,
            CancelReasonKind::OrderedByMistake,
            CancelReasonKind::FoundBetterPrice,
            CancelReasonKind::Other,
        ],
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel/confirm",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Custom reason missing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "No cancellation pending for this order, or order completed", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn confirm_cancel(
    State(state): State<AppState>,
    Session(session): Session,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    if session.pending_cancel != Some(order_id) {
        return Err(ServiceError::StateViolation(format!(
            "No cancellation pending for order {}",
            order_id
        )));
    }

    let orders = &state.services.orders;
    orders
        .get_order_for_user(order_id, session.user.id)
        .await?;

    let reason = CancelReason::from_parts(request.reason, request.custom_reason);
    let cancelled = orders.cancel_order(order_id, reason).await?;
    // Best effort: the cancellation is already committed
    if let Err(e) = state.sessions.clear_pending_cancel(&session.token, order_id) {
        warn!(%order_id, error = %e, "Could not clear pending cancellation");
    }

    Ok(Json(ApiResponse::success(OrderResponse::from(cancelled))))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel/dismiss",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Pending cancellation for this order cleared; a pending cancellation of another order is kept"),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn dismiss_cancel(
    State(state): State<AppState>,
    Session(session): Session,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    if state.sessions.clear_pending_cancel(&session.token, order_id)? {
        info!(%order_id, "Cancellation dismissed");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/pay",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Payment recorded and order archived", body = ApiResponse<PaymentReceipt>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is cancelled or already paid", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Session(session): Session,
    Path(order_id): Path<Uuid>,
    Json(request): Json<PayOrderRequest>,
) -> Result<Json<ApiResponse<PaymentReceipt>>, ServiceError> {
    let receipt = state
        .services
        .payments
        .pay_order(order_id, request.method, &session.user)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}
