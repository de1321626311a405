use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metrics encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("Metrics output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref ORDERS_PLACED: IntCounter =
        IntCounter::new("orders_placed_total", "Total number of orders placed")
            .expect("metric can be created");
    pub static ref ORDERS_CANCELLED: IntCounter =
        IntCounter::new("orders_cancelled_total", "Total number of order cancellations")
            .expect("metric can be created");
    pub static ref PAYMENTS_RECORDED: IntCounter =
        IntCounter::new("payments_recorded_total", "Total number of payments recorded")
            .expect("metric can be created");
    pub static ref ORDERS_ARCHIVED: IntCounter = IntCounter::new(
        "orders_archived_total",
        "Total number of orders moved to history"
    )
    .expect("metric can be created");
    pub static ref OPERATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "order_operation_failures_total",
            "Failed order operations by operation and error kind"
        ),
        &["operation", "error_type"]
    )
    .expect("metric can be created");
}

/// Registers every collector with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(ORDERS_PLACED.clone()),
        Box::new(ORDERS_CANCELLED.clone()),
        Box::new(PAYMENTS_RECORDED.clone()),
        Box::new(ORDERS_ARCHIVED.clone()),
        Box::new(OPERATION_FAILURES.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => error!(error = %e, "Failed to register metric"),
        }
    }
}

pub fn record_failure(operation: &str, error: &crate::errors::ServiceError) {
    OPERATION_FAILURES
        .with_label_values(&[operation, error.kind()])
        .inc();
}

/// Renders all registered metrics in the Prometheus text format.
pub fn export_metrics() -> Result<String, MetricsError> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub async fn metrics_handler() -> Response {
    match export_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;

    #[test]
    fn export_includes_order_counters() {
        ORDERS_PLACED.inc();
        record_failure("pay_order", &ServiceError::StateViolation("x".into()));
        let text = export_metrics().unwrap();
        assert!(text.contains("orders_placed_total"));
        assert!(text.contains("order_operation_failures_total"));
        assert!(text.contains("state_violation"));
    }

    #[test]
    fn registration_is_idempotent() {
        register_metrics();
        register_metrics();
        assert!(export_metrics().is_ok());
    }
}
