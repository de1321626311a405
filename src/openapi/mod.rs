use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quikko Orders API",
        version = "0.1.0",
        description = r#"
# Quikko Orders API

Order management backend for the Quikko food ordering app.

- **Catalog**: fixed menu with rupee prices
- **Orders**: place, list and cancel orders
- **Payments**: simulated payment that completes and archives an order
- **History**: paid orders moved out of the active list

## Sessions

Log in with `POST /api/v1/auth/login` and send the returned token in the
`x-session-token` header on every other `/api/v1` request.

## Error Handling

Failures return a JSON body with `error`, `message`, `timestamp` and the
`request_id` echoed in the `x-request-id` response header.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration, login and password reset"),
        (name = "catalog", description = "Menu"),
        (name = "orders", description = "Order lifecycle: place, cancel, pay"),
        (name = "history", description = "Archived orders"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::me,
        crate::handlers::catalog::list_products,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::list_payable_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::request_cancel,
        crate::handlers::orders::confirm_cancel,
        crate::handlers::orders::dismiss_cancel,
        crate::handlers::orders::pay_order,
        crate::handlers::history::list_history,
        crate::health::health_check,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::order::OrderStatus,
        crate::entities::order::OrderState,
        crate::entities::payment::PaymentMethod,
        crate::entities::payment::PaymentStatus,
        crate::entities::user::UserRole,
        crate::services::orders::CancelReasonKind,
    ))
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_order_lifecycle_paths() {
        let doc = ApiDocV1::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/orders"));
        assert!(paths.contains_key("/api/v1/orders/{id}/pay"));
        assert!(paths.contains_key("/api/v1/orders/{id}/cancel/confirm"));
        assert!(paths.contains_key("/health"));
    }
}
