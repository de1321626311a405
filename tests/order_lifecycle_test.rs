mod common;

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use quikko_api::{
    entities::{
        order::{OrderState, OrderStatus},
        payment::{PaymentMethod, PaymentStatus},
        user::UserRole,
    },
    errors::ServiceError,
    services::{
        archival::ARCHIVE_COMMENT,
        orders::{CancelReason, PlaceOrderRequest},
        users::{RegisterUserRequest, UserProfile},
    },
};
use rust_decimal_macros::dec;

use common::TestApp;

async fn customer(app: &TestApp, full_name: &str, email: &str) -> UserProfile {
    app.state
        .services
        .users
        .register(RegisterUserRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
            role: UserRole::Customer,
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
        })
        .await
        .expect("register customer")
}

fn selection(entries: &[(&str, i32)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        address_id: "ADDR1001".to_string(),
        items: entries
            .iter()
            .map(|(name, qty)| (name.to_string(), *qty))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[tokio::test]
async fn biryani_and_dosa_are_paid_and_archived() {
    let app = TestApp::new().await;
    let asha = customer(&app, "Asha Rao", "asha@example.com").await;
    let services = &app.state.services;

    let order = services
        .orders
        .place_order(asha.id, selection(&[("Veg Biryani", 2), ("Dosa", 1)]))
        .await
        .unwrap();
    assert_eq!(order.total_amount, dec!(300));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.state, OrderState::Pending);
    assert_eq!(order.items.len(), 2);

    let receipt = services
        .payments
        .pay_order(order.id, PaymentMethod::Upi, &asha)
        .await
        .unwrap();
    assert_eq!(receipt.payment.amount, dec!(300));
    assert_eq!(receipt.payment.status, PaymentStatus::Success);
    assert!(receipt.payment.transaction_id.starts_with("TXN_"));
    assert_eq!(receipt.history.total_amount, dec!(300));
    assert_eq!(receipt.history.status, OrderStatus::Completed);
    assert_eq!(receipt.history.comment, ARCHIVE_COMMENT);
    assert_eq!(receipt.history.updated_by, "Asha Rao");

    assert!(services
        .orders
        .list_active_orders(asha.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        services.payments.payments_for_order(order.id).await.unwrap().len(),
        1
    );
    let history = services.history.list_history(asha.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order_id, order.id);

    // Line items outlive the active order row
    assert_eq!(services.orders.order_items(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn paying_twice_never_double_archives() {
    let app = TestApp::new().await;
    let asha = customer(&app, "Asha Rao", "asha@example.com").await;
    let services = &app.state.services;

    let order = services
        .orders
        .place_order(asha.id, selection(&[("Masala Dosa", 1)]))
        .await
        .unwrap();
    services
        .payments
        .pay_order(order.id, PaymentMethod::Card, &asha)
        .await
        .unwrap();

    let second = services
        .payments
        .pay_order(order.id, PaymentMethod::Card, &asha)
        .await;
    assert_matches!(
        second,
        Err(ServiceError::NotFound(_)) | Err(ServiceError::StateViolation(_))
    );
    assert_eq!(
        services.payments.payments_for_order(order.id).await.unwrap().len(),
        1
    );
    assert_eq!(services.history.list_history(asha.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn custom_cancel_reason_keeps_order_active_but_unpayable() {
    let app = TestApp::new().await;
    let asha = customer(&app, "Asha Rao", "asha@example.com").await;
    let services = &app.state.services;

    let order = services
        .orders
        .place_order(asha.id, selection(&[("Chicken Biryani", 1)]))
        .await
        .unwrap();
    services
        .orders
        .cancel_order(order.id, CancelReason::Other("Duplicate order".to_string()))
        .await
        .unwrap();

    let active = services.orders.list_active_orders(asha.id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].is_cancelled);
    assert_eq!(active[0].cancel_reason.as_deref(), Some("Duplicate order"));

    assert!(services
        .orders
        .list_payable_orders(asha.id)
        .await
        .unwrap()
        .is_empty());
    assert_matches!(
        services
            .payments
            .pay_order(order.id, PaymentMethod::Wallet, &asha)
            .await,
        Err(ServiceError::StateViolation(_))
    );
    assert!(services
        .payments
        .payments_for_order(order.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn empty_selection_writes_nothing() {
    let app = TestApp::new().await;
    let asha = customer(&app, "Asha Rao", "asha@example.com").await;
    let services = &app.state.services;

    assert_matches!(
        services.orders.place_order(asha.id, selection(&[])).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        services
            .orders
            .place_order(asha.id, selection(&[("Dosa", 0)]))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert!(services
        .orders
        .list_active_orders(asha.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let asha = customer(&app, "Asha Rao", "asha@example.com").await;
    let ravi = customer(&app, "Ravi Kumar", "ravi@example.com").await;
    let services = &app.state.services;

    let order = services
        .orders
        .place_order(asha.id, selection(&[("Poori", 2)]))
        .await
        .unwrap();

    assert!(services
        .orders
        .list_active_orders(ravi.id)
        .await
        .unwrap()
        .is_empty());
    assert_matches!(
        services.orders.get_order_for_user(order.id, ravi.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        services
            .payments
            .pay_order(order.id, PaymentMethod::Upi, &ravi)
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(
        services.orders.get_order(order.id).await.unwrap().status,
        OrderStatus::Pending
    );
}
