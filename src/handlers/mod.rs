pub mod auth;
pub mod catalog;
pub mod history;
pub mod orders;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    archival::HistoryService, orders::OrderService, payments::PaymentService, users::UserService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub history: Arc<HistoryService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        catalog: Arc<Catalog>,
        config: &AppConfig,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.min_password_length,
            )),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                catalog,
            )),
            payments: Arc::new(PaymentService::new(db_pool.clone(), event_sender)),
            history: Arc::new(HistoryService::new(db_pool)),
        }
    }
}
